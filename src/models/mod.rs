// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Data model: layers, adjustments, scene aggregate and project documents.

pub mod filters;
pub mod layer;
pub mod project;
pub mod scene;
