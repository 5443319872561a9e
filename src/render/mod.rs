// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame scheduling, tonal filtering and composite layout.

pub mod compositor;
pub mod filter;
pub mod scheduler;
