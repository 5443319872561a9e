// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! I/O operations: media decoding, camera capture, storage and project files.

pub mod camera;
pub mod media;
pub mod projects;
pub mod serialization;
pub mod storage;
