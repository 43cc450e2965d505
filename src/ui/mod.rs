// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! UI components for the SAMLAB application.

pub mod canvas;
pub mod properties;
pub mod scene;
pub mod toolbar;
