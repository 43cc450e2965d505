// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SAM inference boundary: input preprocessing, the ONNX
//! encoder/decoder sessions, the background run worker, and mask
//! post-processing.

pub mod contour;
pub mod preprocess;
pub mod runner;
pub mod sam;

use serde::{Deserialize, Serialize};

/// Which annotation type drives the next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamMode {
    Anchors,
    Boxes,
}

/// Failures at the inference boundary, captured as a type/message pair
/// when surfaced to the user.
#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model session failed: {0}")]
    Model(#[from] ort::OrtError),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("mask contains no contours to fit a box to")]
    EmptyMask,
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

impl InferenceError {
    /// Short error class name for the notification title.
    pub fn kind(&self) -> &'static str {
        match self {
            InferenceError::Model(_) => "Model Error",
            InferenceError::Image(_) => "Image Error",
            InferenceError::EmptyMask => "Empty Mask",
            InferenceError::BadOutput(_) => "Model Output Error",
        }
    }
}
