// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application settings.
//!
//! SAM run configuration, persisted as JSON next to the executable's
//! working directory and edited through the settings window.

use crate::inference::SamMode;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE: &str = "samlab_settings.json";

/// Persistent SAM run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamSettings {
    pub mode: SamMode,
    /// Refit each box to the largest mask contour after a box run.
    pub adjust_bbox: bool,
    pub encoder_path: PathBuf,
    pub decoder_path: PathBuf,
}

impl Default for SamSettings {
    fn default() -> Self {
        Self {
            mode: SamMode::Anchors,
            adjust_bbox: true,
            encoder_path: PathBuf::from("models/sam_encoder.onnx"),
            decoder_path: PathBuf::from("models/sam_decoder.onnx"),
        }
    }
}

impl SamSettings {
    /// Load settings from `path`, falling back to defaults when the
    /// file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn models_exist(&self) -> bool {
        self.encoder_path.is_file() && self.decoder_path.is_file()
    }
}
