// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! SAMLAB - SAM-assisted image annotation
//!
//! A cross-platform desktop application for annotating images with
//! anchor points and bounding boxes, generating segmentation masks
//! with a SAM-style encoder/decoder model, and exporting the results
//! as masks, crops, or YOLO datasets.

mod app;
mod config;
mod inference;
mod io;
mod models;
mod ui;
mod util;

use anyhow::Result;
use app::SamApp;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("SAMLAB - SAM-assisted image annotation"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "SAMLAB",
        options,
        Box::new(|_cc| Ok(Box::new(SamApp::new()))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
