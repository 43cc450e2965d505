// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! ONNX encoder/decoder sessions for SAM.
//!
//! Both models are consumed as black boxes with a fixed call contract:
//! the encoder takes the preprocessed image tensor and returns an
//! embedding; the decoder takes the embedding plus point/box prompts
//! and returns a raw mask already restored to original image size.

use super::InferenceError;
use image::GrayImage;
use ndarray::{Array, Array2, Array3, Array4, ArrayD, CowArray, IxDyn};
use ort::{Environment, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::Arc;

/// Side length of the decoder's low-resolution mask input.
const MASK_INPUT_SIDE: usize = 256;

pub struct SamSession {
    encoder: Session,
    decoder: Session,
    _environment: Arc<Environment>,
}

impl SamSession {
    /// Load both model files. Missing or malformed files surface as
    /// resource errors before any run starts.
    pub fn load(encoder_path: &Path, decoder_path: &Path) -> Result<Self, InferenceError> {
        let environment = Arc::new(Environment::builder().with_name("samlab").build()?);

        let encoder = SessionBuilder::new(&environment)?.with_model_from_file(encoder_path)?;
        let decoder = SessionBuilder::new(&environment)?.with_model_from_file(decoder_path)?;

        log::info!(
            "Loaded SAM models: encoder {}, decoder {}",
            encoder_path.display(),
            decoder_path.display()
        );

        Ok(Self {
            encoder,
            decoder,
            _environment: environment,
        })
    }

    /// Run the encoder on a preprocessed `1x3x1024x1024` tensor.
    pub fn embed(&self, tensor: Array4<f32>) -> Result<ArrayD<f32>, InferenceError> {
        let input: CowArray<f32, IxDyn> = tensor.into_dyn().into();
        let value = Value::from_array(self.encoder.allocator(), &input)?;

        let outputs = self.encoder.run(vec![value])?;
        let embedding = outputs
            .first()
            .ok_or_else(|| InferenceError::BadOutput("encoder returned no outputs".into()))?
            .try_extract::<f32>()?;

        Ok(embedding.view().to_owned())
    }

    /// Run the decoder with prompt coordinates (already rescaled into
    /// model input space) and labels, both shaped `1xN(x2)`.
    ///
    /// The returned mask is thresholded at > 0 and sized to the
    /// original image dimensions.
    pub fn decode(
        &self,
        embeddings: &ArrayD<f32>,
        coords: Array3<f32>,
        labels: Array2<f32>,
        orig_size: (u32, u32),
    ) -> Result<GrayImage, InferenceError> {
        let embeddings: CowArray<f32, IxDyn> = embeddings.clone().into();
        let coords: CowArray<f32, IxDyn> = coords.into_dyn().into();
        let labels: CowArray<f32, IxDyn> = labels.into_dyn().into();
        let mask_input: CowArray<f32, IxDyn> =
            Array4::<f32>::zeros((1, 1, MASK_INPUT_SIDE, MASK_INPUT_SIDE))
                .into_dyn()
                .into();
        let has_mask: CowArray<f32, IxDyn> = Array::from_vec(vec![0.0f32]).into_dyn().into();
        let orig_im_size: CowArray<f32, IxDyn> =
            Array::from_vec(vec![orig_size.1 as f32, orig_size.0 as f32])
                .into_dyn()
                .into();

        let allocator = self.decoder.allocator();
        // Decoder input order: image_embeddings, point_coords,
        // point_labels, mask_input, has_mask_input, orig_im_size.
        let outputs = self.decoder.run(vec![
            Value::from_array(allocator, &embeddings)?,
            Value::from_array(allocator, &coords)?,
            Value::from_array(allocator, &labels)?,
            Value::from_array(allocator, &mask_input)?,
            Value::from_array(allocator, &has_mask)?,
            Value::from_array(allocator, &orig_im_size)?,
        ])?;

        let masks = outputs
            .first()
            .ok_or_else(|| InferenceError::BadOutput("decoder returned no outputs".into()))?
            .try_extract::<f32>()?;
        let view = masks.view();

        let shape = view.shape().to_vec();
        if shape.len() != 4 {
            return Err(InferenceError::BadOutput(format!(
                "expected a 4-d mask tensor, got shape {shape:?}"
            )));
        }

        let (height, width) = (shape[2], shape[3]);
        let mut mask = GrayImage::new(width as u32, height as u32);
        for y in 0..height {
            for x in 0..width {
                if view[[0, 0, y, x]] > 0.0 {
                    mask.put_pixel(x as u32, y as u32, image::Luma([255]));
                }
            }
        }

        Ok(mask)
    }
}
