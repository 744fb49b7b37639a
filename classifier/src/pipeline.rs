use crate::{
    decoder::{decode_image, encode_jpeg, resize_preview, DecodeError, EncodeError},
    model_service::{ModelService, ModelServiceError, Prediction},
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Predict(#[from] ModelServiceError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("Pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// How the uploaded image is shown next to the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preview {
    Original,
    Resized { width: u32, height: u32 },
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub prediction: Prediction,
    /// Base64 of the JPEG re-encoding of the preview image.
    pub preview_jpeg_base64: String,
    pub preview_width: u32,
    pub preview_height: u32,
}

/// decode -> predict -> format-for-display, shared by both front-ends.
#[derive(Clone)]
pub struct Pipeline<M: ModelService> {
    model_service: Arc<M>,
}

impl<M: ModelService> Pipeline<M> {
    pub fn new(model_service: M) -> Self {
        Self {
            model_service: Arc::new(model_service),
        }
    }

    pub fn model_service(&self) -> &M {
        &self.model_service
    }

    #[instrument(skip(self, image_data), fields(bytes = image_data.len(), device = %self.model_service.device()))]
    pub fn run(&self, image_data: &[u8], preview: Preview) -> Result<PipelineOutput, PipelineError> {
        let image = decode_image(image_data)?;
        tracing::debug!("Decoded {}x{} image", image.width(), image.height());

        let prediction = self.model_service.predict(&image)?;
        tracing::debug!(
            "Predicted {} ({:.3})",
            prediction.best.label,
            prediction.best.confidence
        );

        let preview_image = match preview {
            Preview::Original => image,
            Preview::Resized { width, height } => resize_preview(&image, width, height),
        };
        let jpeg = encode_jpeg(&preview_image)?;

        Ok(PipelineOutput {
            prediction,
            preview_jpeg_base64: BASE64.encode(jpeg),
            preview_width: preview_image.width(),
            preview_height: preview_image.height(),
        })
    }

    /// Runs the pipeline on the blocking pool so request tasks never block.
    pub async fn run_blocking(
        &self,
        image_data: Bytes,
        preview: Preview,
    ) -> Result<PipelineOutput, PipelineError> {
        let pipeline = self.clone();
        tokio::task::spawn_blocking(move || pipeline.run(&image_data, preview)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::Device, model_service::ScoredLabel};
    use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[derive(Clone)]
    struct FixedModelService;

    impl ModelService for FixedModelService {
        fn predict(&self, image: &RgbImage) -> Result<Prediction, ModelServiceError> {
            let best = ScoredLabel {
                class_id: 0,
                label: format!("{}x{}", image.width(), image.height()),
                confidence: 0.99,
            };
            Ok(Prediction {
                top_k: vec![best.clone()],
                best,
            })
        }

        fn device(&self) -> Device {
            Device::Cpu
        }
    }

    #[derive(Clone)]
    struct RejectingModelService;

    impl ModelService for RejectingModelService {
        fn predict(&self, _image: &RgbImage) -> Result<Prediction, ModelServiceError> {
            Err(ModelServiceError::IncompatibleInput("wrong shape".to_string()))
        }

        fn device(&self) -> Device {
            Device::Cpu
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(width, height, Rgb([10, 200, 30]));
        let mut data = Vec::new();
        img.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();
        data
    }

    fn decode_preview(output: &PipelineOutput) -> RgbImage {
        let jpeg = BASE64.decode(&output.preview_jpeg_base64).unwrap();
        image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn test_original_preview_keeps_dimensions() {
        let pipeline = Pipeline::new(FixedModelService);
        let output = pipeline.run(&png(64, 48), Preview::Original).unwrap();

        assert_eq!(output.prediction.best.label, "64x48");
        assert_eq!(decode_preview(&output).dimensions(), (64, 48));
        assert_eq!((output.preview_width, output.preview_height), (64, 48));
    }

    #[test]
    fn test_resized_preview() {
        let pipeline = Pipeline::new(FixedModelService);
        let output = pipeline
            .run(
                &png(500, 120),
                Preview::Resized {
                    width: 340,
                    height: 340,
                },
            )
            .unwrap();

        // The model still sees the full-size image.
        assert_eq!(output.prediction.best.label, "500x120");
        assert_eq!(decode_preview(&output).dimensions(), (340, 340));
    }

    #[test]
    fn test_corrupt_upload_fails_before_predict() {
        let pipeline = Pipeline::new(FixedModelService);
        assert!(matches!(
            pipeline.run(b"\x89PNG\r\n\x1a\nbroken", Preview::Original),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_model_rejection_is_surfaced() {
        let pipeline = Pipeline::new(RejectingModelService);
        assert!(matches!(
            pipeline.run(&png(8, 8), Preview::Original),
            Err(PipelineError::Predict(ModelServiceError::IncompatibleInput(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_blocking() {
        let pipeline = Pipeline::new(FixedModelService);
        let output = pipeline
            .run_blocking(Bytes::from(png(16, 16)), Preview::Original)
            .await
            .unwrap();
        assert_eq!(output.prediction.best.confidence, 0.99);
    }
}
