use crate::device::Device;
use image::RgbImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelServiceError {
    #[error("Image is incompatible with the model input: {0}")]
    IncompatibleInput(String),
    #[error("Model output is incompatible with the class labels: {0}")]
    IncompatibleOutput(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLabel {
    pub class_id: usize,
    pub label: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub best: ScoredLabel,
    pub top_k: Vec<ScoredLabel>,
}

pub trait ModelService: Send + Sync + Clone + 'static {
    fn predict(&self, image: &RgbImage) -> Result<Prediction, ModelServiceError>;

    fn device(&self) -> Device;
}
