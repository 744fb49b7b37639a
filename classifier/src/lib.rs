mod labels;
mod loader;
mod ort_service;
mod storage;

pub mod config;
pub mod decoder;
pub mod device;
pub mod model_service;
pub mod pipeline;

pub use device::Device;
pub use labels::{ClassLabels, LabelsError};
pub use loader::{load_model, LoaderError};
pub use model_service::{ModelService, ModelServiceError, Prediction, ScoredLabel};
pub use ort_service::OrtModelService;
pub use pipeline::{Pipeline, PipelineError, PipelineOutput, Preview};
pub use storage::{ObjectStore, Origin, StorageError};
