use serde::Deserialize;
use std::path::PathBuf;

pub trait Validatable {
    fn validate(&self) -> Result<(), String>;
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default = "default_mean")]
    pub mean: [f32; 3],
    #[serde(default = "default_std")]
    pub std: [f32; 3],
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_model_instances")]
    pub num_instances: usize,
}

fn default_mean() -> [f32; 3] {
    [0.485, 0.456, 0.406]
}

fn default_std() -> [f32; 3] {
    [0.229, 0.224, 0.225]
}

fn default_top_k() -> usize {
    3
}

fn default_model_instances() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Validatable for ModelConfig {
    fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.labels.validate()?;
        self.input.validate()?;
        if self.num_instances == 0 {
            return Err("model.num_instances must be at least 1".to_string());
        }
        if self.top_k == 0 {
            return Err("model.top_k must be at least 1".to_string());
        }
        if self.std.iter().any(|s| *s == 0.0) {
            return Err(format!("model.std must not contain zeros: {:?}", self.std));
        }
        Ok(())
    }
}

/// Location of the serialized model in the object store.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub key: String,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn object_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            self.key.trim_start_matches('/')
        )
    }

    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(&self.bucket).join(self.key.trim_start_matches('/')))
    }
}

impl Validatable for StorageConfig {
    fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("model.storage.endpoint is empty".to_string());
        }
        if self.bucket.trim().is_empty() {
            return Err("model.storage.bucket is empty".to_string());
        }
        if self.key.trim().is_empty() {
            return Err("model.storage.key is empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LabelsConfig {
    pub labels_file: Option<String>,
    pub labels_dir: Option<PathBuf>,
}

impl LabelsConfig {
    pub fn get_path(&self) -> Option<PathBuf> {
        let file = self.labels_file.as_ref()?;
        Some(match &self.labels_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        })
    }
}

impl Validatable for LabelsConfig {
    fn validate(&self) -> Result<(), String> {
        match self.get_path() {
            Some(path) if !path.exists() => Err(format!("Labels file not found: {:?}", path)),
            _ => Ok(()),
        }
    }
}

/// Input tensor the model declares, laid out as `[1, channels, height, width]`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct InputConfig {
    pub channels: u32,
    pub height: u32,
    pub width: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            channels: 3,
            height: 224,
            width: 224,
        }
    }
}

impl Validatable for InputConfig {
    fn validate(&self) -> Result<(), String> {
        if self.height == 0 || self.width == 0 {
            return Err(format!(
                "model.input must have non-zero dimensions, got {}x{}",
                self.width, self.height
            ));
        }
        Ok(())
    }
}
