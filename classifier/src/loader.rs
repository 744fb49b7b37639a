use crate::{
    config::ModelConfig,
    device::Device,
    labels::{ClassLabels, LabelsError},
    ort_service::OrtModelService,
    storage::{ObjectStore, Origin, StorageError},
};
use bytes::Bytes;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to fetch model: {0}")]
    Fetch(#[from] StorageError),
    #[error("Failed to load labels: {0}")]
    Labels(#[from] LabelsError),
    #[error("Failed to deserialize model: {0}")]
    Deserialize(#[from] ort::Error),
    #[error("Model loading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Fetches the serialized model and places it on `device`. A cached artifact
/// that fails to deserialize is downloaded once more; any other failure is
/// meant to stop the process before it serves requests.
pub async fn load_model(
    model_config: &ModelConfig,
    device: Device,
) -> Result<OrtModelService, LoaderError> {
    let store = ObjectStore::new(&model_config.storage);
    let (model_bytes, origin) = store.fetch().await?;
    let labels = ClassLabels::load(&model_config.labels)?;

    let model = match build_sessions(model_bytes, model_config, labels.clone(), device).await {
        Err(LoaderError::Deserialize(e)) if origin == Origin::Cache => {
            tracing::warn!("Cached model artifact is unusable, downloading it again: {}", e);
            let model_bytes = store.refresh().await?;
            build_sessions(model_bytes, model_config, labels, device).await?
        }
        result => result?,
    };

    tracing::info!(
        bucket = %model_config.storage.bucket,
        key = %model_config.storage.key,
        "Model ready on {}",
        device
    );

    Ok(model)
}

async fn build_sessions(
    model_bytes: Bytes,
    model_config: &ModelConfig,
    labels: ClassLabels,
    device: Device,
) -> Result<OrtModelService, LoaderError> {
    let config = model_config.clone();
    let model = tokio::task::spawn_blocking(move || {
        OrtModelService::from_memory(&model_bytes, &config, labels, device)
    })
    .await??;
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{InputConfig, LabelsConfig, StorageConfig},
        model_service::ModelService,
    };
    use axum::{routing::get, Router};
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;
    use tokio::net::TcpListener;

    /// GlobalAveragePool followed by Flatten: one logit per input channel,
    /// equal to that channel's normalized mean.
    const CHANNEL_MEAN_ONNX: &[u8] = include_bytes!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/channel_mean.onnx"
    ));

    async fn serve_model(body: &'static [u8]) -> String {
        let app = Router::new().route("/models/model.onnx", get(move || async move { body }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn model_config(endpoint: String) -> ModelConfig {
        ModelConfig {
            storage: StorageConfig {
                endpoint,
                bucket: "models".to_string(),
                key: "model.onnx".to_string(),
                cache_dir: None,
            },
            labels: LabelsConfig::default(),
            input: InputConfig::default(),
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            top_k: 1,
            num_instances: 1,
        }
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_startup() {
        let result = load_model(&model_config("http://127.0.0.1:1".to_string()), Device::Cpu).await;
        assert!(matches!(result, Err(LoaderError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_garbage_weights_fail_to_deserialize() {
        let endpoint = serve_model(b"not an onnx graph").await;

        let result = load_model(&model_config(endpoint), Device::Cpu).await;
        assert!(matches!(result, Err(LoaderError::Deserialize(_))));
    }

    #[tokio::test]
    async fn test_loaded_model_predicts_deterministically() {
        let endpoint = serve_model(CHANNEL_MEAN_ONNX).await;
        let mut config = model_config(endpoint);
        config.top_k = 3;

        let model = load_model(&config, Device::Cpu).await.unwrap();
        assert_eq!(model.device(), Device::Cpu);

        // Red-heavy pixel: channel 0 has the largest normalized mean.
        let image = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(50, 30, Rgb([200, 120, 40]));
        let first = model.predict(&image).unwrap();
        let second = model.predict(&image).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.best.class_id, 0);
        assert_eq!(first.best.label, "class_0");
        assert_eq!(first.top_k.len(), 3);
        let total: f32 = first.top_k.iter().map(|s| s.confidence).sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_truncated_cache_is_downloaded_again() {
        let endpoint = serve_model(CHANNEL_MEAN_ONNX).await;
        let cache_dir: PathBuf =
            std::env::temp_dir().join(format!("loader-cache-{}", std::process::id()));
        let mut config = model_config(endpoint);
        config.storage.cache_dir = Some(cache_dir.clone());

        let cached = config.storage.cache_path().unwrap();
        std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
        std::fs::write(&cached, &CHANNEL_MEAN_ONNX[..CHANNEL_MEAN_ONNX.len() / 2]).unwrap();

        let model = load_model(&config, Device::Cpu).await.unwrap();
        let image = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(8, 8, Rgb([10, 200, 10]));
        assert_eq!(model.predict(&image).unwrap().best.class_id, 1);
        assert_eq!(std::fs::read(&cached).unwrap(), CHANNEL_MEAN_ONNX);

        std::fs::remove_dir_all(cache_dir).unwrap();
    }
}
