use crate::{
    config::{InputConfig, ModelConfig},
    device::Device,
    labels::ClassLabels,
    model_service::{ModelService, ModelServiceError, Prediction, ScoredLabel},
};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

fn transform_image(
    img: &RgbImage,
    input: &InputConfig,
    mean: &[f32; 3],
    std: &[f32; 3],
) -> Result<Array<f32, Ix4>, ModelServiceError> {
    if input.channels != 3 {
        return Err(ModelServiceError::IncompatibleInput(format!(
            "model expects {} channels, images are normalized to 3",
            input.channels
        )));
    }
    let (img_width, img_height) = img.dimensions();
    if img_width == 0 || img_height == 0 {
        return Err(ModelServiceError::IncompatibleInput(format!(
            "image has no pixels ({}x{})",
            img_width, img_height
        )));
    }

    let resized = image::imageops::resize(img, input.width, input.height, FilterType::CatmullRom);

    let mut tensor = Array::zeros((1, 3, input.height as usize, input.width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = ((pixel.0[c] as f32) / 255. - mean[c]) / std[c];
        }
    }

    Ok(tensor)
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

fn rank_classes(
    logits: &[f32],
    labels: &ClassLabels,
    top_k: usize,
) -> Result<Prediction, ModelServiceError> {
    if logits.is_empty() {
        return Err(ModelServiceError::IncompatibleOutput(
            "model produced an empty output".to_string(),
        ));
    }
    if let Some(expected) = labels.expected_classes() {
        if expected != logits.len() {
            return Err(ModelServiceError::IncompatibleOutput(format!(
                "model produced {} scores for {} labels",
                logits.len(),
                expected
            )));
        }
    }

    let mut scored: Vec<(usize, f32)> = softmax(logits).into_iter().enumerate().collect();
    // Stable sort keeps the lowest class id first on ties.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top_k: Vec<ScoredLabel> = scored
        .into_iter()
        .take(top_k.max(1))
        .map(|(class_id, confidence)| ScoredLabel {
            class_id,
            label: labels.name(class_id),
            confidence,
        })
        .collect();

    Ok(Prediction {
        best: top_k[0].clone(),
        top_k,
    })
}

/// Model handle: a pool of sessions built from the same weights on one device.
#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
    device: Device,
    labels: Arc<ClassLabels>,
    input: InputConfig,
    mean: [f32; 3],
    std: [f32; 3],
    top_k: usize,
}

impl OrtModelService {
    pub fn from_memory(
        model_bytes: &[u8],
        model_config: &ModelConfig,
        labels: ClassLabels,
        device: Device,
    ) -> Result<Self, ort::Error> {
        let num_instances = model_config.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_execution_providers(device.execution_providers())?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_memory(model_bytes)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Created {} ONNX sessions on {}", num_instances, device);

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
            device,
            labels: Arc::new(labels),
            input: model_config.input,
            mean: model_config.mean,
            std: model_config.std,
            top_k: model_config.top_k,
        })
    }

    fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelServiceError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| ModelServiceError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let tensor_ref = TensorRef::from_array_view(input.view())
            .map_err(|e| ModelServiceError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| ModelServiceError::Inference(e.to_string()))?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelServiceError::IncompatibleOutput(e.to_string()))?;

        Ok(logits.to_vec())
    }
}

impl ModelService for OrtModelService {
    fn predict(&self, image: &RgbImage) -> Result<Prediction, ModelServiceError> {
        let input = transform_image(image, &self.input, &self.mean, &self.std)?;
        let logits = self.run_inference(&input)?;
        rank_classes(&logits, &self.labels, self.top_k)
    }

    fn device(&self) -> Device {
        self.device
    }
}
