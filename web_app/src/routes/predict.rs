use crate::{
    render,
    routes::classify_failure,
    server::SharedState,
    upload::{read_file_field, UploadError},
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use classifier::{ModelService, PipelineError};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

const ROUTE: &str = "/predict";

#[derive(Error, Debug)]
pub enum PredictPageError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for PredictPageError {
    fn into_response(self) -> Response {
        let status = match &self {
            PredictPageError::Upload(_) => StatusCode::BAD_REQUEST,
            PredictPageError::Pipeline(err) => classify_failure(err).0,
        };
        (status, Html(render::error_page(&self.to_string()))).into_response()
    }
}

pub async fn home() -> Html<String> {
    Html(render::home_page())
}

#[instrument(skip(state, multipart))]
pub async fn predict<M: ModelService>(
    State(state): State<SharedState<M>>,
    mut multipart: Multipart,
) -> Result<Response, PredictPageError> {
    state.metrics.record_request(ROUTE);

    let Some(image_data) = read_file_field(&mut multipart).await? else {
        tracing::info!("No file uploaded, showing the upload form");
        return Ok(Html(render::home_page()).into_response());
    };

    let start = Instant::now();
    let output = state
        .pipeline
        .run_blocking(image_data, state.preview)
        .await
        .inspect_err(|err| {
            let (_, kind) = classify_failure(err);
            tracing::error!("Prediction failed ({}): {}", kind, err);
            state.metrics.record_prediction_failure(kind, ROUTE);
        })?;
    state
        .metrics
        .record_prediction_duration(start.elapsed().as_millis() as u64, ROUTE);

    Ok(Html(render::result_page(&output)).into_response())
}
