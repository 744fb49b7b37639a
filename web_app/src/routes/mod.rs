mod dashboard;
mod health;
mod metrics;
mod predict;

use crate::server::SharedState;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Router,
};
use classifier::{ModelService, ModelServiceError, PipelineError};

pub use dashboard::upload;
pub use health::healthcheck;
pub use metrics::metrics_handler;
pub use predict::{home, predict};

/// Status code and metric label for a failed upload.
pub(crate) fn classify_failure(err: &PipelineError) -> (StatusCode, &'static str) {
    match err {
        PipelineError::Decode(_) => (StatusCode::UNPROCESSABLE_ENTITY, "decode"),
        PipelineError::Predict(ModelServiceError::IncompatibleInput(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "incompatible_input")
        }
        PipelineError::Predict(_) => (StatusCode::INTERNAL_SERVER_ERROR, "inference"),
        PipelineError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode"),
        PipelineError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "task"),
    }
}

fn common_routes<M: ModelService>() -> Router<SharedState<M>> {
    Router::new()
        .route("/health", get(healthcheck::<M>))
        .route("/metrics", get(metrics_handler::<M>))
}

/// Upload form on `/`, result page on `POST /predict`. `GET /predict` is left
/// to axum's method routing (405), so a result is never shown without an upload.
pub fn web_form_routes<M: ModelService>(
    state: SharedState<M>,
    max_upload_bytes: usize,
) -> Router {
    Router::new()
        .route("/", get(home).post(home))
        .route("/predict", post(predict::<M>))
        .merge(common_routes::<M>())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

pub fn dashboard_routes<M: ModelService>(
    state: SharedState<M>,
    title: &str,
    max_upload_bytes: usize,
) -> Router {
    let page = crate::render::dashboard_page(title);

    Router::new()
        .route(
            "/",
            get(move || {
                let page = page.clone();
                async move { Html(page) }
            }),
        )
        .route("/upload", post(upload::<M>))
        .merge(common_routes::<M>())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
