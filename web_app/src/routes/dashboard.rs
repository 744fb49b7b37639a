use crate::{render, routes::classify_failure, server::SharedState, upload::read_file_field};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use classifier::ModelService;
use std::time::Instant;
use tracing::instrument;

const ROUTE: &str = "/upload";

/// Returns the HTML fragment the dashboard swaps into its result area.
#[instrument(skip(state, multipart))]
pub async fn upload<M: ModelService>(
    State(state): State<SharedState<M>>,
    mut multipart: Multipart,
) -> Response {
    state.metrics.record_request(ROUTE);

    let image_data = match read_file_field(&mut multipart).await {
        Ok(Some(data)) => data,
        Ok(None) => return Html(String::new()).into_response(),
        Err(err) => {
            tracing::warn!("Rejected upload: {}", err);
            state.metrics.record_prediction_failure("upload", ROUTE);
            return (
                StatusCode::BAD_REQUEST,
                Html(render::dashboard_error(&err.to_string())),
            )
                .into_response();
        }
    };

    let start = Instant::now();
    match state.pipeline.run_blocking(image_data, state.preview).await {
        Ok(output) => {
            state
                .metrics
                .record_prediction_duration(start.elapsed().as_millis() as u64, ROUTE);
            Html(render::dashboard_result(&output)).into_response()
        }
        Err(err) => {
            let (status, kind) = classify_failure(&err);
            tracing::error!("Prediction failed ({}): {}", kind, err);
            state.metrics.record_prediction_failure(kind, ROUTE);
            (status, Html(render::dashboard_error(&err.to_string()))).into_response()
        }
    }
}
