use crate::server::SharedState;
use axum::{extract::State, response::IntoResponse, response::Json};
use classifier::ModelService;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    device: String,
}

pub async fn healthcheck<M: ModelService>(State(state): State<SharedState<M>>) -> impl IntoResponse {
    Json(Status {
        status: "Available".into(),
        device: state.pipeline.model_service().device().to_string(),
    })
}
