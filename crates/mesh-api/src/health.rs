use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use mesh_gateway::hub::Hub;

pub async fn health(State(hub): State<Hub>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "posts": hub.len().await,
        "sessions": hub.dispatcher().registry().len().await,
    }))
}
