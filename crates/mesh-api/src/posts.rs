use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use mesh_gateway::hub::Hub;

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    200
}

/// GET /posts: current feed, newest first.
pub async fn list_posts(State(hub): State<Hub>, Query(query): Query<SnapshotQuery>) -> impl IntoResponse {
    Json(hub.snapshot(query.limit).await)
}

/// POST /resolve-post/{post_id}: close a post. Goes through the hub so the
/// removal is broadcast like any other feed change.
pub async fn resolve_post(
    State(hub): State<Hub>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    if hub.resolve(&post_id).await {
        info!("Resolved post {} via HTTP", post_id);
        Ok((StatusCode::OK, "Post marked as resolved"))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}
