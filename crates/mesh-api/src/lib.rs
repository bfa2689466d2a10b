pub mod health;
pub mod posts;
pub mod reports;

use axum::{
    Router,
    routing::{get, post},
};

use mesh_gateway::hub::Hub;

/// HTTP routes that sit beside the realtime channel.
pub fn router(hub: Hub) -> Router {
    Router::new()
        .route("/posts", get(posts::list_posts))
        .route("/resolve-post/{post_id}", post(posts::resolve_post))
        .route("/sacm-report", get(reports::play_report))
        .route("/health", get(health::health))
        .with_state(hub)
}
