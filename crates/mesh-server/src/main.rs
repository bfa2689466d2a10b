mod config;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use mesh_db::Archive;
use mesh_feed::FeedConfig;
use mesh_feed::playlist::DailyPlaylist;
use mesh_gateway::connection;
use mesh_gateway::hub::{Hub, HubConfig};
use mesh_gateway::{persist, tasks};

use crate::config::Config;

#[derive(Clone)]
struct ServerState {
    hub: Hub,
    static_dir: Arc<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mesh=debug,mesh_gateway=debug,mesh_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Archive is optional; a broken one downgrades to memory-only.
    let archive = match &config.db_path {
        Some(path) => match Archive::open(path) {
            Ok(archive) => Some(Arc::new(archive)),
            Err(e) => {
                warn!("Archive unavailable, running memory-only: {}", e);
                None
            }
        },
        None => {
            info!("MESH_DB_PATH not set, running memory-only");
            None
        }
    };

    let hub = Hub::new(
        HubConfig {
            feed: FeedConfig {
                max_posts: config.max_posts,
                ..FeedConfig::default()
            },
            welcome_limit: config.welcome_posts,
            playlist: DailyPlaylist::default(),
        },
        archive.clone(),
    );

    if let Some(archive) = &archive {
        persist::restore(&hub, archive.clone()).await;
        tokio::spawn(tasks::run_backup_loop(hub.clone(), archive.clone(), config.backup_interval));
    }
    tokio::spawn(tasks::run_decay_loop(hub.clone(), config.decay_interval));
    tokio::spawn(tasks::run_cleanup_loop(hub.clone(), config.cleanup_interval));

    let state = ServerState {
        hub: hub.clone(),
        static_dir: Arc::new(config.static_dir.clone()),
    };

    // The client opens its socket on the page's own origin, so `/` serves
    // both the upgrade and the index page.
    let ws_route = Router::new().route("/", get(root)).with_state(state);

    let app = Router::new()
        .merge(mesh_api::router(hub.clone()))
        .merge(ws_route)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("MESH server listening on {}", addr);
    info!(
        "Capacity {} posts, decay every {:?}, cleanup every {:?}",
        config.max_posts, config.decay_interval, config.cleanup_interval
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(archive) = archive {
        let saved = persist::backup(&hub, archive).await;
        info!("Final backup wrote {} posts", saved);
    }

    Ok(())
}

async fn root(
    State(state): State<ServerState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| connection::handle_connection(socket, state.hub))
            .into_response(),
        Err(_) => serve_index(&state.static_dir).await,
    }
}

async fn serve_index(static_dir: &Path) -> Response {
    match tokio::fs::read_to_string(static_dir.join("index.html")).await {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            warn!("index.html unavailable: {}", e);
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(signal) => signal,
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    ctrl_c.await.ok();
                    info!("Received Ctrl+C, shutting down...");
                    return;
                }
            };
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
