use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};

use mesh_gateway::hub::Hub;

/// GET /sacm-report: every recorded play as a CSV download.
pub async fn play_report(State(hub): State<Hub>) -> impl IntoResponse {
    let csv = hub.plays().report().await;
    (
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"sacm-report.csv\""),
        ],
        csv,
    )
}
