use crate::api::AppState;
use crate::pool::PoolStatus;
use axum::{extract::State, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    postgres_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<PoolStatus>,
    in_flight: usize,
    resources: usize,
    uptime_seconds: u64,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let executor = state.dispatcher.executor();

    // Test PostgreSQL connection
    let postgres_connected = executor.ping().await;

    Json(HealthResponse {
        status: if postgres_connected {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        postgres_connected,
        pool: executor.pool_status(),
        in_flight: state.dispatcher.in_flight(),
        resources: state.dispatcher.registry().len(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
