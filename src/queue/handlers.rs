use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tracing::info;

use super::fifo::NameQueue;
use crate::client::protocol::{DequeueResponse, EnqueueResponse};

/// POST /enqueue/:name
pub async fn enqueue_name(
    State(queue): State<Arc<NameQueue>>,
    Path(name): Path<String>,
) -> Json<EnqueueResponse> {
    let depth = queue.enqueue(name.clone());
    info!(%name, depth, "name enqueued");

    Json(EnqueueResponse {
        status: "enqueued".to_string(),
        name,
    })
}

/// GET /dequeue
/// `{}` when the queue is empty
pub async fn dequeue_name(State(queue): State<Arc<NameQueue>>) -> Json<DequeueResponse> {
    let name = queue.try_dequeue();
    if let Some(name) = &name {
        info!(%name, remaining = queue.len(), "name dequeued");
    }

    Json(DequeueResponse { name })
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
