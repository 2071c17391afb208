use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::fifo::NameQueue;
use super::handlers;

/// Create the HTTP router for the name queue
pub fn create_router(queue: Arc<NameQueue>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/enqueue/:name", post(handlers::enqueue_name))
        .route("/dequeue", get(handlers::dequeue_name))
        // Request logging
        .layer(TraceLayer::new_for_http())
        .with_state(queue)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    const MAX_SIZE: usize = 64 * 1024;

    async fn call(router: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), MAX_SIZE).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_dequeue_empty_returns_empty_object() {
        let router = create_router(Arc::new(NameQueue::new()));

        let (status, body) = call(&router, "GET", "/dequeue").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_enqueue_then_dequeue_in_order() {
        let queue = Arc::new(NameQueue::new());
        let router = create_router(Arc::clone(&queue));

        let (status, body) = call(&router, "POST", "/enqueue/Alice").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "enqueued", "name": "Alice"}));
        call(&router, "POST", "/enqueue/Bob").await;
        assert_eq!(queue.len(), 2);

        let (_, first) = call(&router, "GET", "/dequeue").await;
        let (_, second) = call(&router, "GET", "/dequeue").await;
        let (_, third) = call(&router, "GET", "/dequeue").await;
        assert_eq!(first, json!({"name": "Alice"}));
        assert_eq!(second, json!({"name": "Bob"}));
        assert_eq!(third, json!({}));
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(Arc::new(NameQueue::new()));

        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dequeue_rejects_post() {
        let router = create_router(Arc::new(NameQueue::new()));

        let (status, _) = call(&router, "POST", "/dequeue").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
