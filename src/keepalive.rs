//! Keep-alive HTTP endpoint for hosting-platform uptime checks.
//!
//! ```text
//! GET /  → 200 "Bot is alive!"
//! *      → 404
//! ```

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tracing::{error, info};

pub const ALIVE_BODY: &str = "Bot is alive!";

pub fn router() -> Router {
    Router::new().route("/", get(|| async { ALIVE_BODY }))
}

/// Serve the keep-alive router on `0.0.0.0:{port}` until the process exits.
pub async fn serve(port: u16) -> std::io::Result<()> {
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(%bind_addr, "keep-alive endpoint listening");
    axum::serve(listener, router()).await
}

/// Run the endpoint in the background; a failure is logged and never stops the bot.
pub fn spawn(port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = serve(port).await {
            error!("Keep-alive server on port {port} failed: {e}");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_returns_ok() {
        let response = router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/plain"));

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], ALIVE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        let response = router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_post_root_not_allowed() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
