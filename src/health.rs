//! Health check endpoint for external liveness probes.

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Path of the liveness probe
pub const HEALTH_PATH: &str = "/health";

/// GET /health
async fn health_check() -> &'static str {
    "OK"
}

/// Build health check routes
pub fn router() -> Router {
    Router::new().route(HEALTH_PATH, get(health_check))
}

/// Serve the health endpoint on `addr` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: &str, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Health endpoint stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn test_health_returns_ok() -> anyhow::Result<()> {
        let request = Request::builder().uri(HEALTH_PATH).body(Body::empty())?;
        let response = router().oneshot(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&body[..], b"OK");
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() -> anyhow::Result<()> {
        let request = Request::builder().uri("/metrics").body(Body::empty())?;
        let response = router().oneshot(request).await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }
}
