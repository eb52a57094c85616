//! Request handler capability and the listener loop shared by both services.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tokio::sync::watch;

use crate::core::ListenerBinding;

/// Largest request body accepted by either service
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// One HTTP-facing service
pub trait RequestHandler: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Answer one request. `target` is the raw path and query string.
    fn handle(
        &self,
        method: &Method,
        target: &str,
        body: Bytes,
    ) -> impl Future<Output = Response> + Send;
}

async fn dispatch<H: RequestHandler>(State(handler): State<Arc<H>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            log::warn!("[{}] Rejected request body: {}", handler.name(), e);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    handler.handle(&parts.method, target, body).await
}

/// Log each request with status and latency
async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    log::debug!(
        "{} {} -> {} in {:.1}ms",
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    response
}

pub fn build_router<H: RequestHandler>(handler: Arc<H>) -> Router {
    Router::new()
        .fallback(dispatch::<H>)
        .with_state(handler)
        .layer(middleware::from_fn(log_requests))
}

/// Serve `handler` on `binding` until `shutdown` flips to true.
///
/// Each connection runs on its own task. In-flight requests finish before
/// this returns.
pub async fn serve<H: RequestHandler>(
    binding: ListenerBinding,
    handler: Arc<H>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let name = handler.name();
    let addr = binding.local_addr();
    let app = build_router(handler);

    log::debug!("[{}] Listening on {}", name, addr);

    let shutdown_signal = async move {
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }
    };

    axum::serve(binding.into_listener(), app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    log::debug!("[{}] Stopped listening on {}", name, addr);
    Ok(())
}
