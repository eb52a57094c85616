//! Preview service: the live document at `/`, static assets everywhere else.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::core::{resolve, ContentStore, ResolveError};
use crate::server::handler::RequestHandler;

pub struct PreviewService {
    store: Arc<ContentStore>,
}

impl PreviewService {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    async fn render(&self) -> Response {
        let html = self.store.preview().await;
        (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
                (header::PRAGMA, "no-cache"),
                (header::EXPIRES, "0"),
            ],
            html,
        )
            .into_response()
    }

    async fn static_file(&self, target: &str) -> Response {
        let base_dir = self.store.base_dir().await;

        let asset = match resolve(&base_dir, target) {
            Ok(asset) => asset,
            Err(ResolveError::Forbidden) => {
                log::warn!("Refused {} outside {}", target, base_dir.display());
                return (StatusCode::FORBIDDEN, "Forbidden").into_response();
            }
            Err(ResolveError::NotFound) => {
                let path = target.split('?').next().unwrap_or_default();
                return (StatusCode::NOT_FOUND, format!("File not found: {path}"))
                    .into_response();
            }
        };

        match tokio::fs::read(&asset.path).await {
            Ok(bytes) => ([(header::CONTENT_TYPE, asset.content_type)], bytes).into_response(),
            Err(e) => {
                log::error!("Failed to read {}: {}", asset.path.display(), e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Server error: {e}"),
                )
                    .into_response()
            }
        }
    }
}

impl RequestHandler for PreviewService {
    fn name(&self) -> &'static str {
        "preview"
    }

    async fn handle(&self, method: &Method, target: &str, _body: Bytes) -> Response {
        if *method != Method::GET && *method != Method::HEAD {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                [(header::ALLOW, "GET, HEAD")],
                "Method not allowed",
            )
                .into_response();
        }

        if target.split('?').next() == Some("/") {
            self.render().await
        } else {
            self.static_file(target).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Document;
    use crate::template::Template;
    use std::fs;

    fn service(dir: &std::path::Path) -> PreviewService {
        PreviewService::new(Arc::new(ContentStore::new(Document::from_template(
            &Template::builtin(),
            dir.to_path_buf(),
        ))))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn root_serves_preview_without_caching() {
        let dir = tempfile::tempdir().unwrap();
        let preview = service(dir.path());
        preview.store.set_preview("<h1>Hi</h1>".to_string()).await;

        let response = preview.handle(&Method::GET, "/?t=12345", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(body_text(response).await, "<h1>Hi</h1>");
    }

    #[tokio::test]
    async fn serves_static_assets_from_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.js"), "console.log(1);").unwrap();
        let preview = service(dir.path());

        let response = preview.handle(&Method::GET, "/app.js?v=2", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/javascript; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "console.log(1);");
    }

    #[tokio::test]
    async fn resolution_failures_map_to_status_codes() {
        let dir = tempfile::tempdir().unwrap();
        let preview = service(dir.path());

        let forbidden = preview
            .handle(&Method::GET, "/../../etc/passwd", Bytes::new())
            .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let missing = preview.handle(&Method::GET, "/missing.css", Bytes::new()).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn post_is_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let preview = service(dir.path());

        let response = preview
            .handle(&Method::POST, "/", Bytes::from_static(b"{}"))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, HEAD");
    }
}
