//! Editor service: bundled UI plus the content API.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::ContentStore;
use crate::server::handler::RequestHandler;

const INDEX_HTML: &str = include_str!("../../resources/ui/index.html");
const EDITOR_JS: &str = include_str!("../../resources/ui/editor.js");
const EDITOR_CSS: &str = include_str!("../../resources/ui/editor.css");

/// Fixed UI assets: (path, content type, body)
const UI_ASSETS: &[(&str, &str, &str)] = &[
    ("/", "text/html; charset=utf-8", INDEX_HTML),
    ("/index.html", "text/html; charset=utf-8", INDEX_HTML),
    ("/editor.js", "application/javascript; charset=utf-8", EDITOR_JS),
    ("/editor.css", "text/css; charset=utf-8", EDITOR_CSS),
];

/// `/get-content` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentResponse {
    pub content: String,
    pub filename: Option<String>,
    pub preview_port: u16,
    pub has_custom_template: bool,
    pub modified: bool,
}

/// Body of `/update-preview` and `/save-file`; every field optional
#[derive(Debug, Default, Deserialize)]
pub struct ContentRequest {
    #[serde(default)]
    pub content: Option<String>,
}

impl ContentRequest {
    /// Parse leniently: invalid UTF-8 is replaced, unparsable JSON reads as an
    /// empty request.
    pub fn parse(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("Ignoring malformed request body: {}", e);
                Self::default()
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum SaveResponse {
    Saved { success: bool, filename: String },
    Failed { success: bool, error: String },
}

pub struct EditorService {
    store: Arc<ContentStore>,
    preview_port: u16,
    has_custom_template: bool,
    default_path: PathBuf,
}

impl EditorService {
    pub fn new(
        store: Arc<ContentStore>,
        preview_port: u16,
        has_custom_template: bool,
        default_path: PathBuf,
    ) -> Self {
        Self {
            store,
            preview_port,
            has_custom_template,
            default_path,
        }
    }

    async fn get_content(&self) -> Response {
        let snapshot = self.store.snapshot().await;
        api_response(ContentResponse {
            content: snapshot.text,
            filename: snapshot.filename,
            preview_port: self.preview_port,
            has_custom_template: self.has_custom_template,
            modified: snapshot.modified,
        })
    }

    async fn update_preview(&self, body: &[u8]) -> Response {
        // A missing `content` is a no-op that still reports success
        if let Some(content) = ContentRequest::parse(body).content {
            self.store.set_preview(content).await;
        }
        api_response(UpdateResponse { success: true })
    }

    async fn save_file(&self, body: &[u8]) -> Response {
        let Some(content) = ContentRequest::parse(body).content else {
            return api_response(SaveResponse::Failed {
                success: false,
                error: "No content provided".to_string(),
            });
        };

        match self.store.save(content, &self.default_path).await {
            Ok(filename) => {
                log::info!("Saved {}", filename);
                api_response(SaveResponse::Saved {
                    success: true,
                    filename,
                })
            }
            Err(e) => {
                log::error!("Save failed: {}", e);
                api_response(SaveResponse::Failed {
                    success: false,
                    error: e.to_string(),
                })
            }
        }
    }
}

impl RequestHandler for EditorService {
    fn name(&self) -> &'static str {
        "editor"
    }

    async fn handle(&self, method: &Method, target: &str, body: Bytes) -> Response {
        let path = target.split('?').next().unwrap_or_default();

        match (method, path) {
            (&Method::GET, "/get-content") => self.get_content().await,
            (&Method::POST, "/update-preview") => self.update_preview(&body).await,
            (&Method::POST, "/save-file") => self.save_file(&body).await,
            (&Method::GET | &Method::HEAD, _) => match UI_ASSETS.iter().find(|(p, _, _)| *p == path) {
                Some((_, mime, content)) => {
                    ([(header::CONTENT_TYPE, *mime)], *content).into_response()
                }
                None => not_found(),
            },
            _ => not_found(),
        }
    }
}

fn api_response<T: Serialize>(body: T) -> Response {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(body),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}
