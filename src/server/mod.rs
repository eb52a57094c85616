//! HTTP Services
//!
//! The editor and preview services, the listener loop they share, and the
//! supervisor that runs them.

pub mod editor;
pub mod handler;
pub mod preview;
pub mod supervisor;

pub use editor::EditorService;
pub use handler::RequestHandler;
pub use preview::PreviewService;
pub use supervisor::{Phase, Supervisor};

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::core::ContentStore;
use crate::template::Template;

/// Load the document, then serve editor and preview until interrupted
pub async fn run(config: Config) -> Result<()> {
    let template = Template::discover(&config.template_candidates);
    let store = Arc::new(ContentStore::load(config.file.as_deref(), &template)?);

    println!("Starting HTML Editor...");
    println!(
        "Base directory for static files: {}",
        store.base_dir().await.display()
    );

    Supervisor::new(config, store, template.is_custom())
        .run_until_interrupted()
        .await
}
