//! Document State
//!
//! The shared content store behind both services. A single lock covers the
//! document text, the preview snapshot, the backing path and the base
//! directory, so readers never see half of a save.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::template::Template;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything guarded by the store lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Current document text
    pub text: String,
    /// Text as last read from or written to the backing file
    pub saved_text: String,
    /// Text served by the preview root
    pub preview: String,
    /// Backing file, unset until loaded or first saved
    pub source_path: Option<PathBuf>,
    /// Root for preview static assets
    pub base_dir: PathBuf,
}

impl Document {
    /// Fresh document from a template, assets served from `base_dir`
    pub fn from_template(template: &Template, base_dir: PathBuf) -> Self {
        Self {
            text: template.text.clone(),
            saved_text: template.text.clone(),
            preview: template.text.clone(),
            source_path: None,
            base_dir,
        }
    }

    /// Document backed by the file at `path`
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = parent_dir(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            saved_text: text.clone(),
            preview: text.clone(),
            text,
            source_path: Some(path.to_path_buf()),
            base_dir,
        })
    }

    fn filename(&self) -> Option<String> {
        self.source_path.as_deref().and_then(basename)
    }
}

/// What `/get-content` reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSnapshot {
    pub text: String,
    pub filename: Option<String>,
    pub modified: bool,
}

/// Process-wide content shared by the editor and preview services
#[derive(Debug)]
pub struct ContentStore {
    document: Mutex<Document>,
}

impl ContentStore {
    pub fn new(document: Document) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    /// Startup load: an existing `source` wins, anything else starts from
    /// `template` with assets served from the working directory.
    pub fn load(source: Option<&Path>, template: &Template) -> Result<Self, StoreError> {
        let document = match source {
            Some(path) if path.exists() => Document::open(path)?,
            other => {
                if let Some(path) = other {
                    log::warn!("File '{}' not found, starting from template", path.display());
                }
                let cwd = std::env::current_dir().map_err(|source| StoreError::Read {
                    path: PathBuf::from("."),
                    source,
                })?;
                Document::from_template(template, cwd)
            }
        };

        Ok(Self::new(document))
    }

    pub async fn snapshot(&self) -> ContentSnapshot {
        let doc = self.document.lock().await;
        ContentSnapshot {
            text: doc.text.clone(),
            filename: doc.filename(),
            modified: doc.text != doc.saved_text,
        }
    }

    /// Replace the preview with `text`, verbatim. The document text follows
    /// so a reloaded editor picks up where it left off.
    pub async fn set_preview(&self, text: String) {
        let mut doc = self.document.lock().await;
        doc.text.clone_from(&text);
        doc.preview = text;
    }

    pub async fn preview(&self) -> String {
        self.document.lock().await.preview.clone()
    }

    pub async fn base_dir(&self) -> PathBuf {
        self.document.lock().await.base_dir.clone()
    }

    #[cfg(test)]
    pub(crate) async fn document(&self) -> Document {
        self.document.lock().await.clone()
    }

    /// Write `text` to the backing file, assigning `default_path` when there
    /// is none yet. Returns the file's basename.
    ///
    /// Text, preview and path are committed before the write, which runs
    /// with the lock released, so a preview-sync arriving mid-write is kept.
    /// The base directory and saved text follow only once the write succeeds.
    pub async fn save(&self, text: String, default_path: &Path) -> Result<String, StoreError> {
        let path = {
            let mut doc = self.document.lock().await;
            doc.text.clone_from(&text);
            doc.preview.clone_from(&text);
            doc.source_path
                .get_or_insert_with(|| default_path.to_path_buf())
                .clone()
        };

        if let Err(source) = tokio::fs::write(&path, text.as_bytes()).await {
            return Err(StoreError::Write { path, source });
        }

        let base_dir = parent_dir(&path).map_err(|source| StoreError::Write {
            path: path.clone(),
            source,
        })?;

        let mut doc = self.document.lock().await;
        doc.base_dir = base_dir;
        doc.saved_text = text;

        Ok(basename(&path).unwrap_or_default())
    }
}

fn basename(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Absolute parent of `path`, resolving relative paths against the working directory
fn parent_dir(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    Ok(absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(absolute))
}
