//! Default document template.
//!
//! New documents start from the first readable user template in the lookup
//! chain, or from the built-in template compiled into the binary.

use std::fs;
use std::path::{Path, PathBuf};

/// Built-in starter document
pub const BUILTIN_TEMPLATE: &str = include_str!("../resources/templates/default.html");

/// Where the template text came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Custom(PathBuf),
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub source: TemplateSource,
    pub text: String,
}

impl Template {
    pub fn builtin() -> Self {
        Self {
            source: TemplateSource::Builtin,
            text: BUILTIN_TEMPLATE.to_string(),
        }
    }

    /// Walk `candidates` in order and take the first readable file
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Self {
        for candidate in candidates {
            let path = candidate.as_ref();
            if !path.is_file() {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(text) => {
                    log::info!("Using template {}", path.display());
                    return Self {
                        source: TemplateSource::Custom(path.to_path_buf()),
                        text,
                    };
                }
                Err(e) => log::warn!("Skipping template {}: {}", path.display(), e),
            }
        }

        Self::builtin()
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.source, TemplateSource::Custom(_))
    }
}
