//! Core Logic
//!
//! Shared document state, static asset resolution and port binding.

pub mod assets;
pub mod document;
pub mod ports;

pub use assets::{resolve, ResolveError, ResolvedAsset};
pub use document::{ContentSnapshot, ContentStore, Document, StoreError};
pub use ports::{bind_with_fallback, BindError, ListenerBinding};
