//! HTML Editor
//!
//! A local HTML editor served to the browser over two HTTP listeners.
//!
//! This library provides:
//! - The shared document store behind both listeners
//! - Static asset resolution confined to a base directory
//! - Port binding with upward fallback
//! - The editor and preview services and their supervisor

pub mod config;
pub mod core;
pub mod server;
pub mod template;

pub use config::Config;
pub use crate::core::{ContentStore, Document};
pub use server::{Supervisor, run};
pub use template::Template;
