//! Template-driven configuration maintenance.
//!
//! A persisted YAML configuration (the instance) is kept in step with a
//! canonical template: structural drift is reconciled without losing user
//! customizations, provider/pointer records are cross-checked, and an
//! interactive navigator lets the user browse and edit the document.

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod merge;
pub mod navigator;
pub mod prompt;
pub mod provider;
pub mod session;

pub use context::{Layout, SessionContext};
pub use error::{StoreError, ValidationError};
