//! Structured documents: YAML value trees addressed by field paths.

pub mod path;
pub mod store;

pub use path::*;
pub use store::*;
