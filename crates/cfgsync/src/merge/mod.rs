//! Template/instance reconciliation.
//!
//! The template is authoritative on shape, the instance on values: missing
//! fields are added, deprecated ones dropped, and every leaf the user changed
//! is kept and reported as a retained value.

pub mod reconcile;
pub mod retained;
pub mod sync;

pub use reconcile::*;
pub use retained::*;
pub use sync::*;
