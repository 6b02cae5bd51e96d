//! Provider records and the pointer records that select one of their models.

pub mod select;
pub mod types;
pub mod validate;

pub use select::*;
pub use types::*;
pub use validate::*;
