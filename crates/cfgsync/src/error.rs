//! Error taxonomy shared across components.
//!
//! `StoreError` covers documents that cannot be read, parsed or written and is
//! the only fatal family. `ValidationError` is recoverable: prompts re-ask on it.
//! Running out of attempts is not an error at all; see `prompt::Prompted`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{} contains no document", .path.display())]
    Empty { path: PathBuf },
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("a value is required")]
    Empty,
    #[error("'{0}' is a placeholder, enter a real value")]
    Placeholder(String),
    #[error("'{0}' is not a whole number")]
    NotInteger(String),
    #[error("'{0}' is not a number")]
    NotFloat(String),
    #[error("'{0}' is not true or false")]
    NotBoolean(String),
    #[error("{value} is outside the allowed range {range}")]
    OutOfRange { value: String, range: String },
    #[error("'{0}' means no model, enter a model identifier")]
    SentinelModel(String),
    #[error("'{model}' is already stored in {slot}")]
    DuplicateModel { model: String, slot: String },
    #[error("provider '{provider}' does not offer model '{model}'")]
    UnknownModel { provider: String, model: String },
    #[error("{0} is not a mapping")]
    NotAMapping(String),
}
