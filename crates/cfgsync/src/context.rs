//! Session-wide context handed explicitly to every component.

use tracing::Span;

use crate::document::FieldPath;

/// Prompts give up after this many invalid answers.
pub const MAX_ATTEMPTS: usize = 5;

/// Where provider and pointer records live in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Top-level key of the provider table.
    pub providers_key: String,
    /// Top-level keys of pointer records, in resolution order.
    pub pointer_fields: Vec<String>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            providers_key: "api".to_string(),
            pointer_fields: vec!["active_model".to_string(), "mesh_query_model".to_string()],
        }
    }
}

impl Layout {
    pub fn is_pointer_field(&self, name: &str) -> bool {
        self.pointer_fields.iter().any(|f| f == name)
    }

    /// True when `path` is a pointer record or lies inside one.
    pub fn is_under_pointer(&self, path: &FieldPath) -> bool {
        path.first_key().is_some_and(|k| self.is_pointer_field(k))
    }
}

/// Logging span plus the knobs every component consults.
#[derive(Debug, Clone)]
pub struct SessionContext {
    span: Span,
    pub max_attempts: usize,
    pub layout: Layout,
}

impl SessionContext {
    pub fn new(max_attempts: usize, layout: Layout) -> Self {
        let max_attempts = max_attempts.max(1);
        let span = tracing::info_span!(
            "session",
            providers = %layout.providers_key,
            attempts = max_attempts
        );
        Self {
            span,
            max_attempts,
            layout,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, Layout::default())
    }
}
