//! Editor registry: which leaf editor handles which field path.

use regex::Regex;

use crate::context::Layout;
use crate::document::FieldPath;

/// Strategy used to edit one leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorKind {
    /// Pointer records; never edited here.
    Managed,
    /// Required secret or identity value; `masked` hides it when displayed.
    Credential { masked: bool },
    Endpoint,
    Integer { min: i64 },
    Float { min: f64, max: f64 },
    /// One `models.model_N` slot of a provider.
    ModelSlot,
    /// Follows the type of the template (or current) value.
    Generic,
}

impl EditorKind {
    /// Fields the guided first run asks for when they still hold placeholders.
    pub fn is_required_text(&self) -> bool {
        matches!(self, EditorKind::Credential { .. } | EditorKind::Endpoint)
    }
}

/// Ordered (dotted-path regex, editor) rules; the first match wins.
#[derive(Debug, Clone)]
pub struct EditorRegistry {
    rules: Vec<(Regex, EditorKind)>,
}

impl EditorRegistry {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rules for the provider/pointer layout of the served tool.
    pub fn standard(layout: &Layout) -> Result<Self, regex::Error> {
        let mut reg = Self::empty();
        if !layout.pointer_fields.is_empty() {
            let names = layout
                .pointer_fields
                .iter()
                .map(|f| regex::escape(f))
                .collect::<Vec<_>>()
                .join("|");
            reg.push(&format!(r"^(?:{names})(?:\.|\[|$)"), EditorKind::Managed)?;
        }
        reg.push(r"(?:^|\.)api_key$", EditorKind::Credential { masked: true })?;
        reg.push(
            r"^[^.\[]+\.(?:email|username)$",
            EditorKind::Credential { masked: false },
        )?;
        reg.push(r"(?:^|\.)endpoint$", EditorKind::Endpoint)?;
        reg.push(r"(?:^|\.)max_tokens$", EditorKind::Integer { min: 1 })?;
        reg.push(
            r"(?:^|\.)temperature$",
            EditorKind::Float { min: 0.0, max: 2.0 },
        )?;
        reg.push(r"(?:^|\.)top_p$", EditorKind::Float { min: 0.0, max: 1.0 })?;
        reg.push(r"(?:^|\.)models\.model_[1-5]$", EditorKind::ModelSlot)?;
        Ok(reg)
    }

    /// Append a rule after the existing ones.
    pub fn push(&mut self, pattern: &str, kind: EditorKind) -> Result<(), regex::Error> {
        self.rules.push((Regex::new(pattern)?, kind));
        Ok(())
    }

    pub fn editor_for(&self, path: &FieldPath) -> EditorKind {
        let dotted = path.to_string();
        self.rules
            .iter()
            .find(|(re, _)| re.is_match(&dotted))
            .map(|(_, kind)| *kind)
            .unwrap_or(EditorKind::Generic)
    }
}
