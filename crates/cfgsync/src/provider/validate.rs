//! Provider usability and pointer consistency.

use std::fmt;

use serde_yaml::{Mapping, Value};

use super::types::*;
use crate::context::Layout;
use crate::error::ValidationError;

/// A usable provider with its real models and a scrubbed pointer descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableProvider {
    pub name: String,
    pub models: Vec<String>,
    /// Every non-model field of the provider, with `provider`/`model` left
    /// at their unassigned sentinels.
    pub descriptor: Mapping,
}

/// Usable providers in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailableProviders {
    entries: Vec<AvailableProvider>,
}

impl AvailableProviders {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvailableProvider> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&AvailableProvider> {
        self.entries.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|p| p.name.as_str()).collect()
    }

    /// Every (provider, model) pair, provider-major.
    pub fn combinations(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .flat_map(|p| p.models.iter().map(move |m| (p.name.as_str(), m.as_str())))
            .collect()
    }
}

fn descriptor(record: &Value) -> Mapping {
    let mut out = Mapping::new();
    out.insert(Value::from(PROVIDER_KEY), Value::from(UNASSIGNED_PROVIDER));
    out.insert(Value::from(MODEL_KEY), Value::from(NO_MODEL));
    if let Some(map) = record.as_mapping() {
        for (k, v) in map {
            if k.as_str() != Some(MODELS_KEY) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    out
}

/// Providers that pass the usability rule.
pub fn available_providers(doc: &Value, layout: &Layout) -> AvailableProviders {
    let mut entries = Vec::new();
    for p in providers(doc, layout) {
        if !p.is_usable() {
            tracing::debug!("provider '{}' is not usable", p.name);
            continue;
        }
        entries.push(AvailableProvider {
            name: p.name.to_string(),
            models: p.models(),
            descriptor: descriptor(p.record),
        });
    }
    AvailableProviders { entries }
}

/// First provider field the pointer's snapshot disagrees with.
///
/// `models` is never compared entry by entry: the pointer's single `model`
/// must be one of the provider's real models instead, reported as `model`.
pub fn first_mismatch(pointer: &Value, provider: &Value) -> Option<String> {
    let Some(record) = provider.as_mapping() else {
        return Some(PROVIDER_KEY.to_string());
    };
    for (key, expected) in record {
        let name = crate::document::key_text(key);
        if name == MODELS_KEY {
            let wanted = pointer_model(pointer).map(str::trim);
            let known = model_ids(Some(expected));
            if !wanted.is_some_and(|m| known.iter().any(|k| k == m)) {
                return Some(MODEL_KEY.to_string());
            }
            continue;
        }
        match pointer.get(key) {
            Some(actual) if values_match(expected, actual) => {}
            _ => return Some(name),
        }
    }
    None
}

fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Mapping(e), Value::Mapping(a)) => e
            .iter()
            .all(|(k, ev)| a.get(k).is_some_and(|av| values_match(ev, av))),
        _ => expected == actual,
    }
}

/// True when `pointer` is an assigned, faithful snapshot of `provider`.
pub fn pointer_is_consistent(pointer: &Value, provider: &Value) -> bool {
    match pointer_provider(pointer) {
        None => false,
        Some(name) if name == UNASSIGNED_PROVIDER => false,
        Some(_) => first_mismatch(pointer, provider).is_none(),
    }
}

/// Why a pointer does or does not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerStatus {
    Consistent,
    /// The pointer record is absent or not a mapping.
    Missing,
    Unassigned,
    /// The named provider no longer exists.
    MissingProvider(String),
    UnusableProvider(String),
    UnknownModel { provider: String, model: String },
    /// A copied field no longer equals the provider's.
    Drifted { provider: String, field: String },
}

impl PointerStatus {
    /// Anything but `Consistent` forces reselection.
    pub fn is_stale(&self) -> bool {
        !matches!(self, PointerStatus::Consistent)
    }
}

impl fmt::Display for PointerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerStatus::Consistent => f.write_str("ok"),
            PointerStatus::Missing => f.write_str("missing from the configuration"),
            PointerStatus::Unassigned => f.write_str("no model selected yet"),
            PointerStatus::MissingProvider(p) => write!(f, "provider '{p}' no longer exists"),
            PointerStatus::UnusableProvider(p) => {
                write!(f, "provider '{p}' lacks a key, an endpoint or models")
            }
            PointerStatus::UnknownModel { provider, model } => {
                write!(f, "model '{model}' is not offered by '{provider}'")
            }
            PointerStatus::Drifted { provider, field } => {
                write!(f, "'{field}' differs from provider '{provider}'")
            }
        }
    }
}

/// Classify the pointer stored at top-level key `field`.
pub fn check_pointer(doc: &Value, field: &str, layout: &Layout) -> PointerStatus {
    let Some(pointer) = doc.get(field).filter(|p| p.is_mapping()) else {
        return PointerStatus::Missing;
    };
    let name = match pointer_provider(pointer) {
        None => return PointerStatus::Unassigned,
        Some(n) if n == UNASSIGNED_PROVIDER => return PointerStatus::Unassigned,
        Some(n) => n.to_string(),
    };
    let Some(provider) = find_provider(doc, layout, &name) else {
        return PointerStatus::MissingProvider(name);
    };
    if !provider.is_usable() {
        return PointerStatus::UnusableProvider(name);
    }
    match first_mismatch(pointer, provider.record) {
        None => PointerStatus::Consistent,
        Some(f) if f == MODEL_KEY => PointerStatus::UnknownModel {
            provider: name,
            model: pointer_model(pointer).unwrap_or_default().to_string(),
        },
        Some(field) => PointerStatus::Drifted {
            provider: name,
            field,
        },
    }
}

/// Denormalize `provider`'s descriptor into the pointer at `field`.
///
/// Existing pointer keys the descriptor does not carry are kept.
pub fn assign_pointer(
    doc: &mut Value,
    field: &str,
    provider: &AvailableProvider,
    model: &str,
) -> Result<(), ValidationError> {
    if !provider.models.iter().any(|m| m == model) {
        return Err(ValidationError::UnknownModel {
            provider: provider.name.clone(),
            model: model.to_string(),
        });
    }
    let Some(root) = doc.as_mapping_mut() else {
        return Err(ValidationError::NotAMapping("(root)".to_string()));
    };
    let slot = root
        .entry(Value::from(field))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if !slot.is_mapping() {
        *slot = Value::Mapping(Mapping::new());
    }
    let Some(pointer) = slot.as_mapping_mut() else {
        return Err(ValidationError::NotAMapping(field.to_string()));
    };
    for (k, v) in &provider.descriptor {
        pointer.insert(k.clone(), v.clone());
    }
    pointer.insert(Value::from(PROVIDER_KEY), Value::from(provider.name.as_str()));
    pointer.insert(Value::from(MODEL_KEY), Value::from(model));
    tracing::info!("{} now points at {} / {}", field, provider.name, model);
    Ok(())
}
