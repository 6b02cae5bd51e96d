use serde_yaml::Value;

use crate::context::Layout;

/// Provider name of a pointer that was never assigned.
pub const UNASSIGNED_PROVIDER: &str = "your_provider";
/// Model slot value meaning "no model".
pub const NO_MODEL: &str = "No_default_model";
pub const PLACEHOLDER_ENDPOINT: &str = "https://default_endpoint.com";
pub const PLACEHOLDER_API_KEY: &str = "your_api_key";

pub const MODELS_KEY: &str = "models";
pub const PROVIDER_KEY: &str = "provider";
pub const MODEL_KEY: &str = "model";
pub const ENDPOINT_KEY: &str = "endpoint";
pub const API_KEY_KEY: &str = "api_key";

/// True for values that only mark a field as unset.
pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim();
    v.is_empty()
        || v == UNASSIGNED_PROVIDER
        || v == NO_MODEL
        || v == PLACEHOLDER_ENDPOINT
        || v == PLACEHOLDER_API_KEY
        || v.starts_with("your_")
}

/// True when a model slot holds a real identifier.
pub fn is_real_model(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v != NO_MODEL
}

/// Borrowed view of one entry of the provider table.
#[derive(Debug, Clone, Copy)]
pub struct ProviderView<'a> {
    pub name: &'a str,
    pub record: &'a Value,
}

impl<'a> ProviderView<'a> {
    fn text(&self, key: &str) -> Option<&'a str> {
        self.record.get(key).and_then(Value::as_str)
    }

    pub fn endpoint(&self) -> Option<&'a str> {
        self.text(ENDPOINT_KEY)
    }

    pub fn api_key(&self) -> Option<&'a str> {
        self.text(API_KEY_KEY)
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key().is_some_and(|k| !is_placeholder(k))
            && self.endpoint().is_some_and(|e| !is_placeholder(e))
    }

    /// Real model identifiers in slot order.
    pub fn models(&self) -> Vec<String> {
        model_ids(self.record.get(MODELS_KEY))
    }

    /// Usable: real key, real endpoint, at least one real model.
    pub fn is_usable(&self) -> bool {
        self.has_credentials() && !self.models().is_empty()
    }
}

/// Real model identifiers held by a `models` collection (mapping or list).
pub fn model_ids(models: Option<&Value>) -> Vec<String> {
    let values: Vec<&Value> = match models {
        Some(Value::Mapping(map)) => map.values().collect(),
        Some(Value::Sequence(seq)) => seq.iter().collect(),
        _ => Vec::new(),
    };
    values
        .into_iter()
        .filter_map(Value::as_str)
        .filter(|m| is_real_model(m))
        .map(|m| m.trim().to_string())
        .collect()
}

/// Every mapping-valued entry of the provider table, in document order.
pub fn providers<'a>(doc: &'a Value, layout: &Layout) -> Vec<ProviderView<'a>> {
    let Some(table) = doc
        .get(layout.providers_key.as_str())
        .and_then(Value::as_mapping)
    else {
        return Vec::new();
    };
    table
        .iter()
        .filter(|(_, record)| record.is_mapping())
        .filter_map(|(name, record)| {
            let name = name.as_str()?;
            Some(ProviderView { name, record })
        })
        .collect()
}

/// Look up one provider record by name.
pub fn find_provider<'a>(doc: &'a Value, layout: &Layout, name: &str) -> Option<ProviderView<'a>> {
    providers(doc, layout).into_iter().find(|p| p.name == name)
}

/// Provider name stored in a pointer record, if any.
pub fn pointer_provider(pointer: &Value) -> Option<&str> {
    pointer.get(PROVIDER_KEY).and_then(Value::as_str)
}

/// Model stored in a pointer record, if any.
pub fn pointer_model(pointer: &Value) -> Option<&str> {
    pointer.get(MODEL_KEY).and_then(Value::as_str)
}
