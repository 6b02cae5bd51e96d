//! Leaf editors: display, coercion and the value-entry primitive.

use serde_yaml::Value;

use super::Nav;
use super::editors::EditorKind;
use crate::context::SessionContext;
use crate::document::{FieldPath, scalar_text};
use crate::error::ValidationError;
use crate::prompt::{Prompted, Prompter, ask_until, parse_index};
use crate::provider::{NO_MODEL, is_placeholder};

/// Everything a leaf editor needs besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct LeafContext<'a> {
    pub path: &'a FieldPath,
    pub kind: EditorKind,
    /// Template value at the same path, when there is one.
    pub default: Option<&'a Value>,
    /// Other model slots of the same provider, as (slot, model).
    pub siblings: &'a [(String, String)],
}

/// Human rendering of a leaf; non-placeholder secrets are masked.
pub fn display_value(value: &Value, kind: EditorKind) -> String {
    let text = scalar_text(value);
    match kind {
        EditorKind::Credential { masked: true } if !is_placeholder(&text) => {
            let head: String = text.chars().take(3).collect();
            format!("{head}****")
        }
        _ => text,
    }
}

/// Leaf menu: show current and default, then enter a value or restore the
/// default.
pub fn edit_leaf(
    leaf: &mut Value,
    lc: &LeafContext<'_>,
    prompter: &mut dyn Prompter,
    ctx: &SessionContext,
) -> Nav {
    prompter.say(&lc.path.to_string());
    match lc.default {
        Some(default) if *default == *leaf => {
            prompter.say(&format!(
                "  current: (default) {}",
                display_value(leaf, lc.kind)
            ));
        }
        Some(default) => {
            prompter.say(&format!("  current: {}", display_value(leaf, lc.kind)));
            prompter.say(&format!("  default: {}", display_value(default, lc.kind)));
        }
        None => prompter.say(&format!("  current: {}", display_value(leaf, lc.kind))),
    }
    prompter.say("  1. Enter a new value");
    let options = if lc.default.is_some() {
        prompter.say("  2. Restore default");
        2
    } else {
        1
    };
    let prompt = format!("Choice [1-{options}, b, q]: ");
    match ask_until(prompter, &prompt, ctx.max_attempts, |a| {
        parse_index(a, options)
    }) {
        Prompted::Value(0) => enter_value(leaf, lc, prompter, ctx),
        Prompted::Value(_) => {
            if let Some(default) = lc.default {
                *leaf = default.clone();
                tracing::info!("{} restored to default", lc.path);
                prompter.say("  Restored default.");
            }
            Nav::Back
        }
        Prompted::Back | Prompted::Exhausted => Nav::Back,
        Prompted::Quit => Nav::Quit,
        Prompted::Closed => Nav::QuitAll,
    }
}

/// Ask for a value until it coerces, then store it.
///
/// `Continue` means a value was stored. `b` and exhaustion give `Back`, `q`
/// gives `Quit` and closed input `QuitAll`.
pub fn enter_value(
    leaf: &mut Value,
    lc: &LeafContext<'_>,
    prompter: &mut dyn Prompter,
    ctx: &SessionContext,
) -> Nav {
    let like = lc.default.cloned().unwrap_or_else(|| leaf.clone());
    let prompt = format!("New value for {}: ", lc.path);
    match ask_until(prompter, &prompt, ctx.max_attempts, |raw| {
        coerce(raw, lc, &like)
    }) {
        Prompted::Value(v) => {
            *leaf = v;
            tracing::info!("{} updated", lc.path);
            Nav::Continue
        }
        Prompted::Back | Prompted::Exhausted => Nav::Back,
        Prompted::Quit => Nav::Quit,
        Prompted::Closed => Nav::QuitAll,
    }
}

/// Turn raw input into a leaf value for the given editor.
///
/// `like` supplies the target type for generic leaves.
pub fn coerce(raw: &str, lc: &LeafContext<'_>, like: &Value) -> Result<Value, ValidationError> {
    let raw = raw.trim();
    match lc.kind {
        EditorKind::Credential { .. } | EditorKind::Endpoint => {
            required_text(raw).map(Value::from)
        }
        EditorKind::Integer { min } => {
            let n = parse_integer(raw)?;
            if n < min {
                return Err(ValidationError::OutOfRange {
                    value: raw.to_string(),
                    range: format!(">= {min}"),
                });
            }
            Ok(Value::from(n))
        }
        EditorKind::Float { min, max } => {
            let x = parse_float(raw)?;
            if !(min..=max).contains(&x) {
                return Err(ValidationError::OutOfRange {
                    value: raw.to_string(),
                    range: format!("[{min}, {max}]"),
                });
            }
            Ok(Value::from(x))
        }
        EditorKind::ModelSlot => {
            if raw.is_empty() {
                return Err(ValidationError::Empty);
            }
            if raw == NO_MODEL {
                return Err(ValidationError::SentinelModel(raw.to_string()));
            }
            if let Some((slot, _)) = lc.siblings.iter().find(|(_, m)| m == raw) {
                return Err(ValidationError::DuplicateModel {
                    model: raw.to_string(),
                    slot: slot.clone(),
                });
            }
            Ok(Value::from(raw))
        }
        EditorKind::Generic | EditorKind::Managed => coerce_like(raw, like),
    }
}

fn required_text(raw: &str) -> Result<&str, ValidationError> {
    if raw.is_empty() {
        Err(ValidationError::Empty)
    } else if is_placeholder(raw) {
        Err(ValidationError::Placeholder(raw.to_string()))
    } else {
        Ok(raw)
    }
}

fn parse_integer(raw: &str) -> Result<i64, ValidationError> {
    raw.parse::<i64>()
        .map_err(|_| ValidationError::NotInteger(raw.to_string()))
}

fn parse_float(raw: &str) -> Result<f64, ValidationError> {
    match raw.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(x),
        _ => Err(ValidationError::NotFloat(raw.to_string())),
    }
}

fn coerce_like(raw: &str, like: &Value) -> Result<Value, ValidationError> {
    match like {
        Value::Number(n) if n.is_f64() => parse_float(raw).map(Value::from),
        Value::Number(_) => parse_integer(raw).map(Value::from),
        Value::Bool(_) => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(Value::Bool(true)),
            "false" | "no" => Ok(Value::Bool(false)),
            _ => Err(ValidationError::NotBoolean(raw.to_string())),
        },
        _ if raw.is_empty() => Err(ValidationError::Empty),
        _ => Ok(Value::from(raw)),
    }
}
