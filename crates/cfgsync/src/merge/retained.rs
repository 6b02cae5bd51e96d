//! Retained values: the minimal witness of user customization.

use serde_yaml::{Mapping, Value};

use crate::document::{FieldPath, Segment, key_text};

/// Tree of values where the instance differs from the template.
///
/// Sequence entries remember their original position so that replaying onto
/// the template is exact even when unchanged positions are omitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Retained {
    Leaf(Value),
    Map(Vec<(Value, Retained)>),
    Seq(Vec<(usize, Retained)>),
}

impl Retained {
    /// Compact document form: mappings keep only divergent keys, sequences
    /// list the divergent entries in order.
    pub fn to_document(&self) -> Value {
        match self {
            Retained::Leaf(v) => v.clone(),
            Retained::Map(entries) => {
                let mut map = Mapping::new();
                for (k, r) in entries {
                    map.insert(k.clone(), r.to_document());
                }
                Value::Mapping(map)
            }
            Retained::Seq(entries) => {
                Value::Sequence(entries.iter().map(|(_, r)| r.to_document()).collect())
            }
        }
    }

    /// Write every retained value into `target` at its original position.
    pub fn apply_to(&self, target: &mut Value) {
        match self {
            Retained::Leaf(v) => *target = v.clone(),
            Retained::Map(entries) => {
                if !target.is_mapping() {
                    *target = Value::Mapping(Mapping::new());
                }
                let Value::Mapping(map) = target else {
                    return;
                };
                for (k, r) in entries {
                    match map.get_mut(k) {
                        Some(slot) => r.apply_to(slot),
                        None => {
                            map.insert(k.clone(), r.to_document());
                        }
                    }
                }
            }
            Retained::Seq(entries) => {
                if !target.is_sequence() {
                    *target = Value::Sequence(Vec::new());
                }
                let Value::Sequence(seq) = target else {
                    return;
                };
                for (idx, r) in entries {
                    match seq.get_mut(*idx) {
                        Some(slot) => r.apply_to(slot),
                        None => seq.push(r.to_document()),
                    }
                }
            }
        }
    }

    /// Divergent leaves with their paths, depth-first.
    pub fn leaves(&self) -> Vec<(FieldPath, Value)> {
        fn walk(node: &Retained, path: &mut FieldPath, out: &mut Vec<(FieldPath, Value)>) {
            match node {
                Retained::Leaf(v) => out.push((path.clone(), v.clone())),
                Retained::Map(entries) => {
                    for (k, r) in entries {
                        path.push(Segment::Key(key_text(k)));
                        walk(r, path, out);
                        path.pop();
                    }
                }
                Retained::Seq(entries) => {
                    for (i, r) in entries {
                        path.push(Segment::Index(*i));
                        walk(r, path, out);
                        path.pop();
                    }
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut FieldPath::root(), &mut out);
        out
    }

    /// Copy without the given top-level keys; `None` if nothing is left.
    pub fn without_top_level(&self, keys: &[String]) -> Option<Retained> {
        match self {
            Retained::Map(entries) => {
                let kept: Vec<(Value, Retained)> = entries
                    .iter()
                    .filter(|(k, _)| !keys.iter().any(|name| *name == key_text(k)))
                    .cloned()
                    .collect();
                (!kept.is_empty()).then_some(Retained::Map(kept))
            }
            other => Some(other.clone()),
        }
    }
}
