use serde_yaml::{Mapping, Value};

use super::Retained;
use crate::document::{FieldPath, Segment};

/// What a merge changed and kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    /// Values where the instance differs from the template.
    pub retained: Option<Retained>,
    /// Paths copied in from the template.
    pub added: Vec<FieldPath>,
    /// Instance paths the template no longer has.
    pub dropped: Vec<FieldPath>,
}

impl MergeReport {
    pub fn has_customizations(&self) -> bool {
        self.retained.is_some()
    }

    pub fn changed_shape(&self) -> bool {
        !self.added.is_empty() || !self.dropped.is_empty()
    }
}

/// Reconcile `instance` with `template` in place.
///
/// Mapping keys follow the template (order included); sequences are merged
/// positionally, keeping trailing user additions; scalars keep the instance
/// value and report it when it differs. When the template has a container and
/// the instance a different kind, the template's subtree replaces it.
pub fn merge(instance: &mut Value, template: &Value) -> MergeReport {
    let mut report = MergeReport::default();
    let mut path = FieldPath::root();
    report.retained = merge_node(instance, template, &mut path, &mut report);
    if report.changed_shape() {
        tracing::debug!(
            added = report.added.len(),
            dropped = report.dropped.len(),
            "structural drift reconciled"
        );
    }
    report
}

/// Consume `instance` and return it merged alongside the report.
pub fn merged(mut instance: Value, template: &Value) -> (Value, MergeReport) {
    let report = merge(&mut instance, template);
    (instance, report)
}

fn merge_node(
    instance: &mut Value,
    template: &Value,
    path: &mut FieldPath,
    report: &mut MergeReport,
) -> Option<Retained> {
    match template {
        Value::Mapping(tmpl) => match instance {
            Value::Mapping(inst) => merge_mapping(inst, tmpl, path, report),
            other => {
                replace_shape(other, template, path, report);
                None
            }
        },
        Value::Sequence(tmpl) => match instance {
            Value::Sequence(inst) => merge_sequence(inst, tmpl, path, report),
            other => {
                replace_shape(other, template, path, report);
                None
            }
        },
        _ => (*instance != *template).then(|| Retained::Leaf(instance.clone())),
    }
}

fn replace_shape(
    instance: &mut Value,
    template: &Value,
    path: &FieldPath,
    report: &mut MergeReport,
) {
    tracing::warn!("{} changed kind in the template, resetting it to the default", path);
    report.dropped.push(path.clone());
    report.added.push(path.clone());
    *instance = template.clone();
}

fn merge_mapping(
    inst: &mut Mapping,
    tmpl: &Mapping,
    path: &mut FieldPath,
    report: &mut MergeReport,
) -> Option<Retained> {
    let mut previous = std::mem::take(inst);
    let mut retained = Vec::new();
    for (key, tvalue) in tmpl {
        path.push(Segment::from_key(key));
        match previous.remove(key) {
            Some(mut ivalue) => {
                if let Some(r) = merge_node(&mut ivalue, tvalue, path, report) {
                    retained.push((key.clone(), r));
                }
                inst.insert(key.clone(), ivalue);
            }
            None => {
                tracing::debug!("adding {}", path);
                report.added.push(path.clone());
                inst.insert(key.clone(), tvalue.clone());
            }
        }
        path.pop();
    }
    for (key, _) in previous {
        let gone = path.child(Segment::from_key(&key));
        tracing::debug!("dropping deprecated {}", gone);
        report.dropped.push(gone);
    }
    (!retained.is_empty()).then_some(Retained::Map(retained))
}

fn merge_sequence(
    inst: &mut Vec<Value>,
    tmpl: &[Value],
    path: &mut FieldPath,
    report: &mut MergeReport,
) -> Option<Retained> {
    let mut retained = Vec::new();
    for (idx, (ivalue, tvalue)) in inst.iter_mut().zip(tmpl.iter()).enumerate() {
        path.push(Segment::Index(idx));
        if let Some(r) = merge_node(ivalue, tvalue, path, report) {
            retained.push((idx, r));
        }
        path.pop();
    }
    if inst.len() > tmpl.len() {
        for (idx, extra) in inst.iter().enumerate().skip(tmpl.len()) {
            retained.push((idx, Retained::Leaf(extra.clone())));
        }
    } else {
        let start = inst.len();
        for (idx, missing) in tmpl.iter().enumerate().skip(start) {
            report.added.push(path.child(Segment::Index(idx)));
            inst.push(missing.clone());
        }
    }
    (!retained.is_empty()).then_some(Retained::Seq(retained))
}
