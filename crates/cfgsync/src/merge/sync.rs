//! Load, reconcile and persist an instance against its template.

use std::path::Path;

use serde_yaml::{Mapping, Value};

use super::{MergeReport, merge};
use crate::context::SessionContext;
use crate::document::{FieldPath, key_text, store};
use crate::error::StoreError;

/// Outcome of [`sync`].
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// The reconciled, already persisted instance.
    pub merged: Value,
    pub merge: MergeReport,
    /// Structural additions outside pointer records.
    pub added: Vec<FieldPath>,
    /// Structural removals outside pointer records.
    pub dropped: Vec<FieldPath>,
    /// `merged` without pointer records.
    pub display: Value,
    /// Customizations outside pointer records, in compact form.
    pub customized: Option<Value>,
}

impl SyncReport {
    /// Lines describing what was reconciled and what was kept.
    pub fn summary(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.added.is_empty() {
            lines.push(format!("Added from template: {}", join_paths(&self.added)));
        }
        if !self.dropped.is_empty() {
            lines.push(format!(
                "Removed (no longer in template): {}",
                join_paths(&self.dropped)
            ));
        }
        match &self.customized {
            Some(doc) => {
                lines.push("Fields you previously customized:".to_string());
                let text = serde_yaml::to_string(doc).unwrap_or_default();
                lines.extend(text.lines().map(|l| format!("  {l}")));
            }
            None => lines.push("No customizations detected.".to_string()),
        }
        lines
    }
}

fn join_paths(paths: &[FieldPath]) -> String {
    paths
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Copy of `doc` without the given top-level keys.
pub fn display_copy(doc: &Value, hidden: &[String]) -> Value {
    match doc {
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                if !hidden.iter().any(|h| *h == key_text(k)) {
                    out.insert(k.clone(), v.clone());
                }
            }
            Value::Mapping(out)
        }
        other => other.clone(),
    }
}

/// Reconcile the instance at `instance_path` with the template and persist it.
///
/// Nothing is written unless both documents load.
pub fn sync(
    template_path: &Path,
    instance_path: &Path,
    ctx: &SessionContext,
) -> Result<SyncReport, StoreError> {
    let _enter = ctx.span().enter();
    let template = store::load(template_path)?;
    let mut instance = store::load(instance_path)?;
    let report = merge(&mut instance, &template);
    store::save(instance_path, &instance)?;

    let hidden = &ctx.layout.pointer_fields;
    let customized = report
        .retained
        .as_ref()
        .and_then(|r| r.without_top_level(hidden))
        .map(|r| r.to_document());
    tracing::info!(
        added = report.added.len(),
        dropped = report.dropped.len(),
        customized = customized.is_some(),
        "synchronized {} with {}",
        instance_path.display(),
        template_path.display()
    );
    let visible = |paths: &[FieldPath]| {
        paths
            .iter()
            .filter(|p| !ctx.layout.is_under_pointer(p))
            .cloned()
            .collect::<Vec<_>>()
    };
    Ok(SyncReport {
        added: visible(&report.added),
        dropped: visible(&report.dropped),
        display: display_copy(&instance, hidden),
        merged: instance,
        merge: report,
        customized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("write");
        path
    }

    #[test]
    fn sync_persists_and_hides_pointer_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = write(
            dir.path(),
            "t.yaml",
            "pubmed: {email: x}\nactive_model: {provider: your_provider}\nnew: 1\n",
        );
        let instance = write(
            dir.path(),
            "c.yaml",
            "pubmed: {email: me@lab.org}\nactive_model: {provider: deepseek}\n",
        );
        let report = sync(&template, &instance, &SessionContext::default()).expect("sync");

        let on_disk = store::load(&instance).expect("load");
        assert_eq!(on_disk, report.merged);
        assert_eq!(
            on_disk.get("new").and_then(Value::as_i64),
            Some(1),
            "structural addition persisted"
        );
        assert!(report.display.get("active_model").is_none());
        let customized = report.customized.clone().expect("customized");
        assert!(customized.get("active_model").is_none());
        assert_eq!(
            customized["pubmed"]["email"].as_str(),
            Some("me@lab.org")
        );
        let summary = report.summary().join("\n");
        assert!(summary.contains("Fields you previously customized"));
        assert!(summary.contains("Added from template: new"));
    }

    #[test]
    fn only_pointer_divergence_reports_no_customizations() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = write(dir.path(), "t.yaml", "a: 1\nactive_model: {model: none}\n");
        let instance = write(dir.path(), "c.yaml", "a: 1\nactive_model: {model: chat}\n");
        let report = sync(&template, &instance, &SessionContext::default()).expect("sync");
        assert!(report.merge.has_customizations());
        assert!(report.customized.is_none());
        assert_eq!(report.summary(), vec!["No customizations detected."]);
    }

    #[test]
    fn drift_inside_pointer_records_is_not_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = write(
            dir.path(),
            "t.yaml",
            "a: 1\nactive_model:\n  model: none\n  top_p: 1\n",
        );
        let instance = write(
            dir.path(),
            "c.yaml",
            "a: 1\nactive_model:\n  model: none\n  legacy_field: x\n",
        );
        let report = sync(&template, &instance, &SessionContext::default()).expect("sync");
        assert_eq!(report.merge.added, vec![FieldPath::parse("active_model.top_p")]);
        assert_eq!(
            report.merge.dropped,
            vec![FieldPath::parse("active_model.legacy_field")]
        );
        assert!(report.added.is_empty());
        assert!(report.dropped.is_empty());
        assert_eq!(report.summary(), vec!["No customizations detected."]);
        let on_disk = store::load(&instance).expect("load");
        assert!(on_disk["active_model"].get("top_p").is_some());
        assert!(on_disk["active_model"].get("legacy_field").is_none());
    }

    #[test]
    fn parse_failure_aborts_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = write(dir.path(), "t.yaml", "a: [broken\n");
        let body = "a: 2\nextra: true\n";
        let instance = write(dir.path(), "c.yaml", body);
        let err = sync(&template, &instance, &SessionContext::default()).expect_err("fails");
        assert!(matches!(err, StoreError::Parse { .. }));
        assert_eq!(fs::read_to_string(&instance).expect("read"), body);
    }
}
