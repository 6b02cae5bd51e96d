//! Interactive, path-addressed browsing and editing of a document.
//!
//! The navigator keeps a path stack into the live instance and reads the
//! template at the same path for defaults and resets. Every step reports a
//! [`Nav`] signal to its caller instead of unwinding.

pub mod editors;
pub mod leaf;

pub use editors::*;
pub use leaf::*;

use serde_yaml::{Mapping, Value};

use crate::context::SessionContext;
use crate::document::{FieldPath, Segment, key_text, lookup, lookup_mut};
use crate::prompt::{Prompted, Prompter, ask_until, confirm, parse_index};
use crate::provider::{is_real_model, pointer_model, pointer_provider};

/// Navigation signal returned up the call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nav {
    /// Work at this level finished normally.
    Continue,
    /// Return to the parent menu.
    Back,
    /// Abandon the current edit; the parent re-prompts.
    Quit,
    /// End the whole editing session.
    QuitAll,
}

enum Choice {
    Child(Segment),
    Reset,
    Done,
}

pub struct Navigator<'a> {
    ctx: &'a SessionContext,
    registry: &'a EditorRegistry,
    template: &'a Value,
    prompter: &'a mut dyn Prompter,
    path: FieldPath,
}

impl<'a> Navigator<'a> {
    pub fn new(
        ctx: &'a SessionContext,
        registry: &'a EditorRegistry,
        template: &'a Value,
        prompter: &'a mut dyn Prompter,
    ) -> Self {
        Self {
            ctx,
            registry,
            template,
            prompter,
            path: FieldPath::root(),
        }
    }

    /// Browse `doc` from the root until the user is done or quits.
    ///
    /// `Continue` and `Back` both mean the session may go on; `QuitAll` means
    /// the user abandoned editing. Edits made so far stay in `doc` either way.
    pub fn run(&mut self, doc: &mut Value) -> Nav {
        let ctx = self.ctx;
        let _g = ctx.span().enter();
        self.path = FieldPath::root();
        let nav = self.browse(doc);
        tracing::debug!("navigator finished with {:?}", nav);
        nav
    }

    fn visit(&mut self, doc: &mut Value) -> Nav {
        let kind = self.registry.editor_for(&self.path);
        if kind == EditorKind::Managed {
            self.prompter.say(&format!(
                "{} is managed by model selection and cannot be edited here.",
                self.path
            ));
            return Nav::Back;
        }
        match lookup(doc, &self.path) {
            None => Nav::Back,
            Some(Value::Mapping(_)) | Some(Value::Sequence(_)) => self.browse(doc),
            Some(_) => self.edit(doc, kind),
        }
    }

    fn edit(&mut self, doc: &mut Value, kind: EditorKind) -> Nav {
        let template = self.template;
        let path = self.path.clone();
        let default = lookup(template, &path).filter(|v| !v.is_mapping() && !v.is_sequence());
        let siblings = if kind == EditorKind::ModelSlot {
            model_siblings(doc, &path)
        } else {
            Vec::new()
        };
        let lc = LeafContext {
            path: &path,
            kind,
            default,
            siblings: &siblings,
        };
        let Some(leaf) = lookup_mut(doc, &path) else {
            return Nav::Back;
        };
        edit_leaf(leaf, &lc, &mut *self.prompter, self.ctx)
    }

    fn browse(&mut self, doc: &mut Value) -> Nav {
        loop {
            let Some(node) = lookup(doc, &self.path) else {
                return Nav::Back;
            };
            let entries = self.entries(node);
            let at_root = self.path.is_root();
            self.prompter.say("");
            self.prompter.say(&if at_root {
                "Configuration".to_string()
            } else {
                self.path.to_string()
            });
            for (i, (_, label, preview)) in entries.iter().enumerate() {
                self.prompter.say(&format!("  {}. {label}: {preview}", i + 1));
            }
            self.prompter.say("  r. Reset to template defaults");
            let prompt = if at_root {
                self.prompter.say("  d. Done");
                format!("Choice [1-{}, name, r, d, q]: ", entries.len())
            } else {
                format!("Choice [1-{}, name, r, b, q]: ", entries.len())
            };
            let answer = ask_until(&mut *self.prompter, &prompt, self.ctx.max_attempts, |a| {
                parse_choice(a, &entries, at_root)
            });
            match answer {
                Prompted::Value(Choice::Child(segment)) => {
                    self.path.push(segment);
                    let nav = self.visit(doc);
                    self.path.pop();
                    if nav == Nav::QuitAll {
                        return Nav::QuitAll;
                    }
                }
                Prompted::Value(Choice::Reset) => {
                    let outcome = if at_root {
                        self.reset_root(doc)
                    } else {
                        self.reset_subtree(doc)
                    };
                    if let Some(nav) = outcome {
                        return nav;
                    }
                }
                Prompted::Value(Choice::Done) => return Nav::Continue,
                Prompted::Back if at_root => self.prompter.say("Already at the top."),
                Prompted::Back | Prompted::Exhausted => return Nav::Back,
                Prompted::Quit | Prompted::Closed => return Nav::QuitAll,
            }
        }
    }

    fn entries(&self, node: &Value) -> Vec<(Segment, String, String)> {
        let mut out = Vec::new();
        match node {
            Value::Mapping(map) => {
                for (k, v) in map {
                    let segment = Segment::from_key(k);
                    let preview = self.preview(&self.path.child(segment.clone()), v);
                    out.push((segment, key_text(k), preview));
                }
            }
            Value::Sequence(seq) => {
                for (i, v) in seq.iter().enumerate() {
                    let segment = Segment::Index(i);
                    let preview = self.preview(&self.path.child(segment.clone()), v);
                    out.push((segment, format!("[{i}]"), preview));
                }
            }
            _ => {}
        }
        out
    }

    fn preview(&self, path: &FieldPath, value: &Value) -> String {
        let kind = self.registry.editor_for(path);
        match value {
            Value::Mapping(_) if kind == EditorKind::Managed => format!(
                "{} / {} (managed)",
                pointer_provider(value).unwrap_or("?"),
                pointer_model(value).unwrap_or("?")
            ),
            Value::Mapping(map) => format!("{{{} fields}}", map.len()),
            Value::Sequence(seq) => format!("[{} items]", seq.len()),
            scalar => display_value(scalar, kind),
        }
    }

    /// `None` means cancelled: re-prompt the same menu.
    fn reset_subtree(&mut self, doc: &mut Value) -> Option<Nav> {
        let template = self.template;
        let Some(default) = lookup(template, &self.path) else {
            self.prompter.say(&format!("{} has no template default.", self.path));
            return None;
        };
        let prompt = format!("Reset {} to template defaults? [y/n]: ", self.path);
        match confirm(&mut *self.prompter, &prompt, self.ctx.max_attempts) {
            Prompted::Value(true) => {
                let node = lookup_mut(doc, &self.path)?;
                *node = default.clone();
                tracing::info!("{} reset to template", self.path);
                Some(Nav::Back)
            }
            Prompted::Closed => Some(Nav::QuitAll),
            _ => None,
        }
    }

    /// Two-stage reset at the root: shown fields first, then optionally the
    /// whole document including pointer records.
    fn reset_root(&mut self, doc: &mut Value) -> Option<Nav> {
        let max = self.ctx.max_attempts;
        let first = confirm(
            &mut *self.prompter,
            "Restore all shown fields to template defaults (model selections are kept)? [y/n]: ",
            max,
        );
        match first {
            Prompted::Value(true) => {}
            Prompted::Closed => return Some(Nav::QuitAll),
            _ => return None,
        }
        let second = confirm(
            &mut *self.prompter,
            "Also restore the entire document, model selections included? [y/n]: ",
            max,
        );
        match second {
            Prompted::Value(true) => {
                *doc = self.template.clone();
                tracing::info!("document reset to template");
            }
            Prompted::Value(false) => {
                *doc = self.restore_shown(&*doc);
                tracing::info!("shown fields reset to template");
            }
            Prompted::Closed => return Some(Nav::QuitAll),
            _ => return None,
        }
        self.prompter.say("Defaults restored.");
        Some(Nav::Continue)
    }

    fn restore_shown(&self, doc: &Value) -> Value {
        let Some(template) = self.template.as_mapping() else {
            return self.template.clone();
        };
        let layout = &self.ctx.layout;
        let mut out = Mapping::new();
        for (k, v) in template {
            let kept = if layout.is_pointer_field(&key_text(k)) {
                doc.get(k).cloned()
            } else {
                None
            };
            out.insert(k.clone(), kept.unwrap_or_else(|| v.clone()));
        }
        Value::Mapping(out)
    }
}

fn parse_choice(
    answer: &str,
    entries: &[(Segment, String, String)],
    at_root: bool,
) -> Result<Choice, String> {
    if answer.eq_ignore_ascii_case("r") {
        return Ok(Choice::Reset);
    }
    if at_root && answer.eq_ignore_ascii_case("d") {
        return Ok(Choice::Done);
    }
    if answer.chars().all(|c| c.is_ascii_digit()) && !answer.is_empty() {
        let i = parse_index(answer, entries.len())?;
        return Ok(Choice::Child(entries[i].0.clone()));
    }
    entries
        .iter()
        .find(|(segment, _, _)| matches!(segment, Segment::Key(k) if k == answer))
        .map(|(segment, _, _)| Choice::Child(segment.clone()))
        .ok_or_else(|| format!("no field named '{answer}'"))
}

/// Real models held by the other slots of the mapping containing `path`.
fn model_siblings(doc: &Value, path: &FieldPath) -> Vec<(String, String)> {
    let mut parent = path.clone();
    let own = parent.pop();
    let Some(map) = lookup(doc, &parent).and_then(Value::as_mapping) else {
        return Vec::new();
    };
    map.iter()
        .filter(|(k, _)| own.as_ref() != Some(&Segment::from_key(k)))
        .filter_map(|(k, v)| {
            let model = v.as_str().filter(|m| is_real_model(m))?;
            Some((key_text(k), model.trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;
    use crate::prompt::ScriptedPrompter;
    use crate::session::BUNDLED_TEMPLATE;

    fn template() -> Value {
        serde_yaml::from_str(BUNDLED_TEMPLATE).expect("template")
    }

    fn drive(doc: &mut Value, answers: &[&str]) -> (Nav, ScriptedPrompter) {
        let ctx = SessionContext::default();
        let registry = EditorRegistry::standard(&ctx.layout).expect("rules");
        let template = template();
        let mut p = ScriptedPrompter::new(answers.iter().copied());
        let nav = Navigator::new(&ctx, &registry, &template, &mut p).run(doc);
        (nav, p)
    }

    fn at<'d>(doc: &'d Value, path: &str) -> &'d Value {
        lookup(doc, &FieldPath::parse(path)).expect("path present")
    }

    #[test]
    fn descend_edit_and_back_out() {
        let mut doc = template();
        let (nav, p) = drive(&mut doc, &["api", "1", "5", "1", "0.3", "b", "b", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert_eq!(at(&doc, "api.deepseek.temperature"), &Value::from(0.3));
        assert!(p.saw("api.deepseek.temperature"));
        assert!(p.saw("current: (default) 0.7"));
        assert_eq!(p.remaining(), 0);
    }

    #[test]
    fn back_at_root_is_a_no_op() {
        let mut doc = template();
        let (nav, p) = drive(&mut doc, &["b", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert!(p.saw("Already at the top."));
        assert_eq!(doc, template());
    }

    #[test]
    fn pointer_records_cannot_be_edited() {
        let mut doc = template();
        let (nav, p) = drive(&mut doc, &["active_model", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert!(p.saw("active_model is managed by model selection"));
        assert!(p.saw("your_provider / No_default_model (managed)"));
    }

    #[test]
    fn quit_ends_session_and_keeps_edits() {
        let mut doc = template();
        let (nav, _) = drive(&mut doc, &["pubmed", "1", "1", "me@example.org", "q"]);
        assert_eq!(nav, Nav::QuitAll);
        assert_eq!(at(&doc, "pubmed.email"), &Value::from("me@example.org"));
    }

    #[test]
    fn quit_in_leaf_returns_to_parent_menu() {
        let mut doc = template();
        let (nav, _) = drive(&mut doc, &["pubmed", "2", "q", "b", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert_eq!(doc, template());
    }

    #[test]
    fn closed_input_propagates_from_deep_leaf() {
        let mut doc = template();
        let (nav, _) = drive(&mut doc, &["api", "2", "1", "1"]);
        assert_eq!(nav, Nav::QuitAll);
    }

    #[test]
    fn model_slot_rejects_duplicate_of_sibling() {
        let mut doc = template();
        let answers = [
            "api", "deepseek", "models", "model_3", "1", "deepseek-chat", "deepseek-coder", "b",
            "b", "b", "d",
        ];
        let (nav, p) = drive(&mut doc, &answers);
        assert_eq!(nav, Nav::Continue);
        assert!(p.saw("'deepseek-chat' is already stored in model_1"));
        assert_eq!(
            at(&doc, "api.deepseek.models.model_3"),
            &Value::from("deepseek-coder")
        );
    }

    #[test]
    fn subtree_reset_restores_template_and_returns_to_parent() {
        let mut doc = template();
        doc["api"]["deepseek"]["api_key"] = Value::from("sk-live");
        doc["api"]["deepseek"]["top_p"] = Value::from(0.5);
        let (nav, _) = drive(&mut doc, &["api", "deepseek", "r", "y", "b", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert_eq!(doc, template());
    }

    #[test]
    fn declined_reset_re_prompts() {
        let mut doc = template();
        doc["pubmed"]["email"] = Value::from("me@example.org");
        let before = doc.clone();
        let (nav, p) = drive(&mut doc, &["pubmed", "r", "n", "b", "d"]);
        assert_eq!(nav, Nav::Continue);
        assert_eq!(doc, before);
        assert!(p.saw("Reset pubmed to template defaults?"));
    }

    #[test]
    fn root_reset_then_merge_yields_template() {
        let mut doc = template();
        doc["pubmed"]["email"] = Value::from("me@example.org");
        doc["active_model"]["provider"] = Value::from("deepseek");
        doc.as_mapping_mut()
            .expect("mapping")
            .insert(Value::from("legacy"), Value::from(1));
        let (nav, _) = drive(&mut doc, &["r", "y", "y"]);
        assert_eq!(nav, Nav::Continue);
        let report = merge(&mut doc, &template());
        assert_eq!(doc, template());
        assert!(report.retained.is_none());
    }

    #[test]
    fn root_reset_of_shown_fields_keeps_pointers() {
        let mut doc = template();
        doc["pubmed"]["email"] = Value::from("me@example.org");
        doc["active_model"]["provider"] = Value::from("deepseek");
        doc.as_mapping_mut()
            .expect("mapping")
            .insert(Value::from("legacy"), Value::from(1));
        let (nav, _) = drive(&mut doc, &["r", "y", "n"]);
        assert_eq!(nav, Nav::Continue);
        assert_eq!(at(&doc, "pubmed.email"), at(&template(), "pubmed.email"));
        assert_eq!(at(&doc, "active_model.provider"), &Value::from("deepseek"));
        assert!(doc.get("legacy").is_none());
    }

    #[test]
    fn exhausted_root_prompt_goes_back() {
        let mut doc = template();
        let (nav, p) = drive(&mut doc, &["zz"; 5]);
        assert_eq!(nav, Nav::Back);
        assert!(p.saw("no field named 'zz'"));
    }

    #[test]
    fn sequence_entries_are_addressable() {
        let mut doc = template();
        let (nav, _) = drive(
            &mut doc,
            &["output", "directories", "2", "1", "tmp", "b", "b", "d"],
        );
        assert_eq!(nav, Nav::Continue);
        assert_eq!(at(&doc, "output.directories[1]"), &Value::from("tmp"));
    }
}
