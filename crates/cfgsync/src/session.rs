//! Session orchestration.
//!
//! A session loads the template and instance, reconciles them (or walks the
//! user through a guided first run), optionally hands the document to the
//! navigator, resolves stale model selections and persists the result.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};
use serde_yaml::Value;

use crate::config::expand_home;
use crate::context::SessionContext;
use crate::document::{FieldPath, Segment, leaf_paths, lookup, lookup_mut, scalar_text, store};
use crate::merge::sync;
use crate::navigator::{EditorKind, EditorRegistry, LeafContext, Nav, Navigator, enter_value};
use crate::prompt::{Prompted, Prompter, ask_until, confirm, parse_index};
use crate::provider::{
    MODELS_KEY, PointerStatus, assign_pointer, available_providers, check_pointer,
    choose_pointer, is_placeholder, providers,
};

/// Template shipped with the tool.
pub const BUNDLED_TEMPLATE: &str = include_str!("../config.yaml.template");

const OUTPUT_KEY: &str = "output";
const SAVE_PATH_KEY: &str = "save_path";
const DIRECTORIES_KEY: &str = "directories";
const NO_PROVIDERS: &str =
    "No provider has an API key, an endpoint and a model yet; skipping model selection.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub template: PathBuf,
    pub instance: PathBuf,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Saved, and every pointer resolves.
    Ready,
    /// Saved, but these pointers still need a model.
    Incomplete { stale: Vec<String> },
    /// The user quit; `saved` tells whether the document was written.
    Aborted { saved: bool },
}

/// Non-interactive status of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    /// Provider name and whether it is usable.
    pub providers: Vec<(String, bool)>,
    pub pointers: Vec<(String, PointerStatus)>,
}

impl CheckReport {
    pub fn is_ready(&self) -> bool {
        self.pointers.iter().all(|(_, s)| !s.is_stale())
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["Providers:".to_string()];
        for (name, usable) in &self.providers {
            let state = if *usable { "usable" } else { "not configured" };
            lines.push(format!("  {name}: {state}"));
        }
        lines.push("Model selections:".to_string());
        for (field, status) in &self.pointers {
            lines.push(format!("  {field}: {status}"));
        }
        lines
    }
}

/// Where a session goes after the post-sync menu or guided setup.
enum Step {
    Finish(Value),
    Stop(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterSync {
    Keep,
    Edit,
    Delete,
}

const AFTER_SYNC_MENU: [(AfterSync, &str); 3] = [
    (AfterSync::Keep, "Keep this configuration"),
    (AfterSync::Edit, "Edit it"),
    (AfterSync::Delete, "Delete it and reconfigure from the template"),
];

pub struct Session<P: Prompter> {
    ctx: SessionContext,
    registry: EditorRegistry,
    paths: SessionPaths,
    prompter: P,
}

impl<P: Prompter> Session<P> {
    pub fn new(ctx: SessionContext, paths: SessionPaths, prompter: P) -> Result<Self> {
        let registry =
            EditorRegistry::standard(&ctx.layout).context("failed to build editor registry")?;
        Ok(Self {
            ctx,
            registry,
            paths,
            prompter,
        })
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Full session: first run or resync, optional editing, pointer resolution.
    pub fn run(&mut self) -> Result<Outcome> {
        let span = self.ctx.span().clone();
        let _g = span.enter();
        let template = self.load_template()?;
        let existing = store::load_optional(&self.paths.instance)
            .with_context(|| format!("failed to load {}", self.paths.instance.display()))?;
        let customized = existing.is_some_and(|doc| doc != template);
        let next = if customized {
            let doc = self.resync()?;
            self.after_sync_menu(doc, &template)?
        } else {
            tracing::info!("no customized configuration, starting guided setup");
            self.prompter.say("No existing configuration found; starting from the template.");
            self.fresh_start(&template)?
        };
        match next {
            Step::Finish(doc) => self.finish(doc),
            Step::Stop(outcome) => Ok(outcome),
        }
    }

    /// Resync, then go straight to the navigator.
    pub fn edit(&mut self) -> Result<Outcome> {
        let span = self.ctx.span().clone();
        let _g = span.enter();
        let template = self.load_template()?;
        let mut doc = self.resync_or_seed(&template)?;
        match self.navigate(&mut doc, &template) {
            Nav::QuitAll => self.offer_save(&doc),
            _ => self.finish(doc),
        }
    }

    /// Delete the instance and reconfigure it from the template.
    pub fn reset(&mut self) -> Result<Outcome> {
        let span = self.ctx.span().clone();
        let _g = span.enter();
        let template = self.load_template()?;
        if !self.confirm_delete() {
            return Ok(Outcome::Aborted { saved: false });
        }
        match self.fresh_start(&template)? {
            Step::Finish(doc) => self.finish(doc),
            Step::Stop(outcome) => Ok(outcome),
        }
    }

    /// Choose a provider and model for one pointer.
    pub fn select(&mut self, pointer: &str) -> Result<Outcome> {
        let span = self.ctx.span().clone();
        let _g = span.enter();
        if !self.ctx.layout.is_pointer_field(pointer) {
            bail!(
                "'{pointer}' is not a model selection; expected one of: {}",
                self.ctx.layout.pointer_fields.join(", ")
            );
        }
        let template = self.load_template()?;
        let mut doc = self.resync_or_seed(&template)?;
        if self.assign_interactively(&mut doc, pointer)? == Nav::Continue {
            self.save(&doc)?;
        }
        Ok(self.outcome(&doc))
    }

    /// Prompt for placeholder credentials and endpoints, then for a primary
    /// model of every provider that has credentials but no model.
    ///
    /// `b` skips a field; `q` or closed input stop with `QuitAll`.
    pub fn guided(&mut self, doc: &mut Value) -> Nav {
        self.prompter
            .say("Guided setup: 'b' skips a field, 'q' stops and keeps what was entered.");
        let layout = self.ctx.layout.clone();
        for path in leaf_paths(doc) {
            if layout.is_under_pointer(&path) {
                continue;
            }
            let kind = self.registry.editor_for(&path);
            if !kind.is_required_text() {
                continue;
            }
            let Some(current) = lookup(doc, &path).map(scalar_text) else {
                continue;
            };
            if !is_placeholder(&current) {
                continue;
            }
            if self.enter(doc, &path, kind) == Nav::QuitAll {
                return Nav::QuitAll;
            }
        }

        let pending: Vec<String> = providers(doc, &layout)
            .iter()
            .filter(|p| p.has_credentials() && p.models().is_empty())
            .map(|p| p.name.to_string())
            .collect();
        for name in pending {
            let mut path = FieldPath::root();
            for key in [layout.providers_key.as_str(), name.as_str(), MODELS_KEY, "model_1"] {
                path.push(Segment::key(key));
            }
            if lookup(doc, &path).is_none() {
                continue;
            }
            self.prompter.say(&format!("Provider {name} has credentials but no model."));
            if self.enter(doc, &path, EditorKind::ModelSlot) == Nav::QuitAll {
                return Nav::QuitAll;
            }
        }
        Nav::Continue
    }

    /// Reselect every stale pointer, saving after each assignment.
    ///
    /// `b` skips a pointer; `q` or closed input stop the resolution.
    pub fn resolve_pointers(&mut self, doc: &mut Value) -> Result<()> {
        let fields = self.ctx.layout.pointer_fields.clone();
        for field in fields {
            let status = check_pointer(doc, &field, &self.ctx.layout);
            if !status.is_stale() {
                continue;
            }
            tracing::info!("{} is stale: {}", field, status);
            self.prompter.say(&format!("{field}: {status}"));
            if available_providers(doc, &self.ctx.layout).is_empty() {
                self.prompter.say(NO_PROVIDERS);
                return Ok(());
            }
            match self.assign_interactively(doc, &field)? {
                Nav::Continue => self.save(doc)?,
                Nav::QuitAll => {
                    tracing::info!("model selection stopped at {}", field);
                    return Ok(());
                }
                Nav::Back | Nav::Quit => {}
            }
        }
        Ok(())
    }

    /// `Continue` once assigned, `Back` when left untouched, `QuitAll` on
    /// `q` or closed input.
    fn assign_interactively(&mut self, doc: &mut Value, field: &str) -> Result<Nav> {
        let available = available_providers(doc, &self.ctx.layout);
        let answer = choose_pointer(&available, field, &mut self.prompter, &self.ctx);
        let (provider, model) = match answer {
            Prompted::Value(pair) => pair,
            Prompted::Quit | Prompted::Closed => return Ok(Nav::QuitAll),
            Prompted::Back | Prompted::Exhausted => return Ok(Nav::Back),
        };
        let Some(chosen) = available.get(&provider) else {
            return Ok(Nav::Back);
        };
        assign_pointer(doc, field, chosen, &model)
            .with_context(|| format!("failed to update {field}"))?;
        self.prompter.say(&format!("{field} now uses {provider} / {model}."));
        Ok(Nav::Continue)
    }

    fn enter(&mut self, doc: &mut Value, path: &FieldPath, kind: EditorKind) -> Nav {
        let lc = LeafContext {
            path,
            kind,
            default: None,
            siblings: &[],
        };
        match lookup_mut(doc, path) {
            Some(leaf) => match enter_value(leaf, &lc, &mut self.prompter, &self.ctx) {
                Nav::Quit | Nav::QuitAll => Nav::QuitAll,
                other => other,
            },
            None => Nav::Back,
        }
    }

    /// Resync an existing instance; seed a missing or empty one from the template.
    fn resync_or_seed(&mut self, template: &Value) -> Result<Value> {
        let existing = store::load_optional(&self.paths.instance)
            .with_context(|| format!("failed to load {}", self.paths.instance.display()))?;
        if existing.is_some() {
            return self.resync();
        }
        tracing::info!("no configuration yet, starting from the template");
        let doc = template.clone();
        self.save(&doc)?;
        Ok(doc)
    }

    fn resync(&mut self) -> Result<Value> {
        let report = sync(&self.paths.template, &self.paths.instance, &self.ctx)
            .context("configuration sync failed")?;
        for line in report.summary() {
            self.prompter.say(&line);
        }
        Ok(report.merged)
    }

    /// Keep / edit / delete menu after a resync.
    fn after_sync_menu(&mut self, mut doc: Value, template: &Value) -> Result<Step> {
        self.prompter.say("What would you like to do?");
        for (i, (_, label)) in AFTER_SYNC_MENU.iter().enumerate() {
            self.prompter.say(&format!("  {}. {label}", i + 1));
        }
        let choice = ask_until(
            &mut self.prompter,
            "Choice [1-3, q]: ",
            self.ctx.max_attempts,
            |a| parse_index(a, AFTER_SYNC_MENU.len()).map(|i| AFTER_SYNC_MENU[i].0),
        );
        match choice {
            Prompted::Value(AfterSync::Keep) | Prompted::Back | Prompted::Exhausted => {
                Ok(Step::Finish(doc))
            }
            Prompted::Value(AfterSync::Edit) => match self.navigate(&mut doc, template) {
                Nav::QuitAll => Ok(Step::Stop(self.offer_save(&doc)?)),
                _ => Ok(Step::Finish(doc)),
            },
            Prompted::Value(AfterSync::Delete) => {
                if self.confirm_delete() {
                    self.fresh_start(template)
                } else {
                    Ok(Step::Finish(doc))
                }
            }
            Prompted::Quit | Prompted::Closed => Ok(Step::Stop(Outcome::Aborted { saved: true })),
        }
    }

    /// Replace the instance with the template and run guided setup.
    fn fresh_start(&mut self, template: &Value) -> Result<Step> {
        let mut doc = template.clone();
        self.save(&doc)?;
        let nav = self.guided(&mut doc);
        self.save(&doc)?;
        if nav == Nav::QuitAll {
            self.prompter.say("Setup stopped; entered values were saved.");
            return Ok(Step::Stop(Outcome::Aborted { saved: true }));
        }
        Ok(Step::Finish(doc))
    }

    fn navigate(&mut self, doc: &mut Value, template: &Value) -> Nav {
        Navigator::new(&self.ctx, &self.registry, template, &mut self.prompter).run(doc)
    }

    fn confirm_delete(&mut self) -> bool {
        let prompt = format!(
            "Delete {} and reconfigure from the template? [y/n]: ",
            self.paths.instance.display()
        );
        let yes = confirm(&mut self.prompter, &prompt, self.ctx.max_attempts)
            == Prompted::Value(true);
        if yes {
            tracing::warn!("resetting {} to the template", self.paths.instance.display());
        }
        yes
    }

    fn offer_save(&mut self, doc: &Value) -> Result<Outcome> {
        let answer = confirm(
            &mut self.prompter,
            "Save the changes made so far? [y/n]: ",
            self.ctx.max_attempts,
        );
        if answer == Prompted::Value(true) {
            self.save(doc)?;
            return Ok(Outcome::Aborted { saved: true });
        }
        tracing::info!("edits discarded");
        Ok(Outcome::Aborted { saved: false })
    }

    fn finish(&mut self, mut doc: Value) -> Result<Outcome> {
        self.resolve_pointers(&mut doc)?;
        self.save(&doc)?;
        let base = match self.paths.instance.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_output_dirs(&doc, &base)?;
        let outcome = self.outcome(&doc);
        match &outcome {
            Outcome::Ready => self.prompter.say("Configuration is ready."),
            Outcome::Incomplete { stale } => self.prompter.say(&format!(
                "Configuration saved; still no model selected for: {}",
                stale.join(", ")
            )),
            Outcome::Aborted { .. } => {}
        }
        Ok(outcome)
    }

    fn outcome(&self, doc: &Value) -> Outcome {
        let stale: Vec<String> = self
            .ctx
            .layout
            .pointer_fields
            .iter()
            .filter(|f| check_pointer(doc, f, &self.ctx.layout).is_stale())
            .cloned()
            .collect();
        if stale.is_empty() {
            Outcome::Ready
        } else {
            Outcome::Incomplete { stale }
        }
    }

    fn load_template(&self) -> Result<Value> {
        store::load(&self.paths.template)
            .with_context(|| format!("failed to load template {}", self.paths.template.display()))
    }

    fn save(&self, doc: &Value) -> Result<()> {
        store::save(&self.paths.instance, doc)
            .with_context(|| format!("failed to save {}", self.paths.instance.display()))
    }
}

/// Provider usability and pointer status of the instance, without prompting.
pub fn check(paths: &SessionPaths, ctx: &SessionContext) -> Result<CheckReport> {
    let doc = store::load(&paths.instance)
        .with_context(|| format!("failed to load {}", paths.instance.display()))?;
    let providers = providers(&doc, &ctx.layout)
        .iter()
        .map(|p| (p.name.to_string(), p.is_usable()))
        .collect();
    let pointers = ctx
        .layout
        .pointer_fields
        .iter()
        .map(|f| (f.clone(), check_pointer(&doc, f, &ctx.layout)))
        .collect();
    Ok(CheckReport {
        providers,
        pointers,
    })
}

/// Write the bundled template to `path` unless a file is already there.
pub fn init_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(path, BUNDLED_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote template to {}", path.display());
    Ok(true)
}

/// Create `output.save_path` and every `output.directories` entry under
/// `base`. Returns the directories ensured, in order and without repeats.
pub fn ensure_output_dirs(doc: &Value, base: &Path) -> Result<Vec<PathBuf>> {
    let Some(output) = doc.get(OUTPUT_KEY) else {
        return Ok(Vec::new());
    };
    let mut names: Vec<&str> = Vec::new();
    if let Some(save_path) = output.get(SAVE_PATH_KEY).and_then(Value::as_str) {
        names.push(save_path);
    }
    if let Some(dirs) = output.get(DIRECTORIES_KEY).and_then(Value::as_sequence) {
        names.extend(dirs.iter().filter_map(Value::as_str));
    }
    let mut ensured: Vec<PathBuf> = Vec::new();
    for name in names {
        let name = name.trim();
        if is_placeholder(name) {
            continue;
        }
        let dir = base.join(expand_home(name));
        if ensured.contains(&dir) {
            continue;
        }
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        tracing::debug!("output directory {}", dir.display());
        ensured.push(dir);
    }
    Ok(ensured)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    fn template() -> Value {
        serde_yaml::from_str(BUNDLED_TEMPLATE).expect("template")
    }

    struct Fixture {
        dir: tempfile::TempDir,
        paths: SessionPaths,
    }

    impl Fixture {
        fn new(instance: Option<&Value>) -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            let paths = SessionPaths {
                template: dir.path().join("config.yaml.template"),
                instance: dir.path().join("config.yaml"),
            };
            fs::write(&paths.template, BUNDLED_TEMPLATE).expect("template");
            if let Some(doc) = instance {
                store::save(&paths.instance, doc).expect("instance");
            }
            Self { dir, paths }
        }

        fn session(&self, answers: &[&str]) -> Session<ScriptedPrompter> {
            Session::new(
                SessionContext::default(),
                self.paths.clone(),
                ScriptedPrompter::new(answers.iter().copied()),
            )
            .expect("session")
        }

        fn saved(&self) -> Value {
            store::load(&self.paths.instance).expect("saved instance")
        }
    }

    fn at<'d>(doc: &'d Value, path: &str) -> Option<&'d str> {
        lookup(doc, &FieldPath::parse(path)).and_then(Value::as_str)
    }

    #[test]
    fn first_run_is_guided_then_resolves_pointers() {
        let fx = Fixture::new(None);
        let mut s = fx.session(&[
            "me@lab.org", // pubmed.email
            "me",         // pubmed.username
            "sk-ds",      // api.deepseek.api_key
            "b",          // api.volces.api_key
            "b",          // api.openai.endpoint
            "b",          // api.openai.api_key
            "2",          // active_model -> deepseek-reasoner
            "1",          // mesh_query_model -> deepseek-chat
        ]);
        assert_eq!(s.run().expect("run"), Outcome::Ready);

        let doc = fx.saved();
        assert_eq!(at(&doc, "pubmed.email"), Some("me@lab.org"));
        assert_eq!(at(&doc, "active_model.provider"), Some("deepseek"));
        assert_eq!(at(&doc, "active_model.model"), Some("deepseek-reasoner"));
        assert_eq!(at(&doc, "active_model.api_key"), Some("sk-ds"));
        assert_eq!(at(&doc, "mesh_query_model.model"), Some("deepseek-chat"));
        assert!(fx.dir.path().join("results").is_dir());
        assert!(fx.dir.path().join("cache").is_dir());
        assert!(s.prompter().saw("Configuration is ready."));
    }

    #[test]
    fn guided_asks_primary_model_for_new_provider() {
        let fx = Fixture::new(None);
        let mut s = fx.session(&[
            "b",
            "b",
            "b",
            "sk-volces",
            "b",
            "b",
            "doubao-pro", // api.volces.models.model_1
            "1",
            "1",
        ]);
        assert_eq!(s.run().expect("run"), Outcome::Ready);
        let doc = fx.saved();
        assert_eq!(at(&doc, "api.volces.models.model_1"), Some("doubao-pro"));
        assert_eq!(at(&doc, "active_model.provider"), Some("volces"));
        assert!(s.prompter().saw("Provider volces has credentials but no model."));
    }

    #[test]
    fn quitting_guided_setup_keeps_entered_values() {
        let fx = Fixture::new(None);
        let mut s = fx.session(&["me@lab.org", "q"]);
        assert_eq!(s.run().expect("run"), Outcome::Aborted { saved: true });
        assert_eq!(at(&fx.saved(), "pubmed.email"), Some("me@lab.org"));
    }

    #[test]
    fn instance_equal_to_template_counts_as_first_run() {
        let fx = Fixture::new(Some(&template()));
        let mut s = fx.session(&[]);
        assert_eq!(s.run().expect("run"), Outcome::Aborted { saved: true });
        assert!(s.prompter().saw("No existing configuration found"));
    }

    #[test]
    fn resync_reports_drift_and_keeps_customizations() {
        let mut instance = template();
        instance["pubmed"]["email"] = Value::from("me@lab.org");
        let map = instance.as_mapping_mut().expect("mapping");
        map.remove("auto_update");
        map.insert(Value::from("legacy"), Value::from(true));
        let fx = Fixture::new(Some(&instance));

        let mut s = fx.session(&["1"]);
        let outcome = s.run().expect("run");
        assert_eq!(
            outcome,
            Outcome::Incomplete {
                stale: vec!["active_model".into(), "mesh_query_model".into()]
            }
        );
        let p = s.prompter();
        assert!(p.saw("Added from template: auto_update"));
        assert!(p.saw("Removed (no longer in template): legacy"));
        assert!(p.saw("Fields you previously customized:"));
        assert!(p.saw("email: me@lab.org"));
        assert!(p.saw("No provider has an API key"));

        let doc = fx.saved();
        assert_eq!(at(&doc, "pubmed.email"), Some("me@lab.org"));
        assert!(doc.get("legacy").is_none());
        assert!(doc.get("auto_update").is_some());
    }

    #[test]
    fn drifted_pointer_is_reselected() {
        let mut instance = template();
        instance["api"]["deepseek"]["api_key"] = Value::from("sk-new");
        for field in ["active_model", "mesh_query_model"] {
            instance[field]["provider"] = Value::from("deepseek");
            instance[field]["model"] = Value::from("deepseek-chat");
            instance[field]["endpoint"] = instance["api"]["deepseek"]["endpoint"].clone();
            instance[field]["api_key"] = Value::from("sk-old");
        }
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["1", "1", "2"]);
        assert_eq!(s.run().expect("run"), Outcome::Ready);
        assert!(s.prompter().saw("active_model: 'api_key' differs from provider 'deepseek'"));
        let doc = fx.saved();
        assert_eq!(at(&doc, "active_model.api_key"), Some("sk-new"));
        assert_eq!(at(&doc, "mesh_query_model.model"), Some("deepseek-reasoner"));
    }

    #[test]
    fn delete_and_reconfigure_restores_template() {
        let mut instance = template();
        instance["pubmed"]["username"] = Value::from("someone");
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["3", "y", "b", "b", "b", "b", "b", "b"]);
        let outcome = s.run().expect("run");
        assert!(matches!(outcome, Outcome::Incomplete { .. }));
        assert_eq!(fx.saved(), template());
    }

    #[test]
    fn quitting_the_editor_offers_to_save() {
        let mut instance = template();
        instance["pubmed"]["username"] = Value::from("someone");
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["2", "pubmed", "2", "1", "other", "q", "n"]);
        assert_eq!(s.run().expect("run"), Outcome::Aborted { saved: false });
        assert_eq!(at(&fx.saved(), "pubmed.username"), Some("someone"));

        let mut s = fx.session(&["2", "pubmed", "2", "1", "other", "q", "y"]);
        assert_eq!(s.run().expect("run"), Outcome::Aborted { saved: true });
        assert_eq!(at(&fx.saved(), "pubmed.username"), Some("other"));
    }

    #[test]
    fn select_assigns_one_pointer() {
        let mut instance = template();
        instance["api"]["deepseek"]["api_key"] = Value::from("sk-ds");
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["1"]);
        assert_eq!(
            s.select("active_model").expect("select"),
            Outcome::Incomplete {
                stale: vec!["mesh_query_model".into()]
            }
        );
        assert_eq!(at(&fx.saved(), "active_model.model"), Some("deepseek-chat"));
        assert!(s.select("api").is_err());

        let report = check(&fx.paths, &SessionContext::default()).expect("check");
        assert!(!report.is_ready());
        assert_eq!(report.providers[0], ("deepseek".to_string(), true));
        assert_eq!(report.pointers[0].1, PointerStatus::Consistent);
        assert_eq!(report.pointers[1].1, PointerStatus::Unassigned);
        assert!(report.lines().contains(&"  volces: not configured".to_string()));
    }

    #[test]
    fn edit_seeds_an_empty_instance_from_the_template() {
        let fx = Fixture::new(None);
        fs::write(&fx.paths.instance, "").expect("write");
        let mut s = fx.session(&["q", "n"]);
        assert_eq!(s.edit().expect("edit"), Outcome::Aborted { saved: false });
        assert_eq!(fx.saved(), template());
    }

    #[test]
    fn select_without_an_instance_starts_from_the_template() {
        let fx = Fixture::new(None);
        let mut s = fx.session(&[]);
        assert_eq!(
            s.select("mesh_query_model").expect("select"),
            Outcome::Incomplete {
                stale: vec!["active_model".into(), "mesh_query_model".into()]
            }
        );
        assert!(s.prompter().saw("No provider has an API key"));
        assert_eq!(fx.saved(), template());
    }

    #[test]
    fn quit_during_model_selection_skips_remaining_pointers() {
        let mut instance = template();
        instance["api"]["deepseek"]["api_key"] = Value::from("sk-ds");
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["1", "q", "1"]);
        assert_eq!(
            s.run().expect("run"),
            Outcome::Incomplete {
                stale: vec!["active_model".into(), "mesh_query_model".into()]
            }
        );
        let p = s.prompter();
        assert!(p.saw("Select the model for active_model:"));
        assert!(!p.saw("Select the model for mesh_query_model:"));
        assert_eq!(p.remaining(), 1);
    }

    #[test]
    fn declined_reset_changes_nothing() {
        let mut instance = template();
        instance["pubmed"]["username"] = Value::from("someone");
        let fx = Fixture::new(Some(&instance));
        let mut s = fx.session(&["n"]);
        assert_eq!(s.reset().expect("reset"), Outcome::Aborted { saved: false });
        assert_eq!(fx.saved(), instance);
    }

    #[test]
    fn malformed_instance_is_fatal_and_untouched() {
        let fx = Fixture::new(None);
        fs::write(&fx.paths.instance, "pubmed: [unclosed\n").expect("write");
        let mut s = fx.session(&["1"]);
        assert!(s.run().is_err());
        let raw = fs::read_to_string(&fx.paths.instance).expect("read");
        assert_eq!(raw, "pubmed: [unclosed\n");
    }

    #[test]
    fn init_writes_bundled_template_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.yaml.template");
        assert!(init_template(&path).expect("init"));
        assert!(!init_template(&path).expect("init again"));
        assert_eq!(fs::read_to_string(&path).expect("read"), BUNDLED_TEMPLATE);
    }

    #[test]
    fn output_dirs_are_created_once_each() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc: Value = serde_yaml::from_str(
            "output:\n  save_path: out\n  directories: [out, cache, your_dir]\n",
        )
        .expect("yaml");
        let made = ensure_output_dirs(&doc, dir.path()).expect("dirs");
        assert_eq!(made, vec![dir.path().join("out"), dir.path().join("cache")]);
        assert!(dir.path().join("cache").is_dir());
        assert!(
            ensure_output_dirs(&Value::Null, dir.path())
                .expect("none")
                .is_empty()
        );
    }
}
