//! Optional tool settings read from `<CFGSYNC_HOME>/config.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::context::{Layout, MAX_ATTEMPTS, SessionContext};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub session: Option<SessionCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionCfg {
    pub max_attempts: Option<usize>,
    pub providers_key: Option<String>,
    pub pointer_fields: Option<Vec<String>>,
    /// Template path used when neither flag nor env var is given.
    pub template: Option<String>,
    /// Instance path used when neither flag nor env var is given.
    pub config: Option<String>,
}

impl SessionCfg {
    /// Session context with these overrides applied to the defaults.
    pub fn context(&self) -> SessionContext {
        let mut layout = Layout::default();
        if let Some(key) = self.providers_key.as_ref().filter(|k| !k.is_empty()) {
            layout.providers_key = key.clone();
        }
        if let Some(fields) = self.pointer_fields.as_ref() {
            layout.pointer_fields = fields.clone();
        }
        SessionContext::new(self.max_attempts.unwrap_or(MAX_ATTEMPTS), layout)
    }
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// `CFGSYNC_HOME` when set, else `$HOME/.cfgsync`, else `./.cfgsync`.
pub fn resolve_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return expand_home(explicit);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".cfgsync"),
        Err(_) => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".cfgsync"),
    }
}
