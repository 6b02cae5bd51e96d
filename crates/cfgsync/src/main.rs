use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use env_flags::env_flags;
use once_cell::sync::OnceCell;

use cfgsync::SessionContext;
use cfgsync::config::{UserConfig, expand_home, load_user_config, resolve_home};
use cfgsync::merge::sync;
use cfgsync::prompt::TerminalPrompter;
use cfgsync::session::{Outcome, Session, SessionPaths, check, init_template};

const DEFAULT_TEMPLATE: &str = "config.yaml.template";
const DEFAULT_CONFIG: &str = "config.yaml";

/// Keep a YAML configuration in step with its template.
#[derive(Debug, Parser)]
#[command(name = "cfgsync", version, about)]
struct Cli {
    /// Template path (defaults to ./config.yaml.template)
    #[arg(long, env = "CFGSYNC_TEMPLATE", global = true)]
    template: Option<PathBuf>,

    /// Configuration path (defaults to ./config.yaml)
    #[arg(long, env = "CFGSYNC_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sync, review, edit and resolve model selections (default)
    Run,
    /// Reconcile the configuration with the template without prompting
    Sync,
    /// Sync, then browse and edit the configuration
    Edit,
    /// Report provider and model selection status; exits 1 when incomplete
    Check,
    /// Choose the provider and model for one model selection
    Select {
        /// Model selection field, e.g. active_model
        pointer: String,
    },
    /// Delete the configuration and set it up again from the template
    Reset,
    /// Write the bundled template when none exists
    Init,
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Json,
    Compact,
    Pretty,
    Full,
}

type BoxedLayer = Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync>;

fn fmt_layer<W>(writer: W, style: Style, ansi: bool) -> BoxedLayer
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    use tracing_subscriber::Layer as _;

    let base = tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_target(true)
        .with_ansi(ansi)
        .with_writer(writer);
    match style {
        Style::Json => base.json().boxed(),
        Style::Compact => base.compact().boxed(),
        Style::Pretty => base.pretty().boxed(),
        Style::Full => base.boxed(),
    }
}

fn init_tracing(home: &std::path::Path, user_cfg: Option<&UserConfig>) {
    env_flags! {
        /// Tracing filter, e.g. "info", "debug", or targets format.
        RUST_LOG: &str = "warn";
        /// Preferred filter env (alias). If set, overrides RUST_LOG.
        TRACING_FILTER: &str = "";
        /// Pretty formatting for logs (ignored if TRACING_JSON=true).
        TRACING_PRETTY: bool = false;
        /// Compact single-line formatting for logs (ignored if TRACING_JSON=true)
        TRACING_COMPACT: bool = true;
        /// JSON formatting for logs
        TRACING_JSON: bool = false;
        /// If true, also log to file under <CFGSYNC_HOME>/logs or LOG_DIR
        LOG_TO_FILE: bool = false;
        /// Optional explicit log directory. Defaults to <CFGSYNC_HOME>/logs
        LOG_DIR: &str = "";
    }

    use tracing_subscriber::{EnvFilter, prelude::*};

    let env_set = |k: &str| std::env::var_os(k).is_some();

    let mut rust_log = if !(*TRACING_FILTER).is_empty() {
        (*TRACING_FILTER).to_string()
    } else {
        (*RUST_LOG).to_string()
    };
    let mut tracing_json = *TRACING_JSON;
    let mut tracing_compact = *TRACING_COMPACT;
    let mut tracing_pretty = *TRACING_PRETTY;
    let mut log_to_file = *LOG_TO_FILE;
    let mut log_dir: Option<PathBuf> = if !(*LOG_DIR).is_empty() {
        Some(expand_home(*LOG_DIR))
    } else {
        None
    };

    if let Some(cfg) = user_cfg.and_then(|c| c.logging.as_ref()) {
        if !(env_set("TRACING_FILTER") || env_set("RUST_LOG"))
            && let Some(level) = cfg.level.as_ref()
        {
            rust_log = level.clone();
        }
        if !env_set("TRACING_JSON")
            && let Some(v) = cfg.json
        {
            tracing_json = v;
        }
        if !env_set("TRACING_COMPACT")
            && let Some(v) = cfg.compact
        {
            tracing_compact = v;
        }
        if !env_set("TRACING_PRETTY")
            && let Some(v) = cfg.pretty
        {
            tracing_pretty = v;
        }
        if !env_set("LOG_TO_FILE")
            && let Some(v) = cfg.to_file
        {
            log_to_file = v;
        }
        if !env_set("LOG_DIR")
            && let Some(dir) = cfg.dir.as_ref()
        {
            log_dir = Some(expand_home(dir));
        }
    }

    let filter = EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::new("warn"));
    let style = if tracing_json {
        Style::Json
    } else if tracing_compact {
        Style::Compact
    } else if tracing_pretty {
        Style::Pretty
    } else {
        Style::Full
    };

    // Logs go to stderr; stdout carries the prompts.
    let mut layers = vec![fmt_layer(std::io::stderr, style, true)];
    static FILE_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let mut dir_error = None;
    if log_to_file {
        let dir = log_dir.unwrap_or_else(|| home.join("logs"));
        match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, "cfgsync.log");
                let (nb, guard) = tracing_appender::non_blocking(appender);
                let _ = FILE_GUARD.set(guard);
                layers.push(fmt_layer(nb, style, false));
            }
            Err(e) => dir_error = Some((dir, e)),
        }
    }
    if let Err(e) = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
    {
        tracing::debug!("tracing already set: {:?}", e);
    }
    if let Some((dir, e)) = dir_error {
        tracing::warn!("failed to create log dir {}: {}", dir.display(), e);
    }
}

fn exit_for(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::Ready => ExitCode::SUCCESS,
        Outcome::Incomplete { .. } | Outcome::Aborted { .. } => ExitCode::FAILURE,
    }
}

fn run(cli: Cli, user_cfg: Option<UserConfig>) -> Result<ExitCode> {
    let session_cfg = user_cfg.and_then(|c| c.session).unwrap_or_default();
    let ctx: SessionContext = session_cfg.context();
    let from_settings = |v: &Option<String>, fallback: &str| {
        v.as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from(fallback))
    };
    let paths = SessionPaths {
        template: cli
            .template
            .unwrap_or_else(|| from_settings(&session_cfg.template, DEFAULT_TEMPLATE)),
        instance: cli
            .config
            .unwrap_or_else(|| from_settings(&session_cfg.config, DEFAULT_CONFIG)),
    };
    tracing::debug!(
        "template={} config={}",
        paths.template.display(),
        paths.instance.display()
    );

    let command = cli.command.unwrap_or(Command::Run);
    let session = |ctx: SessionContext, paths: SessionPaths| {
        Session::new(ctx, paths, TerminalPrompter::new())
    };
    match command {
        Command::Run => Ok(exit_for(&session(ctx, paths)?.run()?)),
        Command::Edit => Ok(exit_for(&session(ctx, paths)?.edit()?)),
        Command::Reset => Ok(exit_for(&session(ctx, paths)?.reset()?)),
        Command::Select { pointer } => Ok(exit_for(&session(ctx, paths)?.select(&pointer)?)),
        Command::Sync => {
            let report =
                sync(&paths.template, &paths.instance, &ctx).context("configuration sync failed")?;
            for line in report.summary() {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check => {
            let report = check(&paths, &ctx)?;
            for line in report.lines() {
                println!("{line}");
            }
            Ok(if report.is_ready() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Init => {
            if init_template(&paths.template)? {
                println!("Wrote {}", paths.template.display());
            } else {
                println!("{} already exists", paths.template.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    env_flags! {
        /// cfgsync home directory. Defaults to $HOME/.cfgsync
        CFGSYNC_HOME: &str = "";
    }
    let home = resolve_home(*CFGSYNC_HOME);
    let (user_cfg, cfg_error) = match load_user_config(&home) {
        Ok(cfg) => (cfg, None),
        Err(e) => (None, Some(e)),
    };
    init_tracing(&home, user_cfg.as_ref());
    if let Some(e) = cfg_error {
        tracing::warn!("ignoring {}: {:#}", home.join("config.toml").display(), e);
    }

    let cli = Cli::parse();
    match run(cli, user_cfg) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
