use crate::{
    config::Config,
    engine::{python::PythonEngine, Engine},
    fusion,
    history::HistoryStore,
    install, launch, server,
    util::ensure_dir,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "questionnaire")]
#[command(about = "Install and launch harness for the questionnaire processing server")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./questionnaire.toml if present, else defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy the application files into the install directory and write .htaccess.
    Install {
        /// Directory holding the files to install (default: current directory).
        #[arg(long)]
        source: Option<PathBuf>,
        /// Install directory (default: paths.install_dir).
        #[arg(long)]
        target: Option<PathBuf>,
    },
    /// Install python packages, prepare folders, then start the server.
    Run {
        #[arg(long)]
        skip_deps: bool,
    },
    /// Start the server without any preparation.
    Serve {},
    Doctor {},
    /// Merge detection results with the template.
    Merge {
        #[arg(long)]
        template: PathBuf,
        #[arg(long)]
        results: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    History {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    let _guard = init_logging(&args, &cfg, resolve_log_path(&cfg).as_deref())?;

    match &args.cmd {
        Command::Install { source, target } => {
            install_cmd(&cfg, source.as_deref(), target.as_deref())
        }
        Command::Run { skip_deps } => run(&cfg, *skip_deps),
        Command::Serve {} => block_on_server(&cfg),
        Command::Doctor {} => doctor(&cfg),
        Command::Merge {
            template,
            results,
            out,
        } => merge(template, results, out),
        Command::History {} => history(&cfg),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("questionnaire.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // A subscriber set earlier in this process (repeated dispatch) is kept.
    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        tracing::debug!("logging already initialized: {e}");
    }

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(cfg.base_dir().join("questionnaire.log"))
}

fn install_cmd(cfg: &Config, source: Option<&Path>, target: Option<&Path>) -> Result<()> {
    let source = match source {
        Some(s) => s.to_path_buf(),
        None => std::env::current_dir().with_context(|| "current_dir")?,
    };
    let target = target
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.install_dir());

    let report = install::install(cfg, &source, &target)?;
    for name in &report.missing {
        println!("warning: {name} not found, not installed");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!("Installed into {}", target.display());
    Ok(())
}

fn run(cfg: &Config, skip_deps: bool) -> Result<()> {
    let engine = PythonEngine::new(cfg);
    let install_deps = cfg.python.install_packages && !skip_deps;
    launch::run_with(cfg, &engine, install_deps, block_on_server)?;
    Ok(())
}

fn block_on_server(cfg: &Config) -> Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")?;
    rt.block_on(server::serve(cfg))
}

fn doctor(cfg: &Config) -> Result<()> {
    let engine = PythonEngine::new(cfg);
    let diag = engine.doctor()?;
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn merge(template: &Path, results: &Path, out: &Path) -> Result<()> {
    let merged = fusion::merge_files(template, results, out)?;
    let stats = merged.stats();
    info!("merged {} -> {}", results.display(), out.display());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

fn history(cfg: &Config) -> Result<()> {
    let entries = HistoryStore::new(cfg.history_path()).load()?;
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
