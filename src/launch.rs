use crate::{config::Config, engine::Engine, report::Preflight, util::ensure_dir};
use anyhow::Result;
use tracing::{info, warn};

/// Everything `run` does before the server starts. Nothing here aborts the
/// launch except an unusable working directory.
pub fn preflight(cfg: &Config, engine: &dyn Engine, install_deps: bool) -> Result<Preflight> {
    let mut out = Preflight::default();

    if install_deps {
        match engine.pip_install(&cfg.python.packages) {
            Ok(r) if r.ok => out.packages_installed = Some(true),
            Ok(r) => {
                warn!(
                    "package installation failed, continuing: {}",
                    r.error.unwrap_or_default()
                );
                out.packages_installed = Some(false);
            }
            Err(err) => {
                warn!("package installation failed, continuing: {err:#}");
                out.packages_installed = Some(false);
            }
        }
    }

    for dir in [cfg.upload_dir(), cfg.results_dir()] {
        if !dir.is_dir() {
            ensure_dir(&dir)?;
            info!("created {}", dir.display());
            out.created_dirs.push(dir);
        }
    }

    let base = cfg.base_dir();
    for name in &cfg.pipeline.required_files {
        if !base.join(name).exists() {
            warn!(
                "{name} is missing from {}; uploads will fail until it is provided",
                base.display()
            );
            out.missing_files.push(name.clone());
        }
    }

    Ok(out)
}

/// `run`: preflight, status lines, then `start` exactly once.
pub fn run_with<F>(
    cfg: &Config,
    engine: &dyn Engine,
    install_deps: bool,
    start: F,
) -> Result<Preflight>
where
    F: FnOnce(&Config) -> Result<()>,
{
    let pre = preflight(cfg, engine, install_deps)?;
    for line in status_lines(cfg) {
        println!("{line}");
    }
    start(cfg)?;
    Ok(pre)
}

pub fn status_lines(cfg: &Config) -> Vec<String> {
    vec![
        format!(
            "Starting questionnaire server on http://{}:{}",
            cfg.server.host, cfg.server.port
        ),
        format!("Uploads: {}", cfg.upload_dir().display()),
        format!("Results: {}", cfg.results_dir().display()),
        "Press Ctrl+C to stop".to_string(),
    ]
}
