use crate::{config::Config, htaccess, report::InstallReport, util::ensure_dir};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Lays out `target`: the working folders, every configured file found in
/// `source`, the server binary and the Apache proxy rules. Missing files are
/// reported and skipped.
pub fn install(cfg: &Config, source: &Path, target: &Path) -> Result<InstallReport> {
    info!("installing into {}", target.display());
    ensure_dir(target)?;
    ensure_dir(&target.join(&cfg.paths.upload_dir))?;
    ensure_dir(&target.join(&cfg.paths.results_dir))?;

    let mut report = InstallReport {
        source: source.to_path_buf(),
        target: target.to_path_buf(),
        ..Default::default()
    };

    for name in &cfg.install.files {
        let from = source.join(name);
        if !from.is_file() {
            warn!("{name} not found in {}, skipped", source.display());
            report.missing.push(name.clone());
            continue;
        }
        let to = target.join(name);
        if same_file(&from, &to) {
            report.copied.push(name.clone());
            continue;
        }
        std::fs::copy(&from, &to)
            .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
        info!("copied {name}");
        report.copied.push(name.clone());
    }

    if cfg.install.copy_binary {
        let exe = std::env::current_exe().with_context(|| "locating current executable")?;
        let to = target.join(&cfg.install.binary_name);
        if !same_file(&exe, &to) {
            std::fs::copy(&exe, &to)
                .with_context(|| format!("copy {} -> {}", exe.display(), to.display()))?;
            info!("copied server binary to {}", to.display());
        }
        report.binary = Some(to);
    }

    if cfg.install.write_htaccess {
        let path = target.join(htaccess::FILE_NAME);
        std::fs::write(&path, htaccess::render(cfg))
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote {}", path.display());
        report.htaccess = Some(path);
    }

    Ok(report)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
