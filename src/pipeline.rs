use crate::{
    config::Config,
    engine::Engine,
    fusion,
    naming::JobFiles,
    report::JobReport,
    util::{ensure_dir, hash_file},
};
use anyhow::{anyhow, Context, Result};
use std::time::Instant;
use tracing::{debug, info};

/// detect (external) -> merge (native) -> export (external), for one uploaded PDF.
pub struct Pipeline<E: Engine> {
    cfg: Config,
    engine: E,
}

impl<E: Engine> Pipeline<E> {
    pub fn new(cfg: &Config, engine: E) -> Self {
        Self {
            cfg: cfg.clone(),
            engine,
        }
    }

    pub fn run_job(&self, files: &JobFiles) -> Result<JobReport> {
        let started = Instant::now();
        ensure_dir(&self.cfg.results_dir())?;

        let pdf_sha256 = hash_file(&files.pdf)
            .with_context(|| format!("hashing upload: {}", files.pdf.display()))?;
        info!(
            "job {} file={} sha256={}",
            files.stamp, files.filename, pdf_sha256
        );

        let template = self.cfg.template_path();
        let detect = self
            .engine
            .detect(&template, &files.pdf, &files.detection_json)
            .with_context(|| format!("detection failed for {}", files.filename))?;
        debug!(elapsed_ms = detect.elapsed_ms, "detect done");

        if !files.detection_json.exists() {
            return Err(anyhow!(
                "detection produced no output: {}",
                files.detection_json.display()
            ));
        }

        let merged = fusion::merge_files(&template, &files.detection_json, &files.fusion_json)
            .with_context(|| "merging detection results with template")?;
        let stats = merged.stats();
        info!(
            "merged pages={} questions={} checked={}",
            stats.pages, stats.questions, stats.checked
        );

        let export = self
            .engine
            .export_excel(&files.fusion_json, &files.excel)
            .with_context(|| format!("excel export failed for {}", files.filename))?;
        debug!(elapsed_ms = export.elapsed_ms, "export done");

        info!(
            "job {} done in {} ms",
            files.stamp,
            started.elapsed().as_millis()
        );

        Ok(JobReport {
            stamp: files.stamp.clone(),
            filename: files.filename.clone(),
            pdf_sha256,
            fusion_json: files.fusion_name(),
            excel: files.excel_name(),
            stats,
            steps: vec![detect, export],
        })
    }
}
