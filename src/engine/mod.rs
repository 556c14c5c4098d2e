pub mod python;
pub mod types;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

pub use types::{ArtifactStatus, Diag, PipReport, StepOutput};

/// The external tooling the pipeline delegates to: box detection and Excel export.
pub trait Engine: Send + Sync {
    fn doctor(&self) -> Result<Diag>;
    fn detect(&self, template: &Path, pdf: &Path, out_json: &Path) -> Result<StepOutput>;
    fn export_excel(&self, fusion_json: &Path, out_xlsx: &Path) -> Result<StepOutput>;
    fn pip_install(&self, packages: &[String]) -> Result<PipReport>;
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn doctor(&self) -> Result<Diag> {
        (**self).doctor()
    }

    fn detect(&self, template: &Path, pdf: &Path, out_json: &Path) -> Result<StepOutput> {
        (**self).detect(template, pdf, out_json)
    }

    fn export_excel(&self, fusion_json: &Path, out_xlsx: &Path) -> Result<StepOutput> {
        (**self).export_excel(fusion_json, out_xlsx)
    }

    fn pip_install(&self, packages: &[String]) -> Result<PipReport> {
        (**self).pip_install(packages)
    }
}

impl<E: Engine + ?Sized> Engine for &E {
    fn doctor(&self) -> Result<Diag> {
        (**self).doctor()
    }

    fn detect(&self, template: &Path, pdf: &Path, out_json: &Path) -> Result<StepOutput> {
        (**self).detect(template, pdf, out_json)
    }

    fn export_excel(&self, fusion_json: &Path, out_xlsx: &Path) -> Result<StepOutput> {
        (**self).export_excel(fusion_json, out_xlsx)
    }

    fn pip_install(&self, packages: &[String]) -> Result<PipReport> {
        (**self).pip_install(packages)
    }
}
