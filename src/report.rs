use crate::{engine::StepOutput, fusion::MergeStats};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub stamp: String,
    pub filename: String,
    pub pdf_sha256: String,
    pub fusion_json: String,
    pub excel: String,
    pub stats: MergeStats,
    pub steps: Vec<StepOutput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub copied: Vec<String>,
    pub missing: Vec<String>,
    pub binary: Option<PathBuf>,
    pub htaccess: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preflight {
    pub created_dirs: Vec<PathBuf>,
    pub missing_files: Vec<String>,
    pub packages_installed: Option<bool>,
}
