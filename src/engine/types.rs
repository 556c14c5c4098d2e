use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diag {
    pub python_exe: String,
    pub python_version: Option<String>,
    pub scripts_dir: String,
    pub artifacts: Vec<ArtifactStatus>,
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactStatus {
    pub name: String,
    pub present: bool,
}

/// Outcome of one external step, kept for the job report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepOutput {
    pub step: String,
    pub elapsed_ms: u64,
    pub stdout_tail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipReport {
    pub packages: Vec<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
