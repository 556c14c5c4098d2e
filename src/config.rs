use crate::util::expand_tilde;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub install: Install,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub python: Python,
    #[serde(default)]
    pub pipeline: PipelineCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// Application directory holding uploads, results, history and scripts.
    /// Always absolute: child processes run with it as their working
    /// directory, so relative script and data paths would resolve twice.
    pub fn base_dir(&self) -> PathBuf {
        let dir = expand_tilde(&self.paths.base_dir);
        std::path::absolute(&dir).unwrap_or(dir)
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.base_dir().join(&self.paths.upload_dir)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.base_dir().join(&self.paths.results_dir)
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir().join(&self.paths.history_file)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.base_dir().join(&self.paths.scripts_dir)
    }

    pub fn template_path(&self) -> PathBuf {
        self.base_dir().join(&self.pipeline.template_file)
    }

    pub fn install_dir(&self) -> PathBuf {
        expand_tilde(&self.paths.install_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paths {
    pub base_dir: String,
    pub install_dir: String,
    pub upload_dir: String,
    pub results_dir: String,
    pub history_file: String,
    pub scripts_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            base_dir: ".".into(),
            install_dir: "~/Sites/questionnaire".into(),
            upload_dir: "uploads".into(),
            results_dir: "results".into(),
            history_file: "history.json".into(),
            scripts_dir: ".".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Install {
    pub files: Vec<String>,
    pub copy_binary: bool,
    pub binary_name: String,
    pub write_htaccess: bool,
    pub url_prefix: String,
}
impl Default for Install {
    fn default() -> Self {
        Self {
            files: vec![
                "detect0.py".into(),
                "detection_cases.py".into(),
                "reperage.py".into(),
                "json2excel.py".into(),
                "template.json".into(),
                "questionnaire.toml".into(),
            ],
            copy_binary: true,
            binary_name: "questionnaire".into(),
            write_htaccess: true,
            url_prefix: "/questionnaire".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}
impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Python {
    pub python_exe: String,
    pub install_packages: bool,
    pub packages: Vec<String>,
    pub pip_args: Vec<String>,
    pub pip_timeout_seconds: u64,
}
impl Default for Python {
    fn default() -> Self {
        Self {
            python_exe: "python3".into(),
            install_packages: true,
            packages: vec![
                "opencv-python".into(),
                "pdf2image".into(),
                "openpyxl".into(),
            ],
            pip_args: vec!["--quiet".into()],
            pip_timeout_seconds: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineCfg {
    pub detect_script: String,
    pub export_script: String,
    pub template_file: String,
    pub required_files: Vec<String>,
    pub step_timeout_seconds: u64,
    pub keep_python_stderr: bool,
}
impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            detect_script: "detect0.py".into(),
            export_script: "json2excel.py".into(),
            template_file: "template.json".into(),
            required_files: vec!["detect0.py".into(), "template.json".into()],
            step_timeout_seconds: 600,
            keep_python_stderr: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub require_pdf_extension: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            require_pdf_extension: true,
        }
    }
}
