#![allow(dead_code)]

use anyhow::{anyhow, Result};
use questionnaire::config::Config;
use questionnaire::engine::{Diag, Engine, PipReport, StepOutput};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const TEMPLATE: &str = r#"{
  "pages": [
    {
      "contenu": {
        "q1": { "titre": "Sommeil", "cases": [ { "titre": "Bon" }, { "titre": "Mauvais" } ] },
        "q2": { "titre": "Appétit", "cases": [ {}, { "titre": "Faible" } ] }
      }
    }
  ]
}"#;

pub const DETECTION: &str = r#"{
  "fichier_template": "template.json",
  "fichier_reponses": "uploads/scan.pdf",
  "pages": [
    {
      "page": 1,
      "score_echelle": [4.0, 6.0],
      "questions": {
        "q1": { "reponses": [ { "index": 0, "reponse": "cochée" }, { "index": 1, "reponse": "vide" } ] },
        "q2": { "reponses": [ { "index": 0, "reponse": "vide" }, { "index": 5, "reponse": "cochée" } ] },
        "q9": { "reponses": [ { "index": 0, "reponse": "cochée" } ] }
      }
    },
    { "page": 2, "erreur": "Échelle non détectée" }
  ]
}"#;

/// Stands in for the python scripts: writes canned outputs and counts calls.
#[derive(Default)]
pub struct FakeEngine {
    pub fail_detect: bool,
    pub fail_pip: bool,
    pub detect_calls: AtomicUsize,
    pub export_calls: AtomicUsize,
    pub pip_calls: Mutex<Vec<Vec<String>>>,
}

impl Engine for FakeEngine {
    fn doctor(&self) -> Result<Diag> {
        Ok(Diag {
            python_exe: "fake".into(),
            python_version: Some("Python 3.fake".into()),
            scripts_dir: ".".into(),
            artifacts: Vec::new(),
            ok: true,
        })
    }

    fn detect(&self, _template: &Path, _pdf: &Path, out_json: &Path) -> Result<StepOutput> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_detect {
            return Err(anyhow!("detect failed (exit status: 1):\nTraceback: boom"));
        }
        std::fs::write(out_json, DETECTION)?;
        Ok(StepOutput {
            step: "detect".into(),
            ..Default::default()
        })
    }

    fn export_excel(&self, _fusion_json: &Path, out_xlsx: &Path) -> Result<StepOutput> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(out_xlsx, b"PK-fake-xlsx")?;
        Ok(StepOutput {
            step: "export".into(),
            ..Default::default()
        })
    }

    fn pip_install(&self, packages: &[String]) -> Result<PipReport> {
        self.pip_calls.lock().unwrap().push(packages.to_vec());
        Ok(PipReport {
            packages: packages.to_vec(),
            ok: !self.fail_pip,
            error: self.fail_pip.then(|| "pip exited with status 1".to_string()),
        })
    }
}

/// Config rooted in `base`, with the template in place.
pub fn config_in(base: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.base_dir = base.display().to_string();
    std::fs::write(base.join("template.json"), TEMPLATE).unwrap();
    cfg
}
