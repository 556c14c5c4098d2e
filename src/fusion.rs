//! Merges detection results with the questionnaire template.
//!
//! The detector only knows box indices and whether each box is checked; the
//! template carries the human titles. The merged document pairs the two and
//! adds a per-page `globale` score (mean of the scale scores).

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Detector label for a checked box.
pub const CHECKED: &str = "cochée";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub pages: Vec<TemplatePage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatePage {
    #[serde(default)]
    pub contenu: BTreeMap<String, TemplateQuestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateQuestion {
    #[serde(default)]
    pub titre: Option<String>,
    #[serde(default)]
    pub cases: Vec<TemplateBox>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateBox {
    #[serde(default)]
    pub titre: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub fichier_template: String,
    pub fichier_reponses: String,
    pub pages: Vec<DetectedPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPage {
    pub page: u32,
    #[serde(default)]
    pub score_echelle: Vec<f64>,
    #[serde(default)]
    pub questions: BTreeMap<String, DetectedQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erreur: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectedQuestion {
    #[serde(default)]
    pub reponses: Vec<DetectedBox>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedBox {
    pub index: usize,
    pub reponse: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merged {
    pub fichier_template: String,
    pub fichier_reponses: String,
    pub pages: Vec<MergedPage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedPage {
    pub page: u32,
    pub globale: Option<f64>,
    pub questions: BTreeMap<String, MergedQuestion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erreur: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedQuestion {
    pub titre: String,
    pub reponses: Vec<MergedAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedAnswer {
    pub titre: String,
    pub cochee: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeStats {
    pub pages: usize,
    pub questions: usize,
    pub checked: usize,
    pub globale_min: Option<f64>,
    pub globale_max: Option<f64>,
    pub globale_mean: Option<f64>,
}

pub fn merge(template: &Template, detection: &Detection) -> Result<Merged> {
    // Every answer page is matched against the first template page.
    let tpl = template
        .pages
        .first()
        .ok_or_else(|| anyhow!("template has no pages"))?;

    let pages = detection
        .pages
        .iter()
        .map(|page| merge_page(tpl, page))
        .collect();

    Ok(Merged {
        fichier_template: detection.fichier_template.clone(),
        fichier_reponses: detection.fichier_reponses.clone(),
        pages,
    })
}

fn merge_page(tpl: &TemplatePage, page: &DetectedPage) -> MergedPage {
    let mut questions = BTreeMap::new();
    for (qid, detected) in &page.questions {
        let Some(tq) = tpl.contenu.get(qid) else {
            continue;
        };
        let reponses = detected
            .reponses
            .iter()
            .map(|b| MergedAnswer {
                titre: box_title(tq, b.index),
                cochee: u8::from(b.reponse == CHECKED),
            })
            .collect();
        questions.insert(
            qid.clone(),
            MergedQuestion {
                titre: tq.titre.clone().unwrap_or_default(),
                reponses,
            },
        );
    }

    MergedPage {
        page: page.page,
        globale: mean(&page.score_echelle),
        questions,
        erreur: page.erreur.clone(),
    }
}

fn box_title(q: &TemplateQuestion, index: usize) -> String {
    q.cases
        .get(index)
        .and_then(|c| c.titre.clone())
        .unwrap_or_else(|| format!("Option {}", index + 1))
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

impl Merged {
    pub fn stats(&self) -> MergeStats {
        let questions = self.pages.iter().map(|p| p.questions.len()).sum();
        let checked = self
            .pages
            .iter()
            .flat_map(|p| p.questions.values())
            .flat_map(|q| q.reponses.iter())
            .filter(|r| r.cochee == 1)
            .count();
        let scores: Vec<f64> = self.pages.iter().filter_map(|p| p.globale).collect();
        MergeStats {
            pages: self.pages.len(),
            questions,
            checked,
            globale_min: scores.iter().copied().reduce(f64::min),
            globale_max: scores.iter().copied().reduce(f64::max),
            globale_mean: mean(&scores),
        }
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing JSON: {}", path.display()))
}

/// Reads both inputs, merges them and writes the pretty-printed result.
pub fn merge_files(template: &Path, results: &Path, out: &Path) -> Result<Merged> {
    let tpl: Template = read_json(template)?;
    let detection: Detection = read_json(results)?;
    let merged = merge(&tpl, &detection)?;
    std::fs::write(out, serde_json::to_string_pretty(&merged)?)
        .with_context(|| format!("writing {}", out.display()))?;
    Ok(merged)
}
