use crate::config::Config;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("static regex"));

const FALLBACK_NAME: &str = "upload.pdf";

/// Reduces a client-supplied file name to a flat ASCII name safe to join onto
/// the upload directory.
pub fn secure_filename(raw: &str) -> String {
    let ascii: String = raw.nfkd().filter(char::is_ascii).collect();
    let flat = ascii.replace(['/', '\\'], " ");
    let joined = flat.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '_');
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Every file one upload produces, all sharing the `<stamp>_` prefix.
#[derive(Debug, Clone)]
pub struct JobFiles {
    pub stamp: String,
    pub filename: String,
    pub pdf: PathBuf,
    pub detection_json: PathBuf,
    pub fusion_json: PathBuf,
    pub excel: PathBuf,
}

impl JobFiles {
    pub fn new(cfg: &Config, stamp: &str, filename: &str) -> Self {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let results = cfg.results_dir();
        let base = format!("{stamp}_{stem}");
        Self {
            stamp: stamp.to_string(),
            filename: filename.to_string(),
            pdf: cfg.upload_dir().join(format!("{stamp}_{filename}")),
            detection_json: results.join(format!("{base}_resultats.json")),
            fusion_json: results.join(format!("{base}_fusion.json")),
            excel: results.join(format!("{base}.xlsx")),
        }
    }

    /// Like [`JobFiles::new`], but suffixes the stamp (`_1`, `_2`, ...) until
    /// no file of the job already exists. Callers hold the job lock.
    pub fn unique(cfg: &Config, stamp: &str, filename: &str) -> Self {
        let mut files = Self::new(cfg, stamp, filename);
        let mut n = 0u32;
        while files.taken() {
            n += 1;
            files = Self::new(cfg, &format!("{stamp}_{n}"), filename);
        }
        files
    }

    fn taken(&self) -> bool {
        [&self.pdf, &self.detection_json, &self.fusion_json, &self.excel]
            .iter()
            .any(|p| p.exists())
    }

    pub fn fusion_name(&self) -> String {
        file_name(&self.fusion_json)
    }

    pub fn excel_name(&self) -> String {
        file_name(&self.excel)
    }
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Download links hide spreadsheet extensions behind `.bin` / `.dat`.
pub fn masked_download_name(name: &str) -> String {
    name.replace(".xlsx", ".bin")
}

pub fn unmask_download_name(name: &str) -> String {
    name.replace(".bin", ".xlsx").replace(".dat", ".xls")
}
