use super::{error::ApiError, error::ApiResult, page::INDEX_HTML, AppState};
use crate::{
    history::{HistoryEntry, HistoryStore},
    naming::{
        has_pdf_extension, masked_download_name, secure_filename, unmask_download_name, JobFiles,
    },
    pipeline::Pipeline,
    util::{ensure_dir, job_stamp, now_rfc3339},
};
use anyhow::{anyhow, Context};
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::path::Component;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub json: String,
    pub excel: String,
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ---------------------------------------------------------------------------
// POST /upload
// ---------------------------------------------------------------------------

/// Saves the `pdf` field under `uploads/`, runs the pipeline and records the
/// job in the history.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let limit = state.cfg.server.max_upload_bytes;
    let mut received = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("pdf") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, limit))?;
        received = Some((name, data));
        break;
    }

    // A file input left empty still posts the field, with no file name.
    let Some((raw_name, data)) = received.filter(|(name, _)| !name.is_empty()) else {
        return Err(ApiError::BadRequest("Pas de fichier".into()));
    };

    let filename = secure_filename(&raw_name);
    if state.cfg.security.require_pdf_extension && !has_pdf_extension(&filename) {
        return Err(ApiError::BadRequest(format!(
            "Le fichier doit être un PDF: {filename}"
        )));
    }

    let _job = state.job_lock.lock().await;

    let files = JobFiles::unique(&state.cfg, &job_stamp(), &filename);
    ensure_dir(&state.cfg.upload_dir())?;
    tokio::fs::write(&files.pdf, &data)
        .await
        .with_context(|| format!("saving upload: {}", files.pdf.display()))?;
    info!(
        "received {} ({} bytes) -> {}",
        filename,
        data.len(),
        files.pdf.display()
    );

    let cfg = state.cfg.clone();
    let engine = state.engine.clone();
    let history = state.history.clone();
    let job = files.clone();
    let entry = tokio::task::spawn_blocking(move || -> anyhow::Result<HistoryEntry> {
        let report = Pipeline::new(&cfg, engine).run_job(&job)?;
        let entry = HistoryEntry {
            timestamp: report.stamp,
            filename: report.filename,
            json: report.fusion_json,
            excel: report.excel,
            date: now_rfc3339(),
            sha256: Some(report.pdf_sha256),
        };
        append_history(&history, entry.clone())?;
        Ok(entry)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("job task failed: {e}")))?
    .map_err(ApiError::Pipeline)?;

    Ok(Json(UploadResponse {
        success: true,
        json: entry.json,
        excel: masked_download_name(&entry.excel),
    }))
}

/// The body limit surfaces as a multipart error; keep its 413.
fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

fn append_history(history: &HistoryStore, entry: HistoryEntry) -> anyhow::Result<()> {
    history
        .append(entry)
        .with_context(|| format!("updating {}", history.path().display()))
}

// ---------------------------------------------------------------------------
// GET /download/{*filename}
// ---------------------------------------------------------------------------

/// Serves a result file as an attachment, resolving masked spreadsheet names.
pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let real = unmask_download_name(&filename);
    let rel = std::path::Path::new(&real);
    let flat = rel.components().all(|c| matches!(c, Component::Normal(_)));
    if rel.as_os_str().is_empty() || !flat {
        return Err(ApiError::NotFound);
    }

    let path = state.cfg.results_dir().join(rel);
    if !path.is_file() {
        return Err(ApiError::NotFound);
    }
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let download_name = rel
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(real.clone());
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&download_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{download_name}\""),
            ),
        ],
        bytes,
    ))
}

fn content_type(name: &str) -> &'static str {
    let ext = std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("xls") => "application/vnd.ms-excel",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// GET /history
// ---------------------------------------------------------------------------

pub async fn history(State(state): State<AppState>) -> ApiResult<Json<Vec<HistoryEntry>>> {
    let store = state.history.clone();
    let entries = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| ApiError::Internal(anyhow!("history task failed: {e}")))??;
    Ok(Json(entries))
}
