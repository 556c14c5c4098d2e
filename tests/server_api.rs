//! HTTP contract of the upload server, exercised through `tower::ServiceExt`.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use common::FakeEngine;
use http_body_util::BodyExt;
use questionnaire::config::Config;
use questionnaire::history::HistoryStore;
use questionnaire::server::{router, AppState};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "XQUESTIONNAIREX";

fn app(engine: FakeEngine) -> (Router, Config, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cfg = common::config_in(dir.path());
    let state = AppState::new(&cfg, Arc::new(engine));
    (router(state), cfg, dir)
}

fn multipart(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn index_serves_upload_page() {
    let (app, _cfg, _dir) = app(FakeEngine::default());
    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("Traiter le PDF"));
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _cfg, _dir) = app(FakeEngine::default());
    let json = body_json(get(app, "/health").await).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn upload_runs_pipeline_and_records_history() {
    let (app, cfg, _dir) = app(FakeEngine::default());

    let response = app
        .clone()
        .oneshot(multipart("pdf", "scan 1.pdf", b"%PDF-1.4 fake"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["success"], true);
    let fusion = json["json"].as_str().unwrap().to_string();
    let excel = json["excel"].as_str().unwrap().to_string();
    assert!(fusion.ends_with("_scan_1_fusion.json"));
    assert!(excel.ends_with("_scan_1.bin"));

    let history = HistoryStore::new(cfg.history_path()).load().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].filename, "scan_1.pdf");
    assert_eq!(history[0].json, fusion);
    assert!(history[0].excel.ends_with(".xlsx"));

    let listed = body_json(get(app.clone(), "/history").await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let download = get(app.clone(), &format!("/download/{excel}")).await;
    assert_eq!(download.status(), StatusCode::OK);
    let disposition = download.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains(".xlsx"));
    assert_eq!(body_bytes(download).await, b"PK-fake-xlsx");

    let merged = body_json(get(app, &format!("/download/{fusion}")).await).await;
    assert_eq!(merged["pages"][0]["globale"], 5.0);
}

#[tokio::test]
async fn upload_without_file_is_rejected() {
    let (app, _cfg, _dir) = app(FakeEngine::default());

    let response = app.clone().oneshot(multipart("other", "a.pdf", b"x")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Pas de fichier");

    let response = app.oneshot(multipart("pdf", "", b"")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_pdf_upload_is_rejected() {
    let engine = FakeEngine::default();
    let (app, _cfg, _dir) = app(engine);
    let response = app.oneshot(multipart("pdf", "notes.txt", b"hi")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = common::config_in(dir.path());
    cfg.server.max_upload_bytes = 1024;
    let engine = Arc::new(FakeEngine::default());
    let app = router(AppState::new(&cfg, engine.clone()));

    let response = app
        .oneshot(multipart("pdf", "big.pdf", &[b'x'; 4096]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("trop volumineux"));
    assert_eq!(engine.detect_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn same_name_uploads_keep_distinct_files() {
    let (app, cfg, _dir) = app(FakeEngine::default());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(multipart("pdf", "scan.pdf", b"%PDF-1.4 fake"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let entries = HistoryStore::new(cfg.history_path()).load().unwrap();
    assert_eq!(entries.len(), 2);
    assert_ne!(entries[0].excel, entries[1].excel);
    assert_ne!(entries[0].json, entries[1].json);
    let uploads = std::fs::read_dir(cfg.upload_dir()).unwrap().count();
    assert_eq!(uploads, 2);
}

#[tokio::test]
async fn pipeline_failure_is_500_with_message() {
    let (app, cfg, _dir) = app(FakeEngine {
        fail_detect: true,
        ..Default::default()
    });

    let response = app.oneshot(multipart("pdf", "scan.pdf", b"%PDF")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("detection failed"));
    assert!(HistoryStore::new(cfg.history_path()).load().unwrap().is_empty());
}

#[tokio::test]
async fn download_missing_or_escaping_is_404() {
    let (app, cfg, dir) = app(FakeEngine::default());
    std::fs::write(dir.path().join("secret.txt"), "s").unwrap();
    std::fs::create_dir_all(cfg.results_dir()).unwrap();

    let response = get(app.clone(), "/download/nope.json").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get(app, "/download/../secret.txt").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
