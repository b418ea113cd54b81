use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    client::BackendClient,
    error::ClientError,
    media::SelectedFile,
    pages::{self, VerifyPage, VerifyTab},
    results::{Links, ResultsView},
    upload::{ContextForm, UploadFlow, UploadState},
};

// ==========================================
// 1. 应用状态 (Shared State)
// ==========================================
// 所有请求共享；两个字段都是只读的，不需要锁。
pub struct AppState {
    pub backend: BackendClient,
    pub links: Links,
}

// ==========================================
// 2. 数据传输对象 (DTOs)
// ==========================================

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub id: Option<String>,
}

// 按 ID 校验的表单
#[derive(Deserialize)]
pub struct LookupForm {
    #[serde(default)]
    pub event_id: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ==========================================
// 3. 路由构建
// ==========================================
pub fn app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(upload_form))
        .route("/upload", post(submit_upload))
        .route("/results/{id}", get(show_results))
        .route("/results/{id}/report", get(download_report))
        .route("/verify", get(verify_form))
        .route("/verify/id", post(verify_by_id))
        .route("/verify/file", post(verify_by_file))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==========================================
// 4. 处理函数 (Handlers)
// ==========================================

fn bad_multipart(e: MultipartError) -> (StatusCode, String) {
    (e.status(), format!("Malformed upload: {}", e.body_text()))
}

/// 后端失败映射到本站状态码：404 原样，其余一律 502
fn upstream_status(e: &ClientError) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn upload_form() -> Html<String> {
    Html(pages::upload_page(&ContextForm::default(), None))
}

/// 接口：提交证据，成功后 303 跳转到结果页
async fn submit_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, (StatusCode, String)> {
    let mut flow = UploadFlow::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let mime = field.content_type().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            // 浏览器在未选文件时也会发一个空的 file 段
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if let Err(rejection) = flow.select_file(SelectedFile::new(file_name, mime, bytes.to_vec())) {
                warn!("🚫 文件类型不在白名单内，未发送: MIME={:?}", rejection.mime);
            }
        } else {
            let value = field.text().await.map_err(bad_multipart)?;
            flow.form_mut().set_field(&name, &value);
        }
    }

    let Some(request) = flow.begin_submit() else {
        let message = flow.message().unwrap_or("Please choose a file to upload.");
        let html = pages::upload_page(flow.form(), Some(message));
        return Ok((StatusCode::BAD_REQUEST, Html(html)).into_response());
    };

    let result = state.backend.upload(&request).await;
    let outcome = flow.finish(result).clone();
    match outcome {
        UploadState::Navigated(id) => Ok(Redirect::to(&state.links.results(&id)).into_response()),
        _ => {
            let message = flow.message().unwrap_or("An unexpected error occurred.");
            warn!("❌ 提交失败: {}", message);
            let html = pages::upload_page(flow.form(), Some(message));
            Ok((StatusCode::BAD_GATEWAY, Html(html)).into_response())
        }
    }
}

/// 接口：结果页
async fn show_results(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Html<String>) {
    info!("📄 加载结果: id={}", id);

    let result = state.backend.fetch_evidence(&id).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!("结果加载失败: id={}, err={}", id, e);
            upstream_status(e)
        }
    };
    let view = ResultsView::from_result(&id, result, &state.links);
    (status, Html(pages::results_page(&view)))
}

/// 接口：PDF 报告透传
async fn download_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let report = state
        .backend
        .fetch_report(&id)
        .await
        .map_err(|e| (upstream_status(&e), e.user_message("Failed to download report.")))?;

    let mut response = report.bytes.into_response();
    let headers = response.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&report.content_type) {
        headers.insert(header::CONTENT_TYPE, v);
    }
    if let Some(v) = report
        .content_disposition
        .as_deref()
        .and_then(|cd| HeaderValue::from_str(cd).ok())
    {
        headers.insert(header::CONTENT_DISPOSITION, v);
    }
    Ok(response)
}

async fn verify_form(Query(query): Query<VerifyQuery>) -> Html<String> {
    let page = VerifyPage {
        event_id: query.id.unwrap_or_default().trim().to_string(),
        ..Default::default()
    };
    Html(pages::verify_page(&page))
}

/// 接口：按事件 ID 校验
async fn verify_by_id(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LookupForm>,
) -> Html<String> {
    let id = form.event_id.trim();
    let mut page = VerifyPage {
        tab: VerifyTab::ById,
        event_id: id.to_string(),
        ..Default::default()
    };

    // 空 ID 不发请求
    if !id.is_empty() {
        info!("🔍 按 ID 校验: id={}", id);
        let result = state.backend.lookup(id).await.map_err(|e| {
            let fallback = e.to_string();
            e.user_message(&fallback)
        });
        page.id_result = Some(result);
    }
    Html(pages::verify_page(&page))
}

/// 接口：按文件校验
async fn verify_by_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Html<String>, (StatusCode, String)> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let mime = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(bad_multipart)?;
        if !(file_name.is_empty() && bytes.is_empty()) {
            file = Some(SelectedFile::new(file_name, mime, bytes.to_vec()));
        }
    }

    let mut page = VerifyPage {
        tab: VerifyTab::ByFile,
        ..Default::default()
    };
    if let Some(file) = file {
        let result = state.backend.verify_file(&file).await.map_err(|e| {
            let fallback = e.to_string();
            e.user_message(&fallback)
        });
        if let Ok(report) = &result {
            info!("校验结论: {} (文件={})", report.outcome.as_str(), file.file_name);
        }
        page.file_result = Some(result);
    }
    Ok(Html(pages::verify_page(&page)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::UNSUPPORTED_MESSAGE;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tower::ServiceExt;

    const BOUNDARY: &str = "trustchain-test-boundary";
    const REPORT_BYTES: &[u8] = b"%PDF-1.4\n%fake report\n";

    /// 假后端：记录被调用的次数
    async fn spawn_backend(hits: Arc<AtomicUsize>) -> String {
        let upload_hits = hits.clone();
        let evidence_hits = hits.clone();
        let router = Router::new()
            .route(
                "/api/upload",
                post(move |mut multipart: Multipart| {
                    let hits = upload_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        let mut names = Vec::new();
                        while let Some(field) = multipart.next_field().await.unwrap() {
                            names.push(field.name().unwrap().to_string());
                        }
                        assert!(names.contains(&"file".to_string()));
                        assert!(names.contains(&"platform_name".to_string()));
                        Json(json!({ "id": "evt-1" }))
                    }
                }),
            )
            .route(
                "/api/evidence/{id}",
                get(move |Path(id): Path<String>| {
                    let hits = evidence_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        if id == "evt-1" {
                            Json(json!({
                                "id": "evt-1",
                                "detection": { "confidence": 0.5, "explanation": "Boundary case" },
                                "liability_scores": {
                                    "user": { "percentage": 40, "raw_score": 0.6, "factors": { "prior_offences": { "points": 0.02, "max": 0.15 } } },
                                    "platform": { "percentage": 35, "raw_score": 0.5, "factors": {} },
                                    "architect": { "percentage": 25, "raw_score": 0.4, "factors": {} }
                                },
                                "blockchain": { "tx_id": "0xfeed", "timestamp": "2024-03-01T10:00:00+00:00" }
                            }))
                            .into_response()
                        } else {
                            (StatusCode::NOT_FOUND, Json(json!({ "detail": "Evidence not found" })))
                                .into_response()
                        }
                    }
                }),
            )
            .route(
                "/api/report/{id}/pdf",
                get(|Path(id): Path<String>| async move {
                    if id == "evt-1" {
                        (
                            [
                                (header::CONTENT_TYPE, "application/pdf"),
                                (header::CONTENT_DISPOSITION, "attachment; filename=\"evidence_evt-1.pdf\""),
                            ],
                            REPORT_BYTES,
                        )
                            .into_response()
                    } else {
                        (StatusCode::NOT_FOUND, Json(json!({ "detail": "Report not found" })))
                            .into_response()
                    }
                }),
            )
            .route(
                "/api/verify",
                post(|mut multipart: Multipart| async move {
                    let mut bytes = Vec::new();
                    while let Some(field) = multipart.next_field().await.unwrap() {
                        if field.name() == Some("file") {
                            bytes = field.bytes().await.unwrap().to_vec();
                        }
                    }
                    Json(json!({
                        "file_hash": crate::fingerprint::sha256_hex(&bytes).to_uppercase(),
                        "registered_on_chain": true,
                        "blockchain_timestamp": 1_709_287_200,
                        "case_id": "evt-1"
                    }))
                }),
            );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn test_app() -> (Router, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_backend(hits.clone()).await;
        let state = Arc::new(AppState {
            backend: BackendClient::new(&base, Duration::from_secs(5)).unwrap(),
            links: Links::new(
                "https://sepolia.etherscan.io/tx",
                reqwest::Url::parse("http://localhost:8080").unwrap(),
            ),
        });
        (app(state, 16 * 1024 * 1024), hits)
    }

    /// 手工拼 multipart body：(字段名, 可选的(文件名, MIME), 内容)
    fn multipart_body(parts: &[(&str, Option<(&str, &str)>, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, file, content) in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match file {
                Some((file_name, mime)) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, mime
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                ),
            }
            body.extend_from_slice(content.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn upload_form_renders() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("Submit for Analysis"));
    }

    #[tokio::test]
    async fn pdf_upload_is_rejected_before_any_backend_call() {
        let (app, hits) = test_app().await;
        let body = multipart_body(&[
            ("file", Some(("contract.pdf", "application/pdf")), "%PDF-1.7"),
            ("platform_name", None, "X"),
        ]);
        let resp = app.oneshot(multipart_request("/upload", body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let html = body_text(resp).await;
        assert!(html.contains(UNSUPPORTED_MESSAGE));
        assert!(html.contains(r#"<option value="X" selected>"#));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn upload_without_file_is_rejected() {
        let (app, hits) = test_app().await;
        let body = multipart_body(&[("file", Some(("", "application/octet-stream")), "")]);
        let resp = app.oneshot(multipart_request("/upload", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("Please choose a file to upload."));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accepted_upload_redirects_to_results() {
        let (app, hits) = test_app().await;
        let body = multipart_body(&[
            ("file", Some(("clip.mp4", "video/mp4")), "\0\0\0\x18ftypisom"),
            ("disclosure_stripped", None, "on"),
            ("platform_name", None, "WhatsApp"),
            ("takedown_requested", None, "on"),
            ("response_hours", None, "48"),
        ]);
        let resp = app.oneshot(multipart_request("/upload", body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], "/results/evt-1");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn results_page_renders_verdict_and_liability() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/results/evt-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("⚠ SYNTHETIC"));
        assert!(html.contains("50.0%"));
        assert!(html.contains("Prior Offences"));
        assert!(html.contains("0.02 / 0.15"));
        assert!(html.contains("https://sepolia.etherscan.io/tx/0xfeed"));
        assert!(html.contains("/results/evt-1/report"));
        assert!(html.contains("http://localhost:8080/verify?id=evt-1"));
    }

    #[tokio::test]
    async fn missing_results_show_backend_detail() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/results/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_text(resp).await.contains("Evidence not found"));
    }

    #[tokio::test]
    async fn verify_by_id_treats_404_as_not_found() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/verify/id")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("event_id=+nope+"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("No record found on blockchain"));
        assert!(html.contains(r#"value="nope""#));
    }

    #[tokio::test]
    async fn verify_by_id_anchor_alone_is_mismatch() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/verify/id")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("event_id=evt-1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let html = body_text(resp).await;
        assert!(html.contains("Hash mismatch — possible tampering detected"));
        assert!(!html.contains("Verified — unmodified"));
    }

    #[tokio::test]
    async fn report_is_passed_through() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/results/evt-1/report").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"evidence_evt-1.pdf\""
        );
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], REPORT_BYTES);
    }

    #[tokio::test]
    async fn missing_report_is_404_with_detail() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/results/nope/report").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(resp).await, "Report not found");
    }

    #[tokio::test]
    async fn verify_by_file_shows_banner_and_hashes() {
        let (app, _) = test_app().await;
        let content = "original footage";
        let body = multipart_body(&[("file", Some(("clip.mp4", "video/mp4")), content)]);
        let resp = app.oneshot(multipart_request("/verify/file", body)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(html.contains("Verified — unmodified since 2024-03-01 10:00:00 UTC"));
        let local = crate::fingerprint::sha256_hex(content.as_bytes());
        assert!(html.contains(&format!("Local SHA-256: <code>{}</code>", local)));
        assert!(html.contains("matches the local hash"));
        assert!(html.contains(r#"<a href="/results/evt-1">evt-1</a>"#));
    }

    #[tokio::test]
    async fn verify_by_file_without_file_sends_nothing() {
        let (app, hits) = test_app().await;
        let body = multipart_body(&[("file", Some(("", "application/octet-stream")), "")]);
        let resp = app.oneshot(multipart_request("/verify/file", body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let html = body_text(resp).await;
        assert!(!html.contains(r#"role="status""#));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn blank_id_sends_nothing() {
        let (app, hits) = test_app().await;
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/verify/id")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("event_id=+++"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn verify_query_prefills_id() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/verify?id=evt-1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(body_text(resp).await.contains(r#"value="evt-1""#));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (app, _) = test_app().await;
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
