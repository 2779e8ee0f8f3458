//! HTTP surface for SummarizeIt.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /api/summarize/text` – Summarize raw JSON text at a requested length tier.
//! - `POST /api/summarize/pdf` – Multipart PDF upload; text is extracted page by page
//!   before summarization. Rejected with 400 unless the part's content type is
//!   `application/pdf` or when no text can be extracted.
//! - `POST /api/summarize/docx` – Multipart DOCX upload; paragraphs are newline-joined
//!   before summarization. Rejected with 400 unless the filename ends in `.docx` or
//!   when no text can be extracted.
//! - `GET /api/health` – Liveness plus whether the model singleton is loaded.
//! - `GET /` – Plain liveness message.
//!
//! Validation failures map to 400 with a specific message; extraction, model-load, and
//! generation failures map to 500 carrying the underlying error text.

use crate::config::get_config;
use crate::extract::{self, ExtractionError};
use crate::summarize::{LengthTier, SummarizeError, SummarizerApi};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the HTTP router exposing the summarization API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummarizerApi + 'static,
{
    let api = Router::new()
        .route("/summarize/text", post(summarize_text::<S>))
        .route("/summarize/pdf", post(summarize_pdf::<S>))
        .route("/summarize/docx", post(summarize_docx::<S>))
        .route("/health", get(health::<S>));

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// CORS policy from configuration: a named allow-list with credentials when
/// `SUMMARIZEIT_ALLOWED_ORIGINS` is set, otherwise permissive.
fn cors_layer() -> CorsLayer {
    match &get_config().allowed_origins {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        }
        None => CorsLayer::permissive(),
    }
}

/// Request body for `POST /api/summarize/text`.
#[derive(Deserialize)]
struct SummaryRequest {
    /// Raw text to summarize.
    text: String,
    /// Requested length tier; unrecognized values behave like `long`.
    length: String,
}

/// Success response for all summarize endpoints.
#[derive(Serialize)]
struct SummaryResponse {
    /// Generated abstractive summary.
    summary: String,
}

/// Response body for `GET /api/health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model_loaded: bool,
}

/// Summarize raw text at the requested length tier.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummarizerApi,
{
    if request.text.trim().is_empty() {
        return Err(AppError::validation("No text provided."));
    }
    let tier = LengthTier::from_label(&request.length);
    let summary = service.summarize(&request.text, tier).await?;
    tracing::info!(
        tier = ?tier,
        input_chars = request.text.len(),
        summary_chars = summary.len(),
        "Text summarization completed"
    );
    Ok(Json(SummaryResponse { summary }))
}

/// Summarize an uploaded PDF document.
async fn summarize_pdf<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummarizerApi,
{
    let upload = read_upload(&mut multipart).await?;
    if upload.content_type.as_deref() != Some("application/pdf") {
        return Err(AppError::validation("File must be a PDF."));
    }

    let text = extract::pdf_text(&upload.bytes)?;
    let summary = service.summarize(&text, upload.tier).await?;
    tracing::info!(
        tier = ?upload.tier,
        upload_bytes = upload.bytes.len(),
        summary_chars = summary.len(),
        "PDF summarization completed"
    );
    Ok(Json(SummaryResponse { summary }))
}

/// Summarize an uploaded DOCX document.
async fn summarize_docx<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummarizerApi,
{
    let upload = read_upload(&mut multipart).await?;
    let is_docx = upload
        .filename
        .as_deref()
        .is_some_and(|name| name.to_lowercase().ends_with(".docx"));
    if !is_docx {
        return Err(AppError::validation("File must be a DOCX file."));
    }

    let text = extract::docx_text(&upload.bytes)?;
    let summary = service.summarize(&text, upload.tier).await?;
    tracing::info!(
        tier = ?upload.tier,
        upload_bytes = upload.bytes.len(),
        summary_chars = summary.len(),
        "DOCX summarization completed"
    );
    Ok(Json(SummaryResponse { summary }))
}

/// Report process liveness and whether the model singleton is loaded.
async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: SummarizerApi,
{
    Json(HealthResponse {
        status: "healthy",
        model_loaded: service.model_loaded(),
    })
}

/// Root liveness message.
async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "SummarizeIt API is running" }))
}

/// A parsed multipart upload: file bytes plus the requested length tier.
struct Upload {
    bytes: Bytes,
    filename: Option<String>,
    content_type: Option<String>,
    tier: LengthTier,
}

/// Collect the `file` and `length` parts of a multipart upload, in any order.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    let mut file: Option<(Bytes, Option<String>, Option<String>)> = None;
    let mut length: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation(err.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::validation(err.to_string()))?;
                file = Some((bytes, filename, content_type));
            }
            Some("length") => {
                length = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::validation(err.to_string()))?,
                );
            }
            _ => {}
        }
    }

    let (bytes, filename, content_type) =
        file.ok_or_else(|| AppError::validation("Missing file field."))?;
    let length = length.ok_or_else(|| AppError::validation("Missing length field."))?;
    Ok(Upload {
        bytes,
        filename,
        content_type,
        tier: LengthTier::from_label(&length),
    })
}

/// Error wrapper translating pipeline failures into HTTP responses.
enum AppError {
    /// Caller mistake: wrong file type, empty input, malformed form data.
    Validation(String),
    /// Extraction, model-load, or generation failure.
    Internal(String),
}

impl AppError {
    fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Validation(detail) => (StatusCode::BAD_REQUEST, detail),
            AppError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred: {detail}"),
            ),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(err: SummarizeError) -> Self {
        match err {
            SummarizeError::EmptyInput => Self::Validation(err.to_string()),
            SummarizeError::ModelLoad(_) | SummarizeError::Generation(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Empty(_) => Self::Validation(err.to_string()),
            ExtractionError::Pdf(_) | ExtractionError::Docx(_) => Self::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::create_router;
    use crate::config::{CONFIG, Config, DevicePreference, PrecisionPreference};
    use crate::extract::test_support::{docx_bytes, paragraphs};
    use crate::summarize::{LengthTier, SummarizeError, SummarizerApi};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;
    use std::sync::{Arc, Once};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "summarizeit-test-boundary";

    #[tokio::test]
    async fn text_route_returns_summary() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("A concise summary."));
        let app = create_router(service.clone());

        let payload = json!({ "text": "Some document body to compress.", "length": "medium" });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/summarize/text")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["summary"], "A concise summary.");

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "Some document body to compress.");
        assert_eq!(calls[0].tier, LengthTier::Medium);
    }

    #[tokio::test]
    async fn unrecognized_tier_falls_back_to_long() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("summary"));
        let app = create_router(service.clone());

        let payload = json!({ "text": "body", "length": "extra-crispy" });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/summarize/text")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(service.recorded_calls().await[0].tier, LengthTier::Long);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_rejected_before_generation() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let payload = json!({ "text": "   \n\t ", "length": "short" });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/summarize/text")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pdf_route_rejects_wrong_content_type_without_invoking_model() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request(
                "/api/summarize/pdf",
                Some(("report.pdf", "text/plain", b"%PDF-1.4 fake")),
                Some("short"),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["detail"], "File must be a PDF.");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pdf_route_reports_parse_failures_as_server_errors() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request(
                "/api/summarize/pdf",
                Some(("report.pdf", "application/pdf", b"not really pdf bytes")),
                Some("short"),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn docx_route_rejects_wrong_extension_without_invoking_model() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request(
                "/api/summarize/docx",
                Some(("notes.txt", "application/octet-stream", b"plain text")),
                Some("medium"),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["detail"], "File must be a DOCX file.");
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn docx_route_rejects_documents_without_text() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let empty_docx = docx_bytes(&paragraphs(&["   ", ""]));
        let response = app
            .oneshot(multipart_request(
                "/api/summarize/docx",
                Some(("empty.docx", "application/octet-stream", &empty_docx)),
                Some("long"),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(
            json["detail"]
                .as_str()
                .expect("detail string")
                .contains("Could not extract text")
        );
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn docx_route_summarizes_extracted_paragraphs() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("docx summary"));
        let app = create_router(service.clone());

        let docx = docx_bytes(&paragraphs(&["Alpha paragraph.", "Beta paragraph."]));
        let response = app
            .oneshot(multipart_request(
                "/api/summarize/docx",
                Some(("Report.DOCX", "application/octet-stream", &docx)),
                Some("short"),
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "Alpha paragraph.\nBeta paragraph.\n");
        assert_eq!(calls[0].tier, LengthTier::Short);
    }

    #[tokio::test]
    async fn missing_length_field_is_a_validation_error() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let response = app
            .oneshot(multipart_request(
                "/api/summarize/pdf",
                Some(("doc.pdf", "application/pdf", b"%PDF-1.4")),
                None,
            ))
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn generation_failures_surface_as_server_errors() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::failing("model exploded"));
        let app = create_router(service.clone());

        let payload = json!({ "text": "body", "length": "short" });
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/summarize/text")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert!(
            json["detail"]
                .as_str()
                .expect("detail string")
                .contains("model exploded")
        );
    }

    #[tokio::test]
    async fn health_reports_model_load_state() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], false);

        service.set_loaded(true);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["model_loaded"], true);
    }

    #[tokio::test]
    async fn root_reports_liveness_message() {
        ensure_test_config();
        let service = Arc::new(StubSummarizer::new("unused"));
        let app = create_router(service);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(json["message"], "SummarizeIt API is running");
    }

    fn multipart_request(
        uri: &str,
        file: Option<(&str, &str, &[u8])>,
        length: Option<&str>,
    ) -> Request<Body> {
        let mut body: Vec<u8> = Vec::new();
        if let Some((filename, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(length) = length {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"length\"\r\n\r\n{length}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    #[derive(Clone, Debug)]
    struct SummarizeCall {
        text: String,
        tier: LengthTier,
    }

    struct StubSummarizer {
        calls: Arc<Mutex<Vec<SummarizeCall>>>,
        summary: Result<String, String>,
        loaded: std::sync::atomic::AtomicBool,
    }

    impl StubSummarizer {
        fn new(summary: &str) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                summary: Ok(summary.to_string()),
                loaded: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                summary: Err(message.to_string()),
                loaded: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn set_loaded(&self, loaded: bool) {
            self.loaded
                .store(loaded, std::sync::atomic::Ordering::Relaxed);
        }

        async fn recorded_calls(&self) -> Vec<SummarizeCall> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl SummarizerApi for StubSummarizer {
        async fn summarize(&self, text: &str, tier: LengthTier) -> Result<String, SummarizeError> {
            let mut guard = self.calls.lock().await;
            guard.push(SummarizeCall {
                text: text.to_string(),
                tier,
            });
            self.summary
                .clone()
                .map_err(SummarizeError::Generation)
        }

        fn model_loaded(&self) -> bool {
            self.loaded.load(std::sync::atomic::Ordering::Relaxed)
        }
    }

    fn ensure_test_config() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = CONFIG.set(Config {
                model_id: "t5-small".into(),
                model_revision: "main".into(),
                device: DevicePreference::Cpu,
                precision: PrecisionPreference::Full,
                input_window: 1024,
                num_beams: 4,
                max_concurrent: 1,
                allowed_origins: None,
                server_port: None,
            });
        });
    }
}
