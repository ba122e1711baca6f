//! HTTP server for the feedcheck API.
//!
//! # API Endpoints
//!
//! | Method | Path                    | Description                              |
//! |--------|-------------------------|------------------------------------------|
//! | GET    | `/health`               | Health check                             |
//! | GET    | `/api/specs`            | Field specification table                |
//! | POST   | `/api/validate`         | Upload a CSV or JSON feed for validation |
//! | POST   | `/api/validate/records` | Validate records sent as JSON            |
//! | POST   | `/api/markup`           | schema.org Product markup for a record   |
//! | POST   | `/api/extract`          | Records from a product page              |
//! | GET    | `/api/logs`             | SSE stream for real-time logs            |

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, ExtractRequest, ExtractResponse, MarkupRequest, MarkupResponse, SpecsResponse,
    ValidateRecordsRequest, ValidationResponse,
};
use crate::config::Settings;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::markup::map_record;
use crate::parser::parse_json_records;
use crate::pipeline::{
    extract_from_html, load_registry, scrape_records, validate_bytes, validate_records, PipelineOptions,
    ValidationRun,
};

/// Shared handler state
struct AppState {
    options: PipelineOptions,
}

impl AppState {
    fn options_with(&self, validation: crate::validation::ValidationOptions) -> PipelineOptions {
        PipelineOptions {
            validation,
            ..self.options.clone()
        }
    }

    fn respond(&self, run: ValidationRun) -> ServerResult<ValidationResponse> {
        let registry = load_registry(self.options.spec_path.as_deref())?;
        Ok(ValidationResponse::from_run(run, &registry))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Csv(_))
            | ServerError::Pipeline(PipelineError::Json(_))
            | ServerError::Pipeline(PipelineError::UnsupportedInput(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::RecordNotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::Pipeline(PipelineError::Extract(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log_error(self.to_string());
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the application router.
pub fn router(settings: &Settings) -> Router {
    let state = Arc::new(AppState {
        options: PipelineOptions {
            spec_path: settings.spec_path.clone(),
            report_limit: settings.report_limit,
            ..PipelineOptions::default()
        },
    });

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/specs", get(list_specs))
        .route("/api/validate", post(validate_upload))
        .route("/api/validate/records", post(validate_json))
        .route("/api/markup", post(generate_markup))
        .route("/api/extract", post(extract_page))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    // Fail before binding if the specification table is unusable
    load_registry(settings.spec_path.as_deref())?;

    let app = router(&settings);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    println!("🚀 Feedcheck server running on http://localhost:{}", settings.port);
    println!("   POST /api/validate          - Upload CSV or JSON feed");
    println!("   POST /api/validate/records  - Validate JSON records");
    println!("   POST /api/markup            - Generate Product markup");
    println!("   POST /api/extract           - Extract records from a page");
    println!("   GET  /api/specs             - Field specifications");
    println!("   GET  /api/logs              - SSE log stream");
    println!("   GET  /health                - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "feedcheck",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "validate": "POST /api/validate",
            "records": "POST /api/validate/records",
            "markup": "POST /api/markup",
            "extract": "POST /api/extract",
            "specs": "GET /api/specs",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// Field specification table
async fn list_specs(State(state): State<Arc<AppState>>) -> ServerResult<Json<Value>> {
    let registry = load_registry(state.options.spec_path.as_deref())?;
    let body = serde_json::to_value(SpecsResponse::from(registry.as_ref()))
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(body))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Feed upload endpoint. The `file` part is read as JSON when its name ends
/// in `.json`, as CSV otherwise.
async fn validate_upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ServerResult<Json<ValidationResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
            file_data = Some(bytes.to_vec());
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let name = file_name.unwrap_or_else(|| "upload".to_string());
    log_info(format!("📄 New upload: {} ({} bytes)", name, bytes.len()));

    let run = if name.to_lowercase().ends_with(".json") {
        let content = String::from_utf8(bytes)
            .map_err(|_| ServerError::BadRequest("JSON feed is not valid UTF-8".to_string()))?;
        let records = parse_json_records(&content)?;
        validate_records(records, &state.options)?
    } else {
        validate_bytes(&bytes, &state.options)?
    };

    Ok(Json(state.respond(run)?))
}

/// Validate records posted as JSON.
async fn validate_json(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateRecordsRequest>,
) -> ServerResult<Json<ValidationResponse>> {
    let options = state.options_with(request.options);
    let run = validate_records(request.records, &options)?;
    Ok(Json(state.respond(run)?))
}

/// Markup for one record.
async fn generate_markup(Json(request): Json<MarkupRequest>) -> ServerResult<Json<MarkupResponse>> {
    let markup = map_record(&request.record);
    let response = MarkupResponse::new(markup).map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(response))
}

/// Extract records from a page URL or posted HTML, then validate them.
async fn extract_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExtractRequest>,
) -> ServerResult<Json<ExtractResponse>> {
    let records = match (request.url, request.html) {
        (_, Some(html)) => extract_from_html(&html, request.source_url.as_deref()),
        (Some(url), None) => scrape_records(&url).await?,
        (None, None) => return Err(ServerError::BadRequest("Provide either url or html".to_string())),
    };

    let run = validate_records(records.clone(), &state.options)?;
    let validation = state.respond(run)?;

    Ok(Json(ExtractResponse {
        job_id: validation.job_id.clone(),
        records,
        validation,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;

    fn status_of(err: ServerError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(status_of(ServerError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(PipelineError::UnsupportedInput("x".into()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(PipelineError::RecordNotFound("x".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(PipelineError::Extract(ExtractError::Status(404)).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(ServerError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_router_builds() {
        let _ = router(&Settings::default());
    }

    #[tokio::test]
    async fn test_extract_requires_a_source() {
        let state = Arc::new(AppState {
            options: PipelineOptions::default(),
        });
        let request = ExtractRequest {
            url: None,
            html: None,
            source_url: None,
        };

        let result = extract_page(State(state), Json(request)).await;
        assert!(matches!(result, Err(ServerError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_extract_from_posted_html() {
        let state = Arc::new(AppState {
            options: PipelineOptions::default(),
        });
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": "https://schema.org/", "@type": "Product", "sku": "SKU1", "name": "Shoe"}
        </script></head></html>"#;
        let request = ExtractRequest {
            url: None,
            html: Some(html.to_string()),
            source_url: None,
        };

        let Json(response) = extract_page(State(state), Json(request)).await.unwrap();
        assert_eq!(response.records.len(), 1);
        assert_eq!(response.records[0].text("id").as_deref(), Some("SKU1"));
        assert_eq!(response.validation.status, "error");
    }

    #[tokio::test]
    async fn test_validate_json_records() {
        let state = Arc::new(AppState {
            options: PipelineOptions::default(),
        });
        let request: ValidateRecordsRequest = serde_json::from_value(json!({
            "records": [crate::testing::sample_record().to_json()],
        }))
        .unwrap();

        let Json(response) = validate_json(State(state), Json(request)).await.unwrap();
        assert_eq!(response.status, "ready");
        assert_eq!(response.report.summary.total, 1);
    }
}
