use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::Db;
use crate::encode::decode_file;
use crate::error::{IntakeError, Result};
use crate::extract::{build_request, Extractor};
use crate::normalize::{field_table, line_item_table};
use crate::render::{self, ResultView};
use crate::types::{DocumentRecord, DocumentType, ExtractionResult, UploadedFile};

/// Shared state passed to all route handlers.
pub struct AppState {
    pub extractor: Arc<dyn Extractor>,
    pub db: Arc<Db>,
}

/// Room for the extraction result in a `/save` body, on top of the re-sent file.
const SAVE_RESULT_ALLOWANCE: usize = 4 * 1024 * 1024;

/// Body limit for `/save`. The form re-sends the upload base64-encoded inside
/// JSON and then percent-encoded, which can reach four times the file size.
pub fn save_body_limit(max_upload_bytes: usize) -> usize {
    max_upload_bytes
        .saturating_mul(4)
        .saturating_add(SAVE_RESULT_ALLOWANCE)
}

pub fn build_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route(
            "/process",
            post(process).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/save",
            post(save).layer(DefaultBodyLimit::max(save_body_limit(max_upload_bytes))),
        )
        .fallback(not_found)
        .with_state(state)
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = match &self {
            IntakeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            IntakeError::Upstream { .. } | IntakeError::Http(_) | IntakeError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }
        (status, self.to_string()).into_response()
    }
}

async fn index() -> Html<String> {
    Html(render::index_page())
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(render::not_found_page()))
}

async fn read_upload(mut multipart: Multipart) -> Result<(UploadedFile, DocumentType)> {
    let bad = |what: &str, e: axum::extract::multipart::MultipartError| {
        IntakeError::BadRequest(format!("failed to read {}: {}", what, e))
    };
    let mut file: Option<UploadedFile> = None;
    let mut doc_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| bad("multipart field", e))? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(String::from);
                let content = field.bytes().await.map_err(|e| bad("file", e))?.to_vec();
                file = Some(UploadedFile {
                    filename,
                    content,
                    content_type,
                });
            }
            "doc_type" => {
                doc_type = Some(field.text().await.map_err(|e| bad("doc_type", e))?);
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| IntakeError::BadRequest("No file provided".to_string()))?;
    let raw_type =
        doc_type.ok_or_else(|| IntakeError::BadRequest("No doc_type provided".to_string()))?;
    let doc_type = DocumentType::parse(&raw_type)
        .ok_or_else(|| IntakeError::BadRequest(format!("Unknown document type '{}'", raw_type)))?;
    Ok((file, doc_type))
}

/// POST /process - send the upload to the extractor and render the result card.
async fn process(State(state): State<Arc<AppState>>, multipart: Multipart) -> Result<Html<String>> {
    let (file, doc_type) = read_upload(multipart).await?;
    info!(
        "Processing {} as {} ({} bytes, {})",
        file.filename,
        doc_type,
        file.content.len(),
        file.content_type.as_deref().unwrap_or("unknown type")
    );

    let request = build_request(doc_type, &file);
    let extractor = state.extractor.clone();
    let (request, outcome) = tokio::task::spawn_blocking(move || {
        let outcome = extractor.extract(&request);
        (request, outcome)
    })
    .await
    .map_err(|e| IntakeError::Task(e.to_string()))?;

    let result = match outcome {
        Ok(result) => result,
        Err(IntakeError::Upstream { status, body }) => {
            warn!("Extraction of {} failed with status {}", file.filename, status);
            return Ok(Html(render::error_card(&body)));
        }
        Err(e) => return Err(e),
    };

    let fields = field_table(&result);
    let items = line_item_table(&result);
    let record = DocumentRecord {
        id: None,
        filename: file.filename.clone(),
        document_type: doc_type.as_str().to_string(),
        content_b64: request.file,
        result: result.to_json_string(),
    };
    let doc_json = serde_json::to_string(&record)?;

    Ok(Html(render::result_card(&ResultView {
        filename: &file.filename,
        doc_type,
        fields: &fields,
        line_items: &items,
        doc_json: &doc_json,
        uploaded_at: chrono::Local::now().naive_local(),
    })))
}

#[derive(Debug, Deserialize)]
struct SaveForm {
    doc: String,
}

/// POST /save - persist a confirmed result.
async fn save(State(state): State<Arc<AppState>>, Form(form): Form<SaveForm>) -> Result<Html<String>> {
    debug!("Save payload: {}", form.doc);
    let mut record: DocumentRecord = serde_json::from_str(&form.doc)
        .map_err(|e| IntakeError::BadRequest(format!("invalid doc payload: {}", e)))?;
    ExtractionResult::parse_str(&record.result)
        .map_err(|e| IntakeError::BadRequest(format!("doc has no extraction result: {}", e)))?;
    decode_file(&record.content_b64)?;
    // Ids belong to the store.
    if let Some(id) = record.id.take() {
        warn!("Ignoring client-supplied id {} for {}", id, record.filename);
    }

    let db = state.db.clone();
    let filename = record.filename.clone();
    let id = tokio::task::spawn_blocking(move || db.insert(&record))
        .await
        .map_err(|e| IntakeError::Task(e.to_string()))??;
    info!("Saved {} as document {}", filename, id);

    Ok(Html(render::saved_button()))
}
