use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::encode::encode_file;
use crate::error::{IntakeError, Result};
use crate::types::{DocumentType, ExtractionRequest, ExtractionResult, UploadedFile};

/// Something that turns an upload into an extraction result. Blocking.
pub trait Extractor: Send + Sync {
    fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult>;
}

pub fn build_request(doc_type: DocumentType, file: &UploadedFile) -> ExtractionRequest {
    ExtractionRequest {
        document_type_name: doc_type.as_str().to_string(),
        file_name: file.filename.clone(),
        file: encode_file(&file.content),
    }
}

/// Client for the Typless extract-data endpoint.
pub struct TyplessClient {
    api_url: String,
    api_key: String,
}

impl TyplessClient {
    pub fn new(config: &Config) -> Self {
        TyplessClient {
            api_url: config.typless_api_url.clone(),
            api_key: config.typless_api_key.clone(),
        }
    }
}

impl Extractor for TyplessClient {
    fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult> {
        // A single attempt with no deadline; the request thread waits for Typless.
        let client = Client::builder()
            .timeout(None::<std::time::Duration>)
            .build()?;

        info!(
            "Sending {} ({}) to Typless, {} base64 chars",
            request.file_name,
            request.document_type_name,
            request.file.len()
        );
        let response = client
            .post(&self.api_url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, format!("Token {}", self.api_key))
            .json(request)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            warn!("Typless returned {} for {}", status, request.file_name);
            return Err(IntakeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let raw: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| IntakeError::InvalidResponse(format!("Invalid JSON: {}", e)))?;
        let result = ExtractionResult::from_json(raw)?;
        debug!(
            "Typless extracted {} field(s), {} line item(s)",
            result.extracted_fields.len(),
            result.line_items.len()
        );
        Ok(result)
    }
}
