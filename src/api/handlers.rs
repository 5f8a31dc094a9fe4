//! API request handlers

use axum::http::StatusCode;
use tracing::{error, info};

use super::models::HealthStatus;
use crate::analysis::{AnalysisResult, TermSheetAnalyzer};
use crate::config::ServerConfig;
use crate::extract::{extract, ExtractError, MIME_DOC, MIME_DOCX, MIME_PDF};

/// MIME types accepted at upload
pub const ALLOWED_MIME_TYPES: [&str; 3] = [MIME_PDF, MIME_DOCX, MIME_DOC];

/// Upload failures, each mapped to an HTTP status
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("No file uploaded.")]
    MissingFile,

    #[error("Unsupported file type. Please upload a PDF or .docx file.")]
    UnsupportedType,

    #[error("File size exceeds {0}MB limit.")]
    TooLarge(usize),

    #[error("Could not extract meaningful text from the document.")]
    NoMeaningfulText,

    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("Invalid upload: {0}")]
    Malformed(String),

    #[error("An unknown server error occurred.")]
    Internal,
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::MissingFile
            | UploadError::UnsupportedType
            | UploadError::NoMeaningfulText
            | UploadError::Malformed(_)
            | UploadError::Extract(ExtractError::UnsupportedFormat(_)) => StatusCode::BAD_REQUEST,
            UploadError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::Extract(ExtractError::ExtractionFailure(_)) | UploadError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Handle health check requests
pub fn health_check() -> HealthStatus {
    HealthStatus {
        status: "healthy".to_string(),
        service: "termsheet-analyzer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Check the declared type and size of an uploaded file
pub fn validate_upload(
    mime_type: Option<&str>,
    size: usize,
    server: &ServerConfig,
) -> Result<&'static str, UploadError> {
    if size > server.max_upload_bytes {
        return Err(UploadError::TooLarge(server.max_upload_bytes / (1024 * 1024)));
    }

    mime_type
        .and_then(|m| ALLOWED_MIME_TYPES.iter().copied().find(|allowed| *allowed == m))
        .ok_or(UploadError::UnsupportedType)
}

/// Extract, check and analyze an uploaded document
pub async fn analyze_upload(
    analyzer: &TermSheetAnalyzer,
    server: &ServerConfig,
    bytes: Vec<u8>,
    mime_type: &'static str,
) -> Result<AnalysisResult, UploadError> {
    // PDF parsing is CPU bound
    let text = tokio::task::spawn_blocking(move || extract(&bytes, mime_type))
        .await
        .map_err(|e| {
            error!("Extraction task failed: {}", e);
            UploadError::Internal
        })??;

    if text.trim().chars().count() < server.min_text_chars {
        return Err(UploadError::NoMeaningfulText);
    }

    info!("🔎 Analyzing uploaded {} ({} chars)", mime_type, text.len());
    Ok(analyzer.analyze(&text).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_validate_upload() {
        let server = Config::default().server;

        assert_eq!(validate_upload(Some(MIME_PDF), 1024, &server).unwrap(), MIME_PDF);
        assert_eq!(validate_upload(Some(MIME_DOC), 1024, &server).unwrap(), MIME_DOC);
        assert!(matches!(
            validate_upload(Some("image/png"), 1024, &server),
            Err(UploadError::UnsupportedType)
        ));
        assert!(matches!(
            validate_upload(None, 1024, &server),
            Err(UploadError::UnsupportedType)
        ));

        let too_large = validate_upload(Some(MIME_PDF), server.max_upload_bytes + 1, &server);
        match too_large {
            Err(e) => {
                assert_eq!(e.status(), StatusCode::PAYLOAD_TOO_LARGE);
                assert_eq!(e.to_string(), "File size exceeds 10MB limit.");
            }
            Ok(_) => panic!("oversized upload accepted"),
        }
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(UploadError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            UploadError::Extract(ExtractError::UnsupportedFormat("application/msword".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UploadError::Extract(ExtractError::ExtractionFailure("bad xref".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
