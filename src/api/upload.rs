//! Document upload API handlers
//!
//! `POST /upload` returns a password-protected copy of the uploaded PDF.
//! `POST /metadata` reports what the service sees in an uploaded PDF.
//!
//! Both accept multipart form data with a `pdfFile` field; uploads are staged
//! in scratch storage under random names and removed before the response is
//! sent.

use crate::error::AppError;
use crate::services::ProtectorService;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Multipart field carrying the document
pub const FILE_FIELD: &str = "pdfFile";

/// Multipart field carrying the password
pub const PASSWORD_FIELD: &str = "password";

/// Download name used when the client sent no usable filename
const FALLBACK_FILENAME: &str = "document.pdf";

/// File received in a multipart upload
#[derive(Debug)]
pub struct UploadedFile {
    /// Filename as sent by the client, untrusted
    pub file_name: Option<String>,
    /// Raw file content
    pub data: Bytes,
}

/// Parsed upload form
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The `pdfFile` field, if present and non-empty
    pub file: Option<UploadedFile>,
    /// The `password` field, if present
    pub password: Option<String>,
}

/// Response for `POST /metadata`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    /// Filename as sent by the client
    pub file_name: String,
    /// Upload size in bytes
    pub size: u64,
    /// Upload size formatted in kilobytes, e.g. `12.34 KB`
    pub size_display: String,
    /// Number of pages
    pub page_count: usize,
    /// PDF header version
    pub version: String,
    /// Whether the upload is already encrypted
    pub encrypted: bool,
    /// When the service received the upload
    pub created_date: DateTime<Utc>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidMultipart(e.body_text())
    }
}

/// Read the upload form, keeping the file in memory
///
/// A request that is not multipart at all carries no file.
pub async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadForm, AppError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Request is not a multipart upload: {}", e);
        AppError::MissingFile
    })?;
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            FILE_FIELD => {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .filter(|s| !s.trim().is_empty());
                let data = field.bytes().await.map_err(multipart_error)?;

                // Browsers send an empty part when no file was chosen
                if data.is_empty() && file_name.is_none() {
                    continue;
                }
                form.file = Some(UploadedFile { file_name, data });
            }
            PASSWORD_FIELD => {
                form.password = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {
                warn!("Unknown multipart field: {}", field_name);
            }
        }
    }

    Ok(form)
}

/// Download name for the protected copy of `original`
///
/// Only the last path component of the client filename is kept, with quotes
/// and control characters removed.
pub fn download_name(original: Option<&str>) -> String {
    let base: String = original
        .and_then(|name| name.trim().rsplit(['/', '\\']).next())
        .map(|name| {
            name.chars()
                .filter(|c| !c.is_control() && *c != '"')
                .collect::<String>()
        })
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

    format!("protected_{}", base)
}

/// `Content-Disposition` value offering `name` as the download filename
///
/// Non-ASCII names get an ASCII `filename` fallback plus an RFC 5987
/// `filename*` parameter carrying the UTF-8 name.
pub fn content_disposition(name: &str) -> String {
    if name.is_ascii() {
        return format!("attachment; filename=\"{}\"", name);
    }

    let fallback: String = name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(name)
    )
}

fn size_display(size: u64) -> String {
    format!("{:.2} KB", size as f64 / 1024.0)
}

/// Time the staged upload was written, falling back to now
async fn received_at(path: &std::path::Path) -> DateTime<Utc> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta
            .created()
            .or_else(|_| meta.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now()),
        Err(e) => {
            debug!("Could not stat staged upload: {}", e);
            Utc::now()
        }
    }
}

async fn join_blocking<T>(task: tokio::task::JoinHandle<T>) -> Result<T, AppError> {
    task.await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Document task failed: {}", e)))
}

/// POST /upload - Return a password-protected copy of the uploaded PDF
pub async fn protect_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let form = read_upload_form(multipart).await?;
    let upload = form.file.ok_or(AppError::MissingFile)?;

    let submitted = form.password.filter(|p| !p.is_empty());
    let fallback = submitted.is_none();
    let password = state
        .effective_password(submitted)
        .ok_or(AppError::MissingPassword)?;
    if fallback {
        warn!("No password supplied, applying the fallback password");
    }

    let download = download_name(upload.file_name.as_deref());
    info!(
        file_name = %download,
        size = upload.data.len(),
        "Protecting uploaded document"
    );

    let original = state.scratch().store("upload-", &upload.data).await?;
    let protected = state.scratch().reserve("protected-")?;

    let input = original.path().to_path_buf();
    let output = protected.path().to_path_buf();
    let page_count = join_blocking(tokio::task::spawn_blocking(move || {
        ProtectorService::protect_file(&input, &output, &password)
    }))
    .await?
    .map_err(|e| {
        warn!("Failed to protect document: {}", e);
        AppError::from(e)
    })?;
    drop(original);

    let bytes = tokio::fs::read(protected.path()).await?;
    drop(protected);

    info!(page_count, size = bytes.len(), "Document protected");

    let disposition = content_disposition(&download);
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| AppError::Internal(e.into()))?,
    );

    Ok((headers, bytes).into_response())
}

/// POST /metadata - Describe the uploaded PDF
pub async fn document_metadata(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentInfo>, AppError> {
    let form = read_upload_form(multipart).await?;
    let upload = form.file.ok_or(AppError::MissingFile)?;
    let size = upload.data.len() as u64;

    let staged = state.scratch().store("inspect-", &upload.data).await?;
    let created_date = received_at(staged.path()).await;
    let input = staged.path().to_path_buf();
    let summary = join_blocking(tokio::task::spawn_blocking(move || {
        ProtectorService::inspect_file(&input)
    }))
    .await??;
    drop(staged);

    debug!(page_count = summary.page_count, "Document inspected");

    Ok(Json(DocumentInfo {
        file_name: upload.file_name.unwrap_or_default(),
        size,
        size_display: size_display(size),
        page_count: summary.page_count,
        version: summary.version,
        encrypted: summary.encrypted,
        created_date,
    }))
}
