//! Upload gate: multipart file extraction, media-type filtering and storage.
//!
//! Serverless deployments have a read-only filesystem, so files are kept as
//! in-memory buffers there; everywhere else they are written under the
//! configured upload root, grouped by form field.

pub mod handlers;

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;

/// 10 MiB per file.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

const SERVERLESS_ENV_VARS: &[&str] = &[
    "VERCEL",
    "VERCEL_ENV",
    "NOW_REGION",
    "AWS_LAMBDA_FUNCTION_NAME",
    "LAMBDA_TASK_ROOT",
];

const CV_DOCUMENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadMode {
    Memory,
    Disk { root: PathBuf },
}

impl UploadMode {
    /// Memory when any serverless marker is set, disk under `root` otherwise.
    pub fn detect(lookup: impl Fn(&str) -> Option<String>, root: PathBuf) -> Self {
        let serverless = SERVERLESS_ENV_VARS
            .iter()
            .any(|&key| lookup(key).is_some_and(|v| !v.is_empty()));
        if serverless {
            UploadMode::Memory
        } else {
            UploadMode::Disk { root }
        }
    }
}

/// Field names end up in stored file names, so only `[A-Za-z0-9_-]` is accepted.
pub fn check_field_name(field: &str) -> Result<(), AppError> {
    let plain = !field.is_empty()
        && field.len() <= 64
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if plain {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid upload field name".to_string()))
    }
}

fn is_cv_field(field: &str) -> bool {
    matches!(field, "cv" | "resume")
}

/// Images are accepted on every field; PDF and Word documents only on CV fields.
pub fn check_file_type(field: &str, mime: &str) -> Result<(), AppError> {
    if mime.starts_with("image/") || (is_cv_field(field) && CV_DOCUMENT_TYPES.contains(&mime)) {
        return Ok(());
    }
    Err(AppError::Validation(
        "Invalid file type. Only images and PDF/DOC files are allowed.".to_string(),
    ))
}

/// Sub-directory of the upload root for a form field.
pub fn destination_dir(field: &str) -> &'static str {
    match field {
        "cv" | "resume" => "cvs",
        "logo" => "company-logos",
        "jobImage" | "image" => "job-images",
        _ => "profile-images",
    }
}

/// `<field>-<unix millis>-<random>.<ext>`, keeping the original extension.
pub fn unique_file_name(field: &str, original_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = Uuid::new_v4().as_u128() % 1_000_000_000;
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{field}-{millis}-{random}{ext}")
}

/// A file pulled out of a multipart body, not yet stored.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub enum StoredLocation {
    Memory(Bytes),
    Disk(PathBuf),
}

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: String,
    pub size: usize,
    pub location: StoredLocation,
}

/// Client-facing description of a stored file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileInfo {
    pub field_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
    pub storage: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl From<&StoredFile> for StoredFileInfo {
    fn from(file: &StoredFile) -> Self {
        let (storage, path) = match &file.location {
            StoredLocation::Memory(_) => ("memory", None),
            StoredLocation::Disk(path) => ("disk", Some(path.to_string_lossy().into_owned())),
        };
        Self {
            field_name: file.field_name.clone(),
            original_name: file.original_name.clone(),
            mime_type: file.content_type.clone(),
            size: file.size,
            storage,
            path,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadStorage {
    mode: UploadMode,
}

impl UploadStorage {
    pub fn new(mode: UploadMode) -> Self {
        info!("Upload storage mode: {:?}", mode);
        Self { mode }
    }

    /// Validates and stores one file.
    pub async fn store(&self, file: IncomingFile) -> Result<StoredFile, AppError> {
        check_field_name(&file.field_name)?;
        check_file_type(&file.field_name, &file.content_type)?;
        if file.data.len() > MAX_FILE_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "File too large. Maximum size is {} MB",
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }

        let size = file.data.len();
        let location = match &self.mode {
            UploadMode::Memory => StoredLocation::Memory(file.data),
            UploadMode::Disk { root } => {
                let dir = root.join(destination_dir(&file.field_name));
                tokio::fs::create_dir_all(&dir)
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to create {}: {e}", dir.display())))?;
                let path = dir.join(unique_file_name(&file.field_name, &file.original_name));
                if path.parent() != Some(dir.as_path()) {
                    return Err(AppError::Validation("Invalid upload field name".to_string()));
                }
                tokio::fs::write(&path, &file.data)
                    .await
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to write {}: {e}", path.display())))?;
                debug!("Stored upload at {}", path.display());
                StoredLocation::Disk(path)
            }
        };

        Ok(StoredFile {
            field_name: file.field_name,
            original_name: file.original_name,
            content_type: file.content_type,
            size,
            location,
        })
    }
}
