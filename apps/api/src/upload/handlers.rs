use axum::{
    extract::{Multipart, Path, State},
    Extension, Json,
};
use tracing::info;

use crate::auth::Caller;
use crate::errors::AppError;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::upload::{check_field_name, IncomingFile, StoredFileInfo};

/// POST /api/upload/:field
///
/// Stores the single file sent under form field `field`. Plain text parts are
/// ignored; a second file in the field or a file under any other field is a 400.
pub async fn handle_upload(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(field): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<StoredFileInfo>>, AppError> {
    check_field_name(&field)?;

    let mut incoming = None;
    while let Some(part) = multipart.next_field().await? {
        let name = part.name().unwrap_or_default().to_string();
        if name != field {
            if part.file_name().is_some() {
                return Err(AppError::Validation(format!("Unexpected file field '{name}'")));
            }
            continue;
        }
        if incoming.is_some() {
            return Err(AppError::Validation(format!(
                "Only one file may be uploaded in field '{field}'"
            )));
        }
        let original_name = part.file_name().unwrap_or("upload").to_string();
        let content_type = part
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = part.bytes().await?;
        incoming = Some(IncomingFile {
            field_name: field.clone(),
            original_name,
            content_type,
            data,
        });
    }

    let file = incoming.ok_or_else(|| AppError::Validation(format!("No file uploaded in field '{field}'")))?;
    let stored = state.uploads.store(file).await?;
    info!(
        "User {} uploaded {} ({} bytes) to field {}",
        caller.user_id, stored.original_name, stored.size, stored.field_name
    );

    Ok(Json(
        ApiResponse::ok(StoredFileInfo::from(&stored)).with_message("File uploaded successfully"),
    ))
}
