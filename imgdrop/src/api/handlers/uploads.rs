use crate::AppState;
use crate::api::models::uploads::{UploadReceipt, UploadedFile};
use crate::errors::{Error, READ_FAILED, RETRIEVE_FAILED, Result, TOO_LARGE};
use crate::sniff::{detect_content_type, is_image};
use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use tokio::io::AsyncWriteExt;
use tracing::instrument;

/// Accept a single image upload and store it under the upload directory.
///
/// The file is taken from the part named by `uploads.field_name`, read fully into memory and
/// classified by its leading bytes. Only content sniffed as `image/*` is written to disk; the
/// client-declared part `Content-Type` is ignored. Responds with a plain-text receipt.
#[instrument(skip_all, fields(
    file_name = tracing::field::Empty,
    size = tracing::field::Empty,
    content_type = tracing::field::Empty,
))]
pub async fn upload_file(State(state): State<AppState>, multipart: std::result::Result<Multipart, MultipartRejection>) -> Result<String> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Request is not a multipart form");
        Error::bad_request(RETRIEVE_FAILED)
    })?;

    let upload = read_file_field(&mut multipart, &state.config.uploads.field_name).await?;

    let span = tracing::Span::current();
    span.record("file_name", upload.file_name.as_str());
    span.record("size", upload.size());

    // Refuse unsafe names before touching the filesystem
    let destination = state.storage.resolve(&upload.file_name)?;

    let content_type = detect_content_type(&upload.data);
    span.record("content_type", content_type);
    if !is_image(content_type) {
        return Err(Error::UnsupportedMediaType {
            content_type: content_type.to_string(),
        });
    }

    let receipt = UploadReceipt::new(&upload);

    let mut file = state.storage.open(&destination).await?;
    let write_context = || format!("write {}", destination.path().display());
    file.write_all(&upload.data).await.map_err(|e| Error::storage(write_context(), e))?;
    file.flush().await.map_err(|e| Error::storage(write_context(), e))?;

    tracing::info!(path = %destination.path().display(), "Upload stored");

    Ok(receipt.to_string())
}

/// Walk the form until the named file part is found and read it to completion.
///
/// Parts with other names are skipped. A part with the right name but no filename (or an empty
/// one) is a plain form value, not a file, and is skipped too; a later file part with the same
/// name can still match.
async fn read_file_field(multipart: &mut Multipart, field_name: &str) -> Result<UploadedFile> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| form_error(e, RETRIEVE_FAILED))?
            .ok_or_else(|| {
                tracing::debug!(field_name, "Upload field missing from form");
                Error::bad_request(RETRIEVE_FAILED)
            })?;

        if field.name() != Some(field_name) {
            tracing::trace!(name = ?field.name(), "Skipping unrelated form field");
            continue;
        }

        let Some(file_name) = field.file_name().filter(|name| !name.is_empty()).map(str::to_string) else {
            tracing::debug!(field_name, "Skipping upload field without a filename");
            continue;
        };
        let headers = field.headers().clone();
        let data = field.bytes().await.map_err(|e| form_error(e, READ_FAILED))?;

        return Ok(UploadedFile { file_name, headers, data });
    }
}

/// Map a multipart stream failure, keeping the body size limit distinct from malformed input
fn form_error(err: MultipartError, message: &str) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Error::PayloadTooLarge {
            message: TOO_LARGE.to_string(),
        };
    }
    tracing::debug!(error = %err, "Failed to read multipart form");
    Error::bad_request(message)
}
