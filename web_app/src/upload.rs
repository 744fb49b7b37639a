use axum::extract::{multipart::MultipartError, Multipart};
use bytes::Bytes;
use thiserror::Error;

pub const FILE_FIELD: &str = "file";

#[derive(Error, Debug)]
#[error("Malformed upload: {0}")]
pub struct UploadError(#[from] MultipartError);

/// Reads the `file` field of a multipart form.
///
/// Browsers submit an empty part when no file was selected, so an empty
/// field is reported the same way as a missing one: `Ok(None)`.
pub async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Bytes>, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let data = field.bytes().await?;
            if data.is_empty() {
                return Ok(None);
            }
            return Ok(Some(data));
        }
    }
    Ok(None)
}
