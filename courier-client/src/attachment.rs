//! Loading attachments from disk.

use std::path::Path;

use courier_core::Attachment;

use crate::error::ClientError;

/// Read a file into an [`Attachment`], guessing its content type from the
/// extension.
pub async fn load_attachment(path: &Path) -> Result<Attachment, ClientError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ClientError::Attachment {
            path: path.to_path_buf(),
            source: e,
        })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Ok(Attachment::new(file_name, content_type, bytes))
}
