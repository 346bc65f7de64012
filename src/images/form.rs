use axum::extract::Multipart;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::services::UploadItem;
use crate::error::AppError;

/// A multipart body made of one JSON part and an optional `file` part.
#[derive(Debug, Default)]
pub struct JsonWithFile {
    pub json: Option<Bytes>,
    pub file: Option<UploadItem>,
}

impl JsonWithFile {
    pub async fn read(mut mp: Multipart, json_part: &str) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().map(|s| s.to_string());
            if name.as_deref() == Some(json_part) {
                form.json = Some(field.bytes().await.map_err(|e| {
                    AppError::Validation(format!("{json_part}: unreadable part: {e}"))
                })?);
            } else if name.as_deref() == Some("file") {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let file_name = field.file_name().map(|s| s.to_string());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Upload(format!("Could not read file: {e}")))?;
                // Browsers send an empty part when no file was picked.
                if !body.is_empty() {
                    form.file = Some(UploadItem {
                        body,
                        content_type,
                        file_name,
                    });
                }
            }
        }
        Ok(form)
    }

    /// Deserializes the JSON part, which must be present.
    pub fn parse<T: DeserializeOwned>(&self, json_part: &str) -> Result<T, AppError> {
        let raw = self
            .json
            .as_ref()
            .ok_or_else(|| AppError::Validation(format!("{json_part}: part is required")))?;
        serde_json::from_slice(raw)
            .map_err(|e| AppError::Validation(format!("{json_part}: invalid JSON: {e}")))
    }
}
