use anyhow::Context;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, storage::StorageClient};

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;
pub const PRESIGN_TTL_SECS: u64 = 30 * 60;

/// A file part taken from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: Option<String>,
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        _ => None,
    }
}

fn ext_from_file_name(name: &str) -> Option<&'static str> {
    let (_, ext) = name.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "bmp" => Some("bmp"),
        _ => None,
    }
}

fn mime_from_ext(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}

/// Checks size and type; returns the extension used in the object key.
pub fn validate(item: &UploadItem) -> Result<&'static str, AppError> {
    if item.body.is_empty() {
        return Err(AppError::Upload("Image file is empty".into()));
    }
    if item.body.len() > MAX_IMAGE_BYTES {
        return Err(AppError::Upload("Image exceeds the 2MB limit".into()));
    }
    ext_from_mime(&item.content_type)
        .or_else(|| item.file_name.as_deref().and_then(ext_from_file_name))
        .ok_or_else(|| {
            AppError::Upload("Only JPG, PNG, GIF or BMP images are accepted".into())
        })
}

/// Stores the image under `<prefix>/<owner>/<uuid>.<ext>` and returns the key.
pub async fn upload_image(
    storage: &dyn StorageClient,
    prefix: &str,
    owner: Uuid,
    item: UploadItem,
) -> Result<String, AppError> {
    let ext = validate(&item)?;
    let key = format!("{}/{}/{}.{}", prefix, owner, Uuid::new_v4(), ext);
    storage
        .put_object(&key, item.body, mime_from_ext(ext))
        .await
        .with_context(|| format!("upload image {}", key))?;
    info!(%key, "image uploaded");
    Ok(key)
}

/// Failures are logged; the object is left behind.
pub async fn delete_image(storage: &dyn StorageClient, key: &str) {
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = %e, %key, "image delete failed");
    }
}

/// Presigned GET URL, or `None` when there is no image or signing failed.
pub async fn image_url(storage: &dyn StorageClient, key: Option<&str>) -> Option<String> {
    let key = key?;
    match storage.presign_get(key, PRESIGN_TTL_SECS).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, %key, "presign failed");
            None
        }
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;
    use crate::storage::testing::FakeStorage;

    fn item(len: usize, ct: &str, name: Option<&str>) -> UploadItem {
        UploadItem {
            body: Bytes::from(vec![0u8; len]),
            content_type: ct.into(),
            file_name: name.map(Into::into),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/gif"), Some("gif"));
        assert_eq!(ext_from_mime("image/bmp"), Some("bmp"));
        assert_eq!(ext_from_mime("image/webp"), None);
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[test]
    fn file_name_is_a_fallback() {
        assert_eq!(
            validate(&item(10, "application/octet-stream", Some("Photo.JPEG"))).unwrap(),
            "jpg"
        );
        assert!(matches!(
            validate(&item(10, "application/octet-stream", Some("notes.txt"))),
            Err(AppError::Upload(_))
        ));
        assert!(matches!(
            validate(&item(10, "application/octet-stream", None)),
            Err(AppError::Upload(_))
        ));
    }

    #[test]
    fn size_limit() {
        assert!(validate(&item(MAX_IMAGE_BYTES, "image/png", None)).is_ok());
        assert!(matches!(
            validate(&item(MAX_IMAGE_BYTES + 1, "image/png", None)),
            Err(AppError::Upload(_))
        ));
        assert!(matches!(validate(&item(0, "image/png", None)), Err(AppError::Upload(_))));
    }

    #[tokio::test]
    async fn upload_uses_prefixed_key_and_presigns() {
        let storage = FakeStorage::default();
        let owner = Uuid::new_v4();
        let key = upload_image(&storage, "spaces", owner, item(16, "image/gif", None))
            .await
            .unwrap();

        assert!(key.starts_with(&format!("spaces/{owner}/")));
        assert!(key.ends_with(".gif"));
        assert_eq!(storage.keys(), vec![key.clone()]);
        assert_eq!(storage.content_type(&key).as_deref(), Some("image/gif"));

        let url = image_url(&storage, Some(&key)).await.unwrap();
        assert!(url.contains(&key));
        assert_eq!(image_url(&storage, None).await, None);

        delete_image(&storage, &key).await;
        assert!(storage.keys().is_empty());
    }

    #[tokio::test]
    async fn stored_content_type_follows_the_extension() {
        let storage = FakeStorage::default();
        let key = upload_image(&storage, "spaces", Uuid::new_v4(), item(16, "text/plain", Some("x.jpg")))
            .await
            .unwrap();
        assert!(key.ends_with(".jpg"));
        assert_eq!(storage.content_type(&key).as_deref(), Some("image/jpeg"));

        let key = upload_image(&storage, "spaces", Uuid::new_v4(), item(16, "image/jpg", None))
            .await
            .unwrap();
        assert_eq!(storage.content_type(&key).as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn rejected_upload_stores_nothing() {
        let storage = FakeStorage::default();
        let err = upload_image(&storage, "users", Uuid::new_v4(), item(16, "text/plain", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upload(_)));
        assert!(storage.keys().is_empty());
    }
}
