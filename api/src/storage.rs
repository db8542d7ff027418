//! Image uploads: validation, resize-before-upload and the object store
//! holding the results.

use std::sync::Arc;

use axum::{extract::Multipart, http::StatusCode};
use image::{DynamicImage, codecs::jpeg::JpegEncoder};
use object_store::{ObjectStore, PutPayload, local::LocalFileSystem, memory::InMemory, path::Path};
use uuid::Uuid;

use crate::{
    config::StorageConfig,
    error::{ApiRequestError, AppError},
};

pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5 MB in bytes
pub const IMAGE_FILE_FIELD: &str = "image";
const JPEG_QUALITY: u8 = 85;
const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageKind {
    Thumbnail,
    Avatar,
}

impl ImageKind {
    /// Longest side allowed after resizing
    pub fn max_dimension(&self) -> u32 {
        match self {
            ImageKind::Thumbnail => 1200,
            ImageKind::Avatar => 256,
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            ImageKind::Thumbnail => "thumbnails",
            ImageKind::Avatar => "avatars",
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    #[error("Missing `image` file field")]
    MissingFile,

    #[error("Image too large (max {0} bytes)")]
    TooLarge(usize),

    #[error("Could not infer the file type")]
    UnknownType,

    #[error("Unsupported file type `{0}`, expected a JPEG, PNG, WebP or GIF image")]
    UnsupportedType(String),

    #[error("Could not decode the image")]
    Decode,
}

impl ApiRequestError for ImageError {
    fn status_code(&self) -> StatusCode {
        match self {
            ImageError::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Checks the magic bytes, the file extension or the declared content type
/// of the upload are not trusted.
pub fn validate_image(bytes: &[u8]) -> Result<&'static str, ImageError> {
    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ImageError::TooLarge(MAX_IMAGE_SIZE));
    }

    match infer::get(bytes) {
        Some(file_type) if ACCEPTED_MIME_TYPES.contains(&file_type.mime_type()) => {
            Ok(file_type.mime_type())
        }
        Some(file_type) => {
            tracing::info!(mime_type = file_type.mime_type(), "Rejected upload");
            Err(ImageError::UnsupportedType(file_type.mime_type().to_string()))
        }
        None => Err(ImageError::UnknownType),
    }
}

/// Shrinks the image so that neither side exceeds `max_dimension`, keeping
/// the aspect ratio, and re-encodes it as JPEG.
pub fn resize_image(bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>, ImageError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        tracing::info!(error = %e, "Could not decode uploaded image");
        ImageError::Decode
    })?;

    let img = if img.width() > max_dimension || img.height() > max_dimension {
        img.thumbnail(max_dimension, max_dimension)
    } else {
        img
    };

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(|e| {
            tracing::error!(error = %e, "Could not encode image");
            ImageError::Decode
        })?;

    Ok(out)
}

/// Pulls the `image` field out of a multipart body, enforcing the size limit
/// while streaming.
pub async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.body_text(), StatusCode::BAD_REQUEST))?
    {
        if field.name() != Some(IMAGE_FILE_FIELD) {
            continue;
        }

        let mut buffer = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| (e.body_text(), StatusCode::BAD_REQUEST))?
        {
            if buffer.len() + chunk.len() > MAX_IMAGE_SIZE {
                return Err(ImageError::TooLarge(MAX_IMAGE_SIZE).into());
            }
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            return Err(ImageError::MissingFile.into());
        }

        return Ok(buffer);
    }

    Err(ImageError::MissingFile.into())
}

#[derive(Clone, Debug)]
pub struct ImageStore {
    store: Arc<dyn ObjectStore>,
    public_url: String,
}

impl ImageStore {
    pub fn new(store: Arc<dyn ObjectStore>, public_url: &str) -> Self {
        ImageStore {
            store,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn in_memory() -> Self {
        ImageStore::new(Arc::new(InMemory::new()), "memory://images")
    }

    pub fn from_config(config: Option<&StorageConfig>) -> Result<Self, AppError> {
        match config {
            Some(config) => {
                std::fs::create_dir_all(&config.dir).map_err(|e| {
                    format!("Could not create storage directory `{}`: {e}", config.dir)
                })?;
                let store = LocalFileSystem::new_with_prefix(&config.dir)?;
                Ok(ImageStore::new(Arc::new(store), &config.public_url))
            }
            None => {
                tracing::warn!("No storage configured, uploaded images are kept in memory");
                Ok(ImageStore::in_memory())
            }
        }
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    /// Inverse of [`ImageStore::public_url`], `None` for urls that don't
    /// point into this store.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.public_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }

    /// Validates, resizes and stores the image. Returns its public url.
    pub async fn upload(&self, kind: ImageKind, bytes: Vec<u8>) -> Result<String, AppError> {
        validate_image(&bytes)?;

        let resized =
            tokio::task::spawn_blocking(move || resize_image(&bytes, kind.max_dimension()))
                .await
                .map_err(|e| format!("Image processing task failed: {e}"))??;

        let key = format!("{}/{}.jpg", kind.prefix(), Uuid::new_v4());
        self.store
            .put(&Path::from(key.as_str()), PutPayload::from(resized))
            .await?;

        tracing::debug!(%key, "Stored image");
        Ok(self.public_url(&key))
    }

    /// Best effort, a leftover object is not worth failing the request for.
    pub async fn delete_by_url(&self, url: &str) {
        let Some(key) = self.key_from_url(url) else {
            tracing::warn!(%url, "Image url does not belong to this store, not deleting");
            return;
        };

        if let Err(e) = self.store.delete(&Path::from(key.as_str())).await {
            tracing::error!(error = %e, %key, "Error while deleting image");
        }
    }

    /// Uploads the image, then hands its url to `record` to save it. The new
    /// object is deleted again when `record` fails.
    pub async fn upload_and_record<T, F, Fut>(
        &self,
        kind: ImageKind,
        bytes: Vec<u8>,
        record: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let url = self.upload(kind, bytes).await?;

        match record(url.clone()).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.delete_by_url(&url).await;
                Err(e)
            }
        }
    }
}
