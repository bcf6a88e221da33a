/// Shared data structures for the application state
///
/// These structs represent the data model that flows between the
/// persistence layer, the generation gateway and the UI layer. Field
/// names serialize in camelCase, which is the persisted library format.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Local, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::features::FeatureConfiguration;

/// Errors reading or writing image files on disk
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageFileError {
    #[error("Could not access file: {0}")]
    Io(String),
    #[error("Unsupported image format (use PNG, JPEG or WebP)")]
    UnsupportedFormat,
    #[error("Image data is corrupt: {0}")]
    Decode(String),
}

/// The portrait uploaded by the user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceImage {
    /// Base64-encoded image bytes
    pub base64: String,
    /// Media type, e.g. "image/jpeg"
    pub mime_type: String,
}

impl SourceImage {
    /// Capture an image from raw bytes, sniffing the media type from content
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageFileError> {
        let mime_type = match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => "image/png",
            Ok(ImageFormat::Jpeg) => "image/jpeg",
            Ok(ImageFormat::WebP) => "image/webp",
            _ => return Err(ImageFileError::UnsupportedFormat),
        };

        Ok(Self {
            base64: BASE64.encode(bytes),
            mime_type: mime_type.to_string(),
        })
    }

    /// Read and capture an image file without blocking the UI thread
    pub async fn from_path(path: PathBuf) -> Result<Self, ImageFileError> {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ImageFileError::Io(format!("{}: {}", path.display(), e)))?;

        Self::from_bytes(&bytes)
    }

    /// Decode the payload back into raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageFileError> {
        decode_payload(&self.base64)
    }
}

/// One result returned by the generation gateway
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    /// Unique within a session
    pub id: String,
    /// Base64-encoded image bytes
    pub base64: String,
    /// Media type, e.g. "image/png"
    pub mime_type: String,
    /// The exact instruction text that produced this image
    pub prompt_used: String,
}

impl GeneratedImage {
    /// Decode the payload back into raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageFileError> {
        decode_payload(&self.base64)
    }

    /// Rough token count of the prompt (four UTF-16 code units per token)
    pub fn estimated_tokens(&self) -> usize {
        (self.prompt_used.encode_utf16().count() as f64 / 4.0).round() as usize
    }

    /// Suggested file name when exporting this image
    pub fn file_name(&self) -> String {
        let extension = match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        };
        format!("headshot-{}.{}", self.id, extension)
    }
}

/// Write a generated image to disk
pub async fn export_image(image: GeneratedImage, path: PathBuf) -> Result<PathBuf, ImageFileError> {
    let bytes = image.to_bytes()?;

    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| ImageFileError::Io(format!("{}: {}", path.display(), e)))?;

    Ok(path)
}

fn decode_payload(base64: &str) -> Result<Vec<u8>, ImageFileError> {
    BASE64
        .decode(base64)
        .map_err(|e| ImageFileError::Decode(e.to_string()))
}

/// A completed project persisted in the library
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    /// Time-derived unique id (epoch milliseconds as a string)
    pub id: String,
    /// Display name derived from the creation time
    pub name: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    pub source_image: SourceImage,
    /// Configuration snapshot at save time
    pub features: FeatureConfiguration,
    /// Results in generation order
    pub generated_images: Vec<GeneratedImage>,
}

impl SavedProject {
    /// Build a project created at `timestamp` (epoch milliseconds)
    pub fn new(
        id: String,
        timestamp: i64,
        source_image: SourceImage,
        features: FeatureConfiguration,
        generated_images: Vec<GeneratedImage>,
    ) -> Self {
        Self {
            id,
            name: project_name(timestamp),
            timestamp,
            source_image,
            features,
            generated_images,
        }
    }

    /// The image shown for this project in the library grid
    pub fn cover(&self) -> Option<&GeneratedImage> {
        self.generated_images.first()
    }
}

/// Display name for a project created at `timestamp` (epoch milliseconds)
pub fn project_name(timestamp: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp) {
        Some(created) => format!(
            "Headshot {}",
            created.with_timezone(&Local).format("%b %-d, %Y %H:%M")
        ),
        None => format!("Headshot {}", timestamp),
    }
}
