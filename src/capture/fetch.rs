use crate::capture::to_data_url;
use crate::error::{ExportError, Result};
use async_trait::async_trait;
use image::ImageFormat;
use reqwest::header::{CONTENT_TYPE, REFERER};
use std::time::Duration;
use url::Url;

/// Body of a fetched resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedImage {
    pub fn new(content_type: Option<&str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    /// MIME type to embed the body with, if the body is an image.
    ///
    /// An `image/*` content type wins; otherwise the bytes are sniffed.
    pub fn image_mime(&self) -> Option<String> {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|essence| essence.trim().to_ascii_lowercase());
        if let Some(mime) = declared.filter(|m| m.starts_with("image/")) {
            return Some(mime);
        }
        image::guess_format(&self.bytes)
            .ok()
            .and_then(format_mime)
            .map(str::to_string)
    }

    /// Encode the body as a data URI; `None` when it is not an image
    pub fn to_data_url(&self) -> Option<String> {
        if self.bytes.is_empty() {
            return None;
        }
        self.image_mime().map(|mime| to_data_url(&mime, &self.bytes))
    }
}

fn format_mime(format: ImageFormat) -> Option<&'static str> {
    Some(match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Ico => "image/x-icon",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::Avif => "image/avif",
        _ => return None,
    })
}

/// Network access for images the page itself could not decode
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// GET `url` without credentials, sending `referrer` when given
    async fn fetch(&self, url: &Url, referrer: Option<&Url>) -> Result<FetchedImage>;
}

/// [`ImageFetcher`] over a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            // Referer is only ever set explicitly
            .referer(false)
            .build()
            .map_err(|e| ExportError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, referrer: Option<&Url>) -> Result<FetchedImage> {
        let failed = |reason: String| ExportError::FetchFailed {
            url: url.to_string(),
            reason,
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(failed(format!("unsupported scheme {}", url.scheme())));
        }

        let mut request = self.client.get(url.clone());
        if let Some(referrer) = referrer {
            request = request.header(REFERER, referrer.as_str());
        }

        let response = request.send().await.map_err(|e| failed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(failed(format!("status {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        Ok(FetchedImage {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}
