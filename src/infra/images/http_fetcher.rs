use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use crate::core::images::{FetchedImage, ImageError, ImageFetcher};

/// Downloads cover images from the upstream servers.
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ImageError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("WonderlandExplorer/1.0")
            .build()
            .map_err(|e| ImageError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageError::UpstreamUnavailable(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(ImageError::UpstreamUnavailable(format!(
                "image download returned {}",
                resp.status()
            )));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ImageError::UpstreamUnavailable(e.to_string()))?;

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
