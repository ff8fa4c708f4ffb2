use crate::core::images::{ImageError, ImageUploader};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Uploads cover images as attachments to a private channel and hands back the
/// attachment URL, which Discord serves from its CDN.
pub struct DiscordCdnUploader {
    http: Arc<serenity::Http>,
    channel_id: serenity::ChannelId,
    timeout: Duration,
}

impl DiscordCdnUploader {
    pub fn new(http: Arc<serenity::Http>, channel_id: serenity::ChannelId, timeout: Duration) -> Self {
        Self {
            http,
            channel_id,
            timeout,
        }
    }
}

#[async_trait]
impl ImageUploader for DiscordCdnUploader {
    async fn upload(&self, path: &Path, filename: &str) -> Result<String, ImageError> {
        let bytes = tokio::fs::read(path).await?;
        let message = serenity::CreateMessage::new()
            .add_file(serenity::CreateAttachment::bytes(bytes, filename));

        let sent = tokio::time::timeout(self.timeout, self.channel_id.send_message(&self.http, message))
            .await
            .map_err(|_| ImageError::UploadFailed(format!("upload of {} timed out", filename)))?
            .map_err(|e| ImageError::UploadFailed(e.to_string()))?;

        let url = sent
            .attachments
            .first()
            .map(|attachment| attachment.url.clone())
            .ok_or_else(|| ImageError::UploadFailed("message came back without an attachment".to_string()))?;

        tracing::debug!(channel = self.channel_id.get(), "Uploaded {} to CDN", filename);
        Ok(url)
    }
}
