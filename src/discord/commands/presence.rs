// Bot presence. The custom status advertises the latest changelog version
// next to the configured status text, e.g. "v1.0.3 | Online".

use crate::discord::Data;
use poise::serenity_prelude as serenity;

pub fn status_text(version: &str, status: &str) -> String {
    format!("{} | {}", version, status)
}

pub fn set_version_status(ctx: &serenity::Context, version: &str, status: &str) {
    let activity = serenity::ActivityData::custom(status_text(version, status));
    ctx.set_presence(Some(activity), serenity::OnlineStatus::Online);
}

/// Called once the bot is ready.
pub async fn on_ready(ctx: &serenity::Context, data: &Data) {
    let version = data.router.changelogs().latest_version().await;
    set_version_status(ctx, &version, &data.bot_status);
    tracing::info!("Presence set to \"{}\"", status_text(&version, &data.bot_status));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(status_text("v1.0.3", "Online"), "v1.0.3 | Online");
    }
}
