// Runtime configuration, read once from the environment (and `.env`) at startup.

use anyhow::{anyhow, Context as _};
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BotSettings {
    pub discord_token: String,
    pub image_channel_id: u64,
    /// Extra owner on top of the application owners poise discovers itself.
    pub owner_id: Option<u64>,
    pub bot_status: String,
    pub debug: bool,
    pub payload_file: PathBuf,
    pub share_url_template: Option<String>,
    pub project_url: Option<String>,
    pub database_url: String,
    pub image_cache_dir: PathBuf,
    pub changelogs_file: PathBuf,
    pub log_dir: PathBuf,
    pub log_timezone: Tz,
    pub log_retention_days: u32,
    pub upstream_timeout: Duration,
}

impl BotSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // Empty values in .env count as unset.
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());

        let discord_token = var("DISCORD_TOKEN").ok_or_else(|| {
            anyhow!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")
        })?;

        let image_channel_id = var("IMAGE_CHANNEL_ID")
            .ok_or_else(|| anyhow!("Missing IMAGE_CHANNEL_ID environment variable"))?
            .parse::<u64>()
            .context("IMAGE_CHANNEL_ID must be a numeric channel id")?;

        let owner_id = var("OWNER_ID")
            .map(|raw| raw.parse::<u64>())
            .transpose()
            .context("OWNER_ID must be a numeric user id")?;

        let log_timezone = or("LOG_TIMEZONE", "UTC")
            .parse::<Tz>()
            .map_err(|e| anyhow!("LOG_TIMEZONE is not a known timezone: {}", e))?;

        let log_retention_days = or("LOG_RETENTION_DAYS", "7")
            .parse::<u32>()
            .context("LOG_RETENTION_DAYS must be a whole number of days")?;

        let timeout_secs = or("UPSTREAM_TIMEOUT_SECS", "15")
            .parse::<u64>()
            .context("UPSTREAM_TIMEOUT_SECS must be a whole number of seconds")?;

        Ok(Self {
            discord_token,
            image_channel_id,
            owner_id,
            bot_status: or("BOT_STATUS", "Online"),
            debug: or("DEBUG", "false").eq_ignore_ascii_case("true"),
            payload_file: or("LEVEL_API_PAYLOAD_FILE", "ref/payload.json").into(),
            share_url_template: var("LEVEL_SHARE_URL_TEMPLATE"),
            project_url: var("PROJECT_URL"),
            database_url: or("DATABASE_URL", "data/wonderland_cache.db"),
            image_cache_dir: or("IMAGE_CACHE_DIR", ".cache").into(),
            changelogs_file: or("CHANGELOGS_FILE", "changelogs.json").into(),
            log_dir: or("LOG_DIR", "logs").into(),
            log_timezone,
            log_retention_days,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<BotSettings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let s = settings(&[("DISCORD_TOKEN", "token"), ("IMAGE_CHANNEL_ID", "42")]).unwrap();

        assert_eq!(s.image_channel_id, 42);
        assert_eq!(s.bot_status, "Online");
        assert!(!s.debug);
        assert_eq!(s.payload_file, PathBuf::from("ref/payload.json"));
        assert_eq!(s.database_url, "data/wonderland_cache.db");
        assert_eq!(s.log_timezone, Tz::UTC);
        assert_eq!(s.log_retention_days, 7);
        assert_eq!(s.upstream_timeout, Duration::from_secs(15));
        assert!(s.share_url_template.is_none());
        assert!(s.owner_id.is_none());
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let err = settings(&[("IMAGE_CHANNEL_ID", "42")]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));

        let err = settings(&[("DISCORD_TOKEN", "  "), ("IMAGE_CHANNEL_ID", "42")]).unwrap_err();
        assert!(err.to_string().contains("DISCORD_TOKEN"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(settings(&[("DISCORD_TOKEN", "t"), ("IMAGE_CHANNEL_ID", "general")]).is_err());
        assert!(settings(&[
            ("DISCORD_TOKEN", "t"),
            ("IMAGE_CHANNEL_ID", "1"),
            ("LOG_TIMEZONE", "Mars/Olympus"),
        ])
        .is_err());
    }

    #[test]
    fn test_overrides() {
        let s = settings(&[
            ("DISCORD_TOKEN", "t"),
            ("IMAGE_CHANNEL_ID", "1"),
            ("DEBUG", "TRUE"),
            ("BOT_STATUS", "Exploring"),
            ("LOG_TIMEZONE", "Asia/Shanghai"),
            ("UPSTREAM_TIMEOUT_SECS", "5"),
            ("OWNER_ID", "99"),
        ])
        .unwrap();

        assert!(s.debug);
        assert_eq!(s.bot_status, "Exploring");
        assert_eq!(s.log_timezone, chrono_tz::Asia::Shanghai);
        assert_eq!(s.upstream_timeout, Duration::from_secs(5));
        assert_eq!(s.owner_id, Some(99));
    }
}
