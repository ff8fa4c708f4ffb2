// Changelog service - reads the release history shipped next to the bot.
// The file lists versions oldest first; everything here hands them out newest first.

use crate::core::embeds::EmbedPayload;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CHANGELOG_COLOR: u32 = 0x5865F2;
const FALLBACK_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(default = "unknown")]
    pub version: String,
    #[serde(default = "unknown")]
    pub date: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

fn unknown() -> String {
    "Unknown".to_string()
}

#[derive(Debug, Default, Deserialize)]
struct ChangelogFile {
    #[serde(default)]
    changelogs: Vec<Changelog>,
}

pub struct ChangelogService {
    path: PathBuf,
}

impl ChangelogService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All versions, newest first. A missing or malformed file yields an empty list.
    ///
    /// Read on every call so edits to the file show up without a restart.
    pub async fn load(&self) -> Vec<Changelog> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Changelogs file not readable: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<ChangelogFile>(&text) {
            Ok(file) => file.changelogs.into_iter().rev().collect(),
            Err(e) => {
                tracing::error!(path = %self.path.display(), "Failed to parse changelogs: {}", e);
                Vec::new()
            }
        }
    }

    /// `v<version>` of the newest entry, used in the bot presence.
    pub async fn latest_version(&self) -> String {
        let version = self
            .load()
            .await
            .into_iter()
            .next()
            .map(|c| c.version)
            .unwrap_or_else(|| FALLBACK_VERSION.to_string());
        format!("v{}", version)
    }
}

/// One page of the `/changelogs` pager.
pub fn render_changelog_page(changelog: &Changelog, page: usize, total: usize) -> EmbedPayload {
    let changes = if changelog.changes.is_empty() {
        "No changes listed".to_string()
    } else {
        changelog
            .changes
            .iter()
            .map(|change| format!("• {}", change))
            .collect::<Vec<_>>()
            .join("\n")
    };

    EmbedPayload::new("📋 Bot Changelogs", CHANGELOG_COLOR)
        .description(format!("v{} - {}", changelog.version, changelog.date))
        .field("Changes", changes, false)
        .footer(format!("Version {} of {}", page + 1, total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_returns_newest_first() {
        let file = write_file(
            r#"{"changelogs": [
                {"version": "1.0.0", "date": "2025-01-01", "changes": ["Initial release"]},
                {"version": "1.0.1", "date": "2025-01-05", "changes": ["DM support"]}
            ]}"#,
        );
        let service = ChangelogService::new(file.path());

        let changelogs = service.load().await;

        assert_eq!(changelogs.len(), 2);
        assert_eq!(changelogs[0].version, "1.0.1");
        assert_eq!(service.latest_version().await, "v1.0.1");
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let service = ChangelogService::new("/definitely/not/here/changelogs.json");

        assert!(service.load().await.is_empty());
        assert_eq!(service.latest_version().await, "v1.0.0");
    }

    #[tokio::test]
    async fn test_malformed_file_is_empty() {
        let file = write_file("{ not json");
        let service = ChangelogService::new(file.path());

        assert!(service.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let file = write_file(r#"{"changelogs": [{"changes": []}]}"#);
        let service = ChangelogService::new(file.path());

        let changelogs = service.load().await;

        assert_eq!(changelogs[0].version, "Unknown");
        assert_eq!(changelogs[0].date, "Unknown");
    }

    #[test]
    fn test_page_rendering() {
        let changelog = Changelog {
            version: "1.0.3".to_string(),
            date: "2025-02-01".to_string(),
            changes: vec!["Fix A".to_string(), "Fix B".to_string()],
        };

        let page = render_changelog_page(&changelog, 0, 4);

        assert_eq!(page.description.as_deref(), Some("v1.0.3 - 2025-02-01"));
        assert_eq!(page.fields[0].value, "• Fix A\n• Fix B");
        assert_eq!(page.footer.as_deref(), Some("Version 1 of 4"));

        let empty = Changelog {
            changes: Vec::new(),
            ..changelog
        };
        assert_eq!(render_changelog_page(&empty, 3, 4).fields[0].value, "No changes listed");
    }
}
