use crate::core::images::{CachedImage, ImageCacheStore, ImageError};
use crate::core::levels::ServerRegion;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;

/// Source URL -> CDN URL mapping that survives restarts.
pub struct SqliteImageStore {
    pool: Pool<Sqlite>,
}

impl SqliteImageStore {
    /// Opens (creating if needed) the database at `database_url`, which may be
    /// a plain path or a `sqlite://` URL.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let path = Path::new(database_url.strip_prefix("sqlite://").unwrap_or(database_url));
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cached_images (
                source_url TEXT PRIMARY KEY,
                guid TEXT NOT NULL,
                server TEXT NOT NULL,
                image_url TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_cached_images_guid ON cached_images (guid, server)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ImageCacheStore for SqliteImageStore {
    async fn get(&self, source_url: &str) -> Result<Option<CachedImage>, ImageError> {
        let row = sqlx::query(
            "SELECT source_url, guid, server, image_url, created_at, updated_at FROM cached_images WHERE source_url = ?",
        )
        .bind(source_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ImageError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let server: String = row.get("server");
        let region = ServerRegion::from_code(&server)
            .ok_or_else(|| ImageError::Storage(format!("unknown server {:?} in cache", server)))?;

        Ok(Some(CachedImage {
            source_url: row.get("source_url"),
            guid: row.get("guid"),
            region,
            cdn_url: row.get("image_url"),
            created_at: row.get::<DateTime<Utc>, _>("created_at"),
            updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    async fn save(&self, image: CachedImage) -> Result<(), ImageError> {
        sqlx::query(
            r#"
            INSERT INTO cached_images (source_url, guid, server, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(source_url) DO UPDATE SET
                guid = excluded.guid,
                server = excluded.server,
                image_url = excluded.image_url,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&image.source_url)
        .bind(&image.guid)
        .bind(image.region.code())
        .bind(&image.cdn_url)
        .bind(image.created_at)
        .bind(image.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| ImageError::Storage(e.to_string()))?;

        tracing::debug!(guid = %image.guid, server = %image.region, "Saved cached image");
        Ok(())
    }
}
