//! Tag repository trait and implementation

use crate::error::Result;
use crate::models::{DesignTag, Platform};
use crate::repositories::now;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use std::collections::HashSet;
use tracing::debug;

/// Tag data access operations used by the sync engine
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Sync a design's tags from one platform.
    ///
    /// In replace mode, active tags whose origin matches `platform` are
    /// soft-deleted first; append mode leaves them alone. In both modes,
    /// incoming tags are deduplicated case-insensitively against every
    /// still-active tag for the design regardless of origin, so the same
    /// tag is never stored twice under different platform-origin records.
    async fn sync_tags(
        &self,
        design_id: i64,
        tags: &[String],
        platform: Platform,
        append: bool,
    ) -> Result<()>;

    /// All active tags for a design
    async fn active_tags(&self, design_id: i64) -> Result<Vec<DesignTag>>;
}

/// SQLite implementation of [`TagRepository`]
pub struct SqliteTagRepository {
    pool: SqlitePool,
}

impl SqliteTagRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for SqliteTagRepository {
    async fn sync_tags(
        &self,
        design_id: i64,
        tags: &[String],
        platform: Platform,
        append: bool,
    ) -> Result<()> {
        let ts = now();

        if !append {
            let retired = sqlx::query(
                "UPDATE design_tag SET deleted_at = ?
                 WHERE design_id = ? AND platform = ? AND deleted_at IS NULL",
            )
            .bind(ts)
            .bind(design_id)
            .bind(platform.as_str())
            .execute(&self.pool)
            .await?;

            debug!(
                design_id,
                platform = platform.as_str(),
                retired = retired.rows_affected(),
                "Replaced platform tags"
            );
        }

        let mut active_lower: HashSet<String> = self
            .active_tags(design_id)
            .await?
            .into_iter()
            .map(|t| t.tag.to_lowercase())
            .collect();

        for tag in tags {
            let lower = tag.to_lowercase();
            if active_lower.contains(&lower) {
                continue;
            }

            sqlx::query(
                "INSERT INTO design_tag (design_id, tag, platform, created_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(design_id)
            .bind(tag)
            .bind(platform.as_str())
            .bind(ts)
            .execute(&self.pool)
            .await?;

            active_lower.insert(lower);
        }

        Ok(())
    }

    async fn active_tags(&self, design_id: i64) -> Result<Vec<DesignTag>> {
        let tags = query_as::<_, DesignTag>(
            "SELECT * FROM design_tag WHERE design_id = ? AND deleted_at IS NULL
             ORDER BY created_at, id",
        )
        .bind(design_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}
