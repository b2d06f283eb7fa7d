//! Platform link repository trait and implementation

use crate::error::Result;
use crate::models::{Platform, PlatformLink, PublishStatus};
use crate::repositories::now;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use tracing::debug;

/// Platform link data access operations used by the sync engine
#[async_trait]
pub trait PlatformLinkRepository: Send + Sync {
    /// Create or update the link between a design and its remote counterpart.
    ///
    /// At most one active link exists per (design, platform). On the
    /// transition into published the publish time is stamped once and never
    /// overwritten by later updates.
    async fn upsert(
        &self,
        platform: Platform,
        design_id: i64,
        remote_id: &str,
        status: PublishStatus,
    ) -> Result<()>;

    /// The active link for a (design, platform) pair
    async fn find_active(&self, platform: Platform, design_id: i64)
        -> Result<Option<PlatformLink>>;

    /// Remote ids of every active link on a platform
    async fn active_remote_ids(&self, platform: Platform) -> Result<Vec<String>>;
}

/// SQLite implementation of [`PlatformLinkRepository`]
pub struct SqlitePlatformLinkRepository {
    pool: SqlitePool,
}

impl SqlitePlatformLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlatformLinkRepository for SqlitePlatformLinkRepository {
    async fn upsert(
        &self,
        platform: Platform,
        design_id: i64,
        remote_id: &str,
        status: PublishStatus,
    ) -> Result<()> {
        let ts = now();

        match self.find_active(platform, design_id).await? {
            None => {
                let published_at = match status {
                    PublishStatus::Published => Some(ts),
                    PublishStatus::Draft => None,
                };

                sqlx::query(
                    r#"
                    INSERT INTO design_platform (
                        design_id, platform, remote_id, status,
                        created_at, updated_at, published_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(design_id)
                .bind(platform.as_str())
                .bind(remote_id)
                .bind(status.as_i64())
                .bind(ts)
                .bind(ts)
                .bind(published_at)
                .execute(&self.pool)
                .await?;

                debug!(design_id, platform = platform.as_str(), remote_id, "Created platform link");
            }
            Some(link) => {
                // Stamp publish time only on the transition into published.
                let published_at = match (link.published_at, status) {
                    (None, PublishStatus::Published) => Some(ts),
                    (existing, _) => existing,
                };

                sqlx::query(
                    r#"
                    UPDATE design_platform SET
                        remote_id = ?, status = ?, updated_at = ?, published_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(remote_id)
                .bind(status.as_i64())
                .bind(ts)
                .bind(published_at)
                .bind(link.id)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn find_active(
        &self,
        platform: Platform,
        design_id: i64,
    ) -> Result<Option<PlatformLink>> {
        let link = query_as::<_, PlatformLink>(
            "SELECT * FROM design_platform
             WHERE design_id = ? AND platform = ? AND deleted_at IS NULL
             LIMIT 1",
        )
        .bind(design_id)
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    async fn active_remote_ids(&self, platform: Platform) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT remote_id FROM design_platform
             WHERE platform = ? AND deleted_at IS NULL",
        )
        .bind(platform.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
