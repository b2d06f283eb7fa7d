//! Asset repository trait and implementation

use crate::error::Result;
use crate::models::{DesignAsset, Platform};
use crate::repositories::now;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};
use std::collections::HashSet;
use std::path::{Component, Path};
use tracing::debug;

/// Normalize an absolute file path to one relative to the assets root.
///
/// The `assets` path segment is located and everything after it kept, so
/// stored paths remain portable across machine-specific install locations.
/// Paths without an `assets` segment are stored as given (with `/`
/// separators).
pub fn storage_relative_path(path: &Path) -> String {
    let components: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(pos) = components.iter().position(|c| c == "assets") {
        components[pos + 1..].join("/")
    } else {
        components.join("/")
    }
}

/// Asset data access operations used by the sync engine
#[async_trait]
pub trait AssetRepository: Send + Sync {
    /// Register a downloaded file for a design.
    ///
    /// The path is normalized relative to the assets root first. Insertion
    /// is skipped when an active asset with the same (design, storage path)
    /// exists; in that case only a previously unknown `origin_size` is
    /// backfilled.
    async fn upsert_downloaded(
        &self,
        design_id: i64,
        file_name: &str,
        ext: &str,
        absolute_path: &Path,
        size: Option<i64>,
    ) -> Result<()>;

    /// Active asset file names for the design linked to a remote identifier.
    ///
    /// Joins through the platform link so the dedup set never contains
    /// soft-deleted or foreign assets. Empty when no link exists yet.
    async fn active_file_names_for_remote(
        &self,
        platform: Platform,
        remote_ids: &[String],
    ) -> Result<HashSet<String>>;

    /// All active assets belonging to a design
    async fn active_assets(&self, design_id: i64) -> Result<Vec<DesignAsset>>;
}

/// SQLite implementation of [`AssetRepository`]
pub struct SqliteAssetRepository {
    pool: SqlitePool,
}

impl SqliteAssetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetRepository for SqliteAssetRepository {
    async fn upsert_downloaded(
        &self,
        design_id: i64,
        file_name: &str,
        ext: &str,
        absolute_path: &Path,
        size: Option<i64>,
    ) -> Result<()> {
        let storage_path = storage_relative_path(absolute_path);

        let existing: Option<(i64, Option<i64>)> = sqlx::query_as(
            "SELECT id, origin_size FROM design_asset
             WHERE design_id = ? AND storage_path = ? AND deleted_at IS NULL",
        )
        .bind(design_id)
        .bind(&storage_path)
        .fetch_optional(&self.pool)
        .await?;

        match existing {
            Some((id, None)) if size.is_some() => {
                debug!(asset_id = id, "Backfilling origin size for existing asset");
                sqlx::query("UPDATE design_asset SET origin_size = ? WHERE id = ?")
                    .bind(size)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;
            }
            Some(_) => {
                debug!(design_id, storage_path = %storage_path, "Asset already registered");
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO design_asset (
                        design_id, file_name, ext, storage_path, origin_size, created_at
                    ) VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(design_id)
                .bind(file_name)
                .bind(ext)
                .bind(&storage_path)
                .bind(size)
                .bind(now())
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn active_file_names_for_remote(
        &self,
        platform: Platform,
        remote_ids: &[String],
    ) -> Result<HashSet<String>> {
        let Some(first) = remote_ids.first() else {
            return Ok(HashSet::new());
        };
        let second = remote_ids.get(1).unwrap_or(first);

        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT da.file_name
            FROM design_asset da
            JOIN design_platform dp ON dp.design_id = da.design_id
            WHERE dp.platform = ?
              AND dp.remote_id IN (?, ?)
              AND dp.deleted_at IS NULL
              AND da.deleted_at IS NULL
            "#,
        )
        .bind(platform.as_str())
        .bind(first)
        .bind(second)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn active_assets(&self, design_id: i64) -> Result<Vec<DesignAsset>> {
        let assets = query_as::<_, DesignAsset>(
            "SELECT * FROM design_asset WHERE design_id = ? AND deleted_at IS NULL
             ORDER BY created_at",
        )
        .bind(design_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(assets)
    }
}
