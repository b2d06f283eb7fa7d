//! Design repository trait and implementation

use crate::error::{Result, StoreError};
use crate::models::{
    summarize_description, Design, DesignFieldMask, DesignFields, NewDesign, Platform,
};
use crate::repositories::now;
use async_trait::async_trait;
use sqlx::{query_as, SqlitePool};

/// Design data access operations used by the sync engine
#[async_trait]
pub trait DesignRepository: Send + Sync {
    /// Find a design by its ID (active rows only)
    async fn find_by_id(&self, id: i64) -> Result<Option<Design>>;

    /// Find the local design linked to one of the given remote identifiers.
    ///
    /// Platforms may expose both an internal numeric id and a public id for
    /// the same design, so the lookup tolerates either representation
    /// matching. Soft-deleted links and designs never match.
    async fn find_by_platform_link(
        &self,
        platform: Platform,
        remote_ids: &[String],
    ) -> Result<Option<i64>>;

    /// Fallback lookup by exact case-sensitive name within one owner's
    /// active designs. Used only when no platform link exists.
    async fn find_by_name(&self, owner_id: &str, name: &str) -> Result<Option<i64>>;

    /// Insert a design imported from a remote platform.
    ///
    /// All fields are written, along with a summary synthesized from the
    /// description (markup stripped, truncated, placeholder when empty).
    async fn insert_imported(&self, design: &NewDesign) -> Result<i64>;

    /// Apply the masked subset of fields to an existing design.
    ///
    /// `updated_at` is bumped regardless of the mask.
    async fn update_fields(
        &self,
        design_id: i64,
        fields: &DesignFields,
        mask: DesignFieldMask,
    ) -> Result<()>;

    /// Names of all active designs for an owner
    async fn list_names(&self, owner_id: &str) -> Result<Vec<String>>;
}

/// SQLite implementation of [`DesignRepository`]
pub struct SqliteDesignRepository {
    pool: SqlitePool,
}

impl SqliteDesignRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DesignRepository for SqliteDesignRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Design>> {
        let design =
            query_as::<_, Design>("SELECT * FROM design WHERE id = ? AND deleted_at IS NULL")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(design)
    }

    async fn find_by_platform_link(
        &self,
        platform: Platform,
        remote_ids: &[String],
    ) -> Result<Option<i64>> {
        let Some(first) = remote_ids.first() else {
            return Ok(None);
        };
        // Two bind slots; a single candidate is bound to both.
        let second = remote_ids.get(1).unwrap_or(first);

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT d.id
            FROM design d
            JOIN design_platform dp ON dp.design_id = d.id
            WHERE dp.platform = ?
              AND dp.remote_id IN (?, ?)
              AND dp.deleted_at IS NULL
              AND d.deleted_at IS NULL
            LIMIT 1
            "#,
        )
        .bind(platform.as_str())
        .bind(first)
        .bind(second)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn find_by_name(&self, owner_id: &str, name: &str) -> Result<Option<i64>> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM design WHERE owner_id = ? AND name = ? AND deleted_at IS NULL LIMIT 1",
        )
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn insert_imported(&self, design: &NewDesign) -> Result<i64> {
        design.validate().map_err(|msg| StoreError::InvalidInput {
            field: "design".to_string(),
            message: msg,
        })?;

        let ts = now();
        let summary = summarize_description(&design.description);

        let result = sqlx::query(
            r#"
            INSERT INTO design (
                owner_id, name, summary, description, license,
                category_makerworld, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&design.owner_id)
        .bind(&design.name)
        .bind(&summary)
        .bind(&design.description)
        .bind(&design.license)
        .bind(design.category_makerworld)
        .bind(ts)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_fields(
        &self,
        design_id: i64,
        fields: &DesignFields,
        mask: DesignFieldMask,
    ) -> Result<()> {
        let mut design =
            self.find_by_id(design_id)
                .await?
                .ok_or_else(|| StoreError::NotFound {
                    entity_type: "Design".to_string(),
                    id: design_id.to_string(),
                })?;

        if mask.name {
            design.name = fields.name.clone();
        }
        if mask.description {
            design.description = fields.description.clone();
        }
        if mask.license {
            design.license = fields.license.clone();
        }
        if mask.category {
            design.category_makerworld = fields.category_makerworld;
        }

        sqlx::query(
            r#"
            UPDATE design SET
                name = ?, description = ?, license = ?, category_makerworld = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&design.name)
        .bind(&design.description)
        .bind(&design.license)
        .bind(design.category_makerworld)
        .bind(now())
        .bind(design_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_names(&self, owner_id: &str) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM design WHERE owner_id = ? AND deleted_at IS NULL ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::PublishStatus;

    fn test_design(name: &str) -> NewDesign {
        NewDesign {
            owner_id: "owner-1".to_string(),
            name: name.to_string(),
            description: "<p>A <em>calibration</em> cube</p>".to_string(),
            license: "CC-BY-4.0".to_string(),
            category_makerworld: Some(42),
        }
    }

    async fn insert_link(
        pool: &SqlitePool,
        design_id: i64,
        remote_id: &str,
        deleted: bool,
    ) {
        sqlx::query(
            "INSERT INTO design_platform (design_id, platform, remote_id, status, created_at, updated_at, deleted_at)
             VALUES (?, 'makerworld', ?, ?, 0, 0, ?)",
        )
        .bind(design_id)
        .bind(remote_id)
        .bind(PublishStatus::Published.as_i64())
        .bind(if deleted { Some(1i64) } else { None })
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_insert_synthesizes_summary() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool);

        let id = repo.insert_imported(&test_design("Cube")).await.unwrap();
        let design = repo.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(design.name, "Cube");
        assert_eq!(design.summary, "A calibration cube");
        assert_eq!(design.category_makerworld, Some(42));
    }

    #[tokio::test]
    async fn test_find_by_platform_link_either_representation() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool.clone());

        let id = repo.insert_imported(&test_design("Boat")).await.unwrap();
        insert_link(&pool, id, "MW-PUBLIC-9", false).await;

        // Public id known: both candidates offered
        let found = repo
            .find_by_platform_link(
                Platform::MakerWorld,
                &["12345".to_string(), "MW-PUBLIC-9".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(found, Some(id));

        // Single candidate still matches
        let found = repo
            .find_by_platform_link(Platform::MakerWorld, &["MW-PUBLIC-9".to_string()])
            .await
            .unwrap();
        assert_eq!(found, Some(id));

        // Empty candidate list never matches
        let found = repo
            .find_by_platform_link(Platform::MakerWorld, &[])
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_by_platform_link_ignores_soft_deleted() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool.clone());

        let id = repo.insert_imported(&test_design("Vase")).await.unwrap();
        insert_link(&pool, id, "777", true).await;

        let found = repo
            .find_by_platform_link(Platform::MakerWorld, &["777".to_string()])
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_find_by_name_case_sensitive() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool);

        let id = repo.insert_imported(&test_design("Benchy")).await.unwrap();

        assert_eq!(repo.find_by_name("owner-1", "Benchy").await.unwrap(), Some(id));
        assert_eq!(repo.find_by_name("owner-1", "benchy").await.unwrap(), None);
        assert_eq!(repo.find_by_name("owner-2", "Benchy").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_fields_respects_mask() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool);

        let id = repo.insert_imported(&test_design("Old name")).await.unwrap();

        let fields = DesignFields {
            name: "New name".to_string(),
            description: "New description".to_string(),
            license: "CC0-1.0".to_string(),
            category_makerworld: Some(7),
        };
        let mask = DesignFieldMask {
            name: true,
            description: false,
            license: true,
            category: false,
        };

        repo.update_fields(id, &fields, mask).await.unwrap();

        let design = repo.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(design.name, "New name");
        assert_eq!(design.license, "CC0-1.0");
        assert_eq!(design.description, "<p>A <em>calibration</em> cube</p>");
        assert_eq!(design.category_makerworld, Some(42));
    }

    #[tokio::test]
    async fn test_list_names() {
        let pool = create_test_pool().await.unwrap();
        let repo = SqliteDesignRepository::new(pool);

        repo.insert_imported(&test_design("B")).await.unwrap();
        repo.insert_imported(&test_design("A")).await.unwrap();

        assert_eq!(repo.list_names("owner-1").await.unwrap(), vec!["A", "B"]);
    }
}
