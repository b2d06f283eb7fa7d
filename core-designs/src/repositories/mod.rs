//! Repository traits and SQLite implementations for the sync tables

pub mod asset;
pub mod design;
pub mod platform_link;
pub mod tag;

pub use asset::{storage_relative_path, AssetRepository, SqliteAssetRepository};
pub use design::{DesignRepository, SqliteDesignRepository};
pub use platform_link::{PlatformLinkRepository, SqlitePlatformLinkRepository};
pub use tag::{SqliteTagRepository, TagRepository};

/// Current unix timestamp in seconds
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
