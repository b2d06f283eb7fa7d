//! # Design Store Module
//!
//! SQLite-backed persistence for the design library: designs, their asset
//! files, tags, and per-platform publication links.
//!
//! This crate is the only component allowed to read or write the `design`,
//! `design_asset`, `design_tag`, and `design_platform` tables during sync.
//! All rows are soft-deleted (a `deleted_at` timestamp) and every lookup is
//! restricted to active rows.

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{
    summarize_description, Design, DesignAsset, DesignFieldMask, DesignFields, DesignTag,
    NewDesign, Platform, PlatformLink, PublishStatus,
};
pub use repositories::{
    storage_relative_path, AssetRepository, DesignRepository, PlatformLinkRepository,
    SqliteAssetRepository, SqliteDesignRepository, SqlitePlatformLinkRepository,
    SqliteTagRepository, TagRepository,
};
