//! Domain models for the design library
//!
//! Row structs map 1:1 onto the sync tables; enums carry their database
//! string/integer representations.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Maximum length of a synthesized design summary
const SUMMARY_MAX_CHARS: usize = 200;

/// Placeholder summary when an imported description is empty
const SUMMARY_PLACEHOLDER: &str = "Imported from MakerWorld";

// =============================================================================
// Enums
// =============================================================================

/// External design-sharing platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    MakerWorld,
    Printables,
    Thingiverse,
}

impl Platform {
    /// Database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::MakerWorld => "makerworld",
            Platform::Printables => "printables",
            Platform::Thingiverse => "thingiverse",
        }
    }
}

impl FromStr for Platform {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "makerworld" => Ok(Platform::MakerWorld),
            "printables" => Ok(Platform::Printables),
            "thingiverse" => Ok(Platform::Thingiverse),
            _ => Err(StoreError::InvalidInput {
                field: "platform".to_string(),
                message: format!("unknown platform: {}", s),
            }),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publication status of a platform link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishStatus {
    Draft,
    Published,
}

impl PublishStatus {
    /// Database integer representation (draft=1, published=2)
    pub fn as_i64(&self) -> i64 {
        match self {
            PublishStatus::Draft => 1,
            PublishStatus::Published => 2,
        }
    }

    pub fn from_i64(v: i64) -> Result<Self, StoreError> {
        match v {
            1 => Ok(PublishStatus::Draft),
            2 => Ok(PublishStatus::Published),
            _ => Err(StoreError::InvalidInput {
                field: "status".to_string(),
                message: format!("unknown publish status: {}", v),
            }),
        }
    }
}

// =============================================================================
// Row models
// =============================================================================

/// A design record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Design {
    pub id: i64,
    pub owner_id: String,
    /// Display name
    pub name: String,
    /// Short plain-text summary (synthesized from the description on import)
    pub summary: String,
    /// Rich-text description
    pub description: String,
    /// License identifier
    pub license: String,
    /// Per-platform category codes
    pub category_makerworld: Option<i64>,
    pub category_printables: Option<i64>,
    pub category_thingiverse: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Soft-delete marker
    pub deleted_at: Option<i64>,
}

/// A file attached to a design
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DesignAsset {
    pub id: i64,
    pub design_id: i64,
    /// Display file name (the on-disk base name)
    pub file_name: String,
    pub ext: String,
    /// Path relative to the assets root
    pub storage_path: String,
    /// Original source path, if the file was imported from disk
    pub origin_path: Option<String>,
    pub origin_size: Option<i64>,
    pub origin_mtime: Option<i64>,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// A (design, text, platform-origin) tag record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DesignTag {
    pub id: i64,
    pub design_id: i64,
    pub tag: String,
    /// Platform the tag came from
    pub platform: String,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

/// Association between a local design and its remote counterpart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlatformLink {
    pub id: i64,
    pub design_id: i64,
    pub platform: String,
    /// Remote design identifier (internal numeric or public representation)
    pub remote_id: String,
    /// Publication status code (draft=1, published=2)
    pub status: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Stamped once on the transition to published
    pub published_at: Option<i64>,
    pub deleted_at: Option<i64>,
}

impl PlatformLink {
    pub fn publish_status(&self) -> Result<PublishStatus, StoreError> {
        PublishStatus::from_i64(self.status)
    }
}

// =============================================================================
// Write models
// =============================================================================

/// Fields for a design being imported for the first time
#[derive(Debug, Clone)]
pub struct NewDesign {
    pub owner_id: String,
    pub name: String,
    pub description: String,
    pub license: String,
    pub category_makerworld: Option<i64>,
}

impl NewDesign {
    /// Validate before insert
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Design name cannot be empty".to_string());
        }
        if self.owner_id.trim().is_empty() {
            return Err("Owner id cannot be empty".to_string());
        }
        Ok(())
    }
}

/// Field values for a merge update
#[derive(Debug, Clone, Default)]
pub struct DesignFields {
    pub name: String,
    pub description: String,
    pub license: String,
    pub category_makerworld: Option<i64>,
}

/// Which fields a merge update is allowed to overwrite
#[derive(Debug, Clone, Copy)]
pub struct DesignFieldMask {
    pub name: bool,
    pub description: bool,
    pub license: bool,
    pub category: bool,
}

impl DesignFieldMask {
    /// Mask enabling every field
    pub fn all() -> Self {
        Self {
            name: true,
            description: true,
            license: true,
            category: true,
        }
    }

    pub fn any(&self) -> bool {
        self.name || self.description || self.license || self.category
    }
}

// =============================================================================
// Summary synthesis
// =============================================================================

/// Synthesize a plain-text summary from a (possibly HTML) description.
///
/// Markup is stripped, whitespace collapsed, and the result truncated to 200
/// characters. An empty description yields a fixed placeholder.
pub fn summarize_description(description: &str) -> String {
    let tag_re = Regex::new(r"<[^>]*>").expect("valid regex");
    let stripped = tag_re.replace_all(description, " ");
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        return SUMMARY_PLACEHOLDER.to_string();
    }

    collapsed.chars().take(SUMMARY_MAX_CHARS).collect()
}
