//! Per-design merge policy

use core_designs::DesignFieldMask;
use serde::{Deserialize, Serialize};

/// User-editable choice of what an import overwrites for one design.
///
/// Lives only for the duration of one sync session; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeConfig {
    pub sync_name: bool,
    pub sync_description: bool,
    pub sync_license: bool,
    pub sync_category: bool,
    pub sync_tags: bool,
    pub sync_assets: bool,
    /// Append incoming tags instead of replacing same-origin ones
    pub append_tags: bool,
    /// Skip the design entirely, without any network call
    pub skip: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sync_name: true,
            sync_description: true,
            sync_license: true,
            sync_category: true,
            sync_tags: true,
            sync_assets: true,
            append_tags: false,
            skip: false,
        }
    }
}

impl MergeConfig {
    /// The implicit policy for brand-new designs: everything synced
    pub fn full() -> Self {
        Self::default()
    }

    /// Field mask for the store gateway's masked update
    pub fn field_mask(&self) -> DesignFieldMask {
        DesignFieldMask {
            name: self.sync_name,
            description: self.sync_description,
            license: self.sync_license,
            category: self.sync_category,
        }
    }
}
