//! Reconciliation engine
//!
//! Classifies each remote design against the local store and, for matches,
//! computes a field-level comparison to drive the merge preview.

use crate::error::Result;
use crate::html::normalize_description;
use crate::licenses::{category_name, licenses_equivalent};
use core_designs::{Design, DesignRepository, Platform, TagRepository};
use provider_makerworld::RemoteDesignSummary;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;

/// How a remote design relates to the local store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// No link and no name match; import creates a fresh design
    New,
    /// An active platform link already ties it to this local design
    Linked(i64),
    /// No link, but the title exactly matches this local design's name
    ByName(i64),
}

impl Match {
    pub fn design_id(self) -> Option<i64> {
        match self {
            Match::New => None,
            Match::Linked(id) | Match::ByName(id) => Some(id),
        }
    }
}

/// One differing field, local value against remote value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub local: String,
    pub remote: String,
}

/// Field-by-field comparison for a matched design
#[derive(Debug, Clone, Default)]
pub struct FieldComparison {
    pub name: Option<FieldDiff>,
    pub description: Option<FieldDiff>,
    pub license: Option<FieldDiff>,
    pub category: Option<FieldDiff>,
    pub tags_added: Vec<String>,
    pub tags_removed: Vec<String>,
}

impl FieldComparison {
    pub fn is_unchanged(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.license.is_none()
            && self.category.is_none()
            && self.tags_added.is_empty()
            && self.tags_removed.is_empty()
    }

    /// Human-readable change list for the end-of-batch summary
    pub fn change_summary(&self) -> Vec<String> {
        let mut changes = Vec::new();
        if self.name.is_some() {
            changes.push("name".to_string());
        }
        if self.description.is_some() {
            changes.push("description".to_string());
        }
        if self.license.is_some() {
            changes.push("license".to_string());
        }
        if self.category.is_some() {
            changes.push("category".to_string());
        }
        if !self.tags_added.is_empty() {
            changes.push(format!("tags added: {}", self.tags_added.join(", ")));
        }
        if !self.tags_removed.is_empty() {
            changes.push(format!("tags removed: {}", self.tags_removed.join(", ")));
        }
        changes
    }
}

/// Reconciler over the design and tag repositories
pub struct Reconciler {
    designs: Arc<dyn DesignRepository>,
    tags: Arc<dyn TagRepository>,
    platform: Platform,
}

impl Reconciler {
    pub fn new(
        designs: Arc<dyn DesignRepository>,
        tags: Arc<dyn TagRepository>,
        platform: Platform,
    ) -> Self {
        Self {
            designs,
            tags,
            platform,
        }
    }

    /// Classify one remote design. Link lookup wins over the name fallback;
    /// soft-deleted rows never match either way.
    #[instrument(skip(self, remote), fields(remote_id = remote.id))]
    pub async fn classify(&self, owner_id: &str, remote: &RemoteDesignSummary) -> Result<Match> {
        let candidates = remote.remote_id_candidates();
        if let Some(id) = self
            .designs
            .find_by_platform_link(self.platform, &candidates)
            .await?
        {
            return Ok(Match::Linked(id));
        }

        if let Some(id) = self.designs.find_by_name(owner_id, &remote.title).await? {
            return Ok(Match::ByName(id));
        }

        Ok(Match::New)
    }

    /// Field comparison between a matched local design and the remote one.
    #[instrument(skip(self, remote), fields(design_id, remote_id = remote.id))]
    pub async fn compare(
        &self,
        design_id: i64,
        remote: &RemoteDesignSummary,
    ) -> Result<FieldComparison> {
        let local = self
            .designs
            .find_by_id(design_id)
            .await?
            .ok_or(core_designs::StoreError::NotFound {
                entity_type: "Design".to_string(),
                id: design_id.to_string(),
            })?;
        let local_tags: Vec<String> = self
            .tags
            .active_tags(design_id)
            .await?
            .into_iter()
            .map(|t| t.tag)
            .collect();

        Ok(compare_fields(&local, &local_tags, remote))
    }
}

fn diff(local: &str, remote: &str) -> Option<FieldDiff> {
    if local == remote {
        None
    } else {
        Some(FieldDiff {
            local: local.to_string(),
            remote: remote.to_string(),
        })
    }
}

/// Pure comparison, factored out for direct testing
pub fn compare_fields(
    local: &Design,
    local_tags: &[String],
    remote: &RemoteDesignSummary,
) -> FieldComparison {
    let mut comparison = FieldComparison {
        name: diff(&local.name, &remote.title),
        ..FieldComparison::default()
    };

    let remote_description = remote
        .description
        .as_deref()
        .or(remote.summary.as_deref())
        .unwrap_or("");
    let local_norm = normalize_description(&local.description);
    let remote_norm = normalize_description(remote_description);
    comparison.description = diff(&local_norm, &remote_norm);

    if let Some(remote_license) = remote.license.as_deref() {
        if !licenses_equivalent(&local.license, remote_license) {
            comparison.license = Some(FieldDiff {
                local: local.license.clone(),
                remote: remote_license.to_string(),
            });
        }
    }

    if let Some(remote_category) = remote.category_id {
        let remote_name = category_name(remote_category);
        let local_name = local.category_makerworld.map(category_name);
        if local_name.as_deref() != Some(remote_name.as_str()) {
            comparison.category = Some(FieldDiff {
                local: local_name.unwrap_or_default(),
                remote: remote_name,
            });
        }
    }

    let local_set: HashSet<&str> = local_tags.iter().map(String::as_str).collect();
    let remote_set: HashSet<&str> = remote.tags.iter().map(String::as_str).collect();
    comparison.tags_added = remote
        .tags
        .iter()
        .filter(|t| !local_set.contains(t.as_str()))
        .cloned()
        .collect();
    comparison.tags_removed = local_tags
        .iter()
        .filter(|t| !remote_set.contains(t.as_str()))
        .cloned()
        .collect();

    comparison
}
