//! Sync session state and batch reporting types
//!
//! Everything here is transient: one value per sync dialog, dropped when the
//! dialog closes. The orchestrator takes the session by reference and is
//! resumable by being re-invoked with the remaining selection after a
//! captcha pause.

use crate::merge::MergeConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Batch-wide download toggles
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub download_cover: bool,
    pub download_models: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            download_cover: true,
            download_models: true,
        }
    }
}

/// One sync run's input: who, what, and how
pub struct SyncSession {
    pub owner_id: String,
    pub handle: String,
    pub user_id: String,
    /// Remote design ids in selection order
    pub selected: Vec<i64>,
    /// Per-design merge decisions; absent entries fall back to the default
    pub merge_configs: HashMap<i64, MergeConfig>,
    pub options: SyncOptions,
    pub cancel: CancellationToken,
}

impl SyncSession {
    pub fn new(
        owner_id: impl Into<String>,
        handle: impl Into<String>,
        user_id: impl Into<String>,
        selected: Vec<i64>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            handle: handle.into(),
            user_id: user_id.into(),
            selected,
            merge_configs: HashMap::new(),
            options: SyncOptions::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn merge_config_for(&self, remote_id: i64) -> MergeConfig {
        self.merge_configs
            .get(&remote_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Identity of the design whose download tripped the anti-bot challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaPause {
    pub remote_id: i64,
    pub public_id: Option<String>,
    pub name: String,
}

/// Terminal state of one batch run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Done,
    /// The batch halted on an interactive challenge; the user resumes by
    /// re-running sync for the remaining designs
    CaptchaPaused(CaptchaPause),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct CompletedDesign {
    pub remote_id: i64,
    pub design_id: i64,
    pub name: String,
    /// True when the design was newly imported rather than updated
    pub created: bool,
    pub changes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FailedDesign {
    pub remote_id: i64,
    pub name: String,
    /// Aggregated error messages, verbatim
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SkippedDesign {
    pub remote_id: i64,
    pub name: String,
    pub reason: String,
}

/// End-of-batch summary
#[derive(Debug)]
pub struct SyncBatchReport {
    pub completed: Vec<CompletedDesign>,
    pub failed: Vec<FailedDesign>,
    pub skipped: Vec<SkippedDesign>,
    pub state: BatchState,
}

impl SyncBatchReport {
    pub(crate) fn new() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            state: BatchState::Done,
        }
    }
}

/// Per-design workflow stages, reported through the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    FetchingDetails,
    DownloadingAssets,
    Reconciling,
    Persisting,
}

impl SyncStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStage::FetchingDetails => "fetching-details",
            SyncStage::DownloadingAssets => "downloading-assets",
            SyncStage::Reconciling => "reconciling",
            SyncStage::Persisting => "persisting",
        }
    }
}

/// Progress snapshot for UI display
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub design_index: usize,
    pub design_total: usize,
    pub design_name: String,
    /// Ordinal of the file currently downloading, when in the download stage
    pub file_index: Option<usize>,
    /// File currently downloading, when in the download stage
    pub file_name: Option<String>,
    pub stage: SyncStage,
}

pub type ProgressFn = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Read-only snapshot backing the reconciliation view
#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub synced_remote_ids: Vec<String>,
    pub design_names: Vec<String>,
}
