//! # Design Sync Module
//!
//! ## Overview
//!
//! Imports a maker's published MakerWorld designs into the local store. The
//! orchestrator walks the selected batch strictly in order, per design:
//! fetch detail, download and dedup assets, reconcile against the local
//! record, apply the merge policy, persist. The batch pauses on an anti-bot
//! challenge (HTTP 418) and resumes by being re-invoked; cancellation is
//! cooperative, observed once per design.
//!
//! ## Components
//!
//! - [`orchestrator::SyncOrchestrator`]: batch state machine
//! - [`download::AssetDownloader`]: content-addressed downloads with host
//!   allow-list, archive extraction, and hash dedup
//! - [`reconcile::Reconciler`]: Linked / ByName / New classification and
//!   field diffs
//! - [`merge::MergeConfig`]: per-design field selection
//! - [`session`]: transient session input and batch report types

pub mod download;
pub mod error;
pub mod html;
pub mod licenses;
pub mod merge;
pub mod orchestrator;
pub mod reconcile;
pub mod session;

pub use download::{AssetDownloader, AssetKind, DownloadOutcome, DownloadedFile, DownloaderConfig};
pub use error::{Result, SyncError};
pub use html::normalize_description;
pub use licenses::{canonical_license, category_name, licenses_equivalent};
pub use merge::MergeConfig;
pub use orchestrator::SyncOrchestrator;
pub use reconcile::{FieldComparison, FieldDiff, Match, Reconciler};
pub use session::{
    BatchState, CaptchaPause, CompletedDesign, FailedDesign, ProgressEvent, ProgressFn,
    SkippedDesign, SyncBatchReport, SyncOptions, SyncSession, SyncStage, SyncStatus,
};
