//! Sync orchestrator
//!
//! Drives the per-design workflow across a batch: fetch details, download
//! assets, reconcile, apply the merge policy, persist. Designs run strictly
//! in selection order with no overlap, so the content-hash dedup invariant
//! holds without locking. The batch pauses as a whole on an anti-bot
//! challenge and honors cooperative cancellation at each loop top.

use crate::download::{AssetDownloader, AssetKind, DownloadOutcome, DownloadedFile};
use crate::error::Result;
use crate::html::normalize_description;
use crate::licenses::canonical_license;
use crate::merge::MergeConfig;
use crate::reconcile::{Match, Reconciler};
use crate::session::{
    BatchState, CaptchaPause, CompletedDesign, FailedDesign, ProgressEvent, ProgressFn,
    SkippedDesign, SyncBatchReport, SyncSession, SyncStage, SyncStatus,
};
use core_designs::{
    AssetRepository, DesignFields, DesignRepository, NewDesign, Platform, PlatformLinkRepository,
    PublishStatus, TagRepository,
};
use provider_makerworld::{DesignCatalog, RemoteDesignDetail, RemoteDesignSummary};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const REASON_CANCELLED: &str = "cancelled by user";
const REASON_CAPTCHA: &str = "captcha required / sync paused";
const REASON_USER_SKIP: &str = "skipped by user";
const REASON_NOT_LISTED: &str = "not present in remote published list";

/// Outcome of processing one design
enum DesignResult {
    Completed(CompletedDesign),
    Failed(String),
    /// A download hit the anti-bot wall; the whole batch must pause
    Captcha,
}

/// Batch sync driver
pub struct SyncOrchestrator {
    catalog: Arc<dyn DesignCatalog>,
    downloader: AssetDownloader,
    designs: Arc<dyn DesignRepository>,
    assets: Arc<dyn AssetRepository>,
    tags: Arc<dyn TagRepository>,
    links: Arc<dyn PlatformLinkRepository>,
    reconciler: Reconciler,
    platform: Platform,
    progress: Option<ProgressFn>,
}

impl SyncOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn DesignCatalog>,
        downloader: AssetDownloader,
        designs: Arc<dyn DesignRepository>,
        assets: Arc<dyn AssetRepository>,
        tags: Arc<dyn TagRepository>,
        links: Arc<dyn PlatformLinkRepository>,
    ) -> Self {
        let platform = Platform::MakerWorld;
        let reconciler = Reconciler::new(designs.clone(), tags.clone(), platform);
        Self {
            catalog,
            downloader,
            designs,
            assets,
            tags,
            links,
            reconciler,
            platform,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(progress) = &self.progress {
            progress(event);
        }
    }

    fn emit_file(
        &self,
        index: usize,
        total: usize,
        summary: &RemoteDesignSummary,
        file_no: usize,
        file_name: String,
    ) {
        self.emit(ProgressEvent {
            design_index: index,
            design_total: total,
            design_name: summary.title.clone(),
            file_index: Some(file_no),
            file_name: Some(file_name),
            stage: SyncStage::DownloadingAssets,
        });
    }

    /// Run one batch over the session's selected designs.
    ///
    /// Per-design failures never abort the batch. A captcha pause skips the
    /// current and all unattempted designs; re-invoking with the same
    /// selection resumes naturally because already-synced designs reconcile
    /// to no-ops.
    #[instrument(skip(self, session), fields(selected = session.selected.len()))]
    pub async fn run_batch(&self, session: &SyncSession) -> Result<SyncBatchReport> {
        let listed = self
            .catalog
            .list_published(&session.handle, &session.user_id)
            .await?;
        let by_id: HashMap<i64, &RemoteDesignSummary> =
            listed.iter().map(|d| (d.id, d)).collect();

        let mut report = SyncBatchReport::new();
        let total = session.selected.len();

        for (index, remote_id) in session.selected.iter().copied().enumerate() {
            if session.cancel.is_cancelled() {
                info!(remaining = total - index, "Sync cancelled, skipping remaining designs");
                for &rest in &session.selected[index..] {
                    report.skipped.push(SkippedDesign {
                        remote_id: rest,
                        name: by_id.get(&rest).map(|d| d.title.clone()).unwrap_or_default(),
                        reason: REASON_CANCELLED.to_string(),
                    });
                }
                report.state = BatchState::Cancelled;
                break;
            }

            let Some(summary) = by_id.get(&remote_id).copied() else {
                report.skipped.push(SkippedDesign {
                    remote_id,
                    name: String::new(),
                    reason: REASON_NOT_LISTED.to_string(),
                });
                continue;
            };

            // Skip is honored before any per-design network call.
            if session.merge_config_for(remote_id).skip {
                report.skipped.push(SkippedDesign {
                    remote_id,
                    name: summary.title.clone(),
                    reason: REASON_USER_SKIP.to_string(),
                });
                continue;
            }

            match self.process_design(session, index, total, summary).await {
                Ok(DesignResult::Completed(completed)) => report.completed.push(completed),
                Ok(DesignResult::Failed(error)) => report.failed.push(FailedDesign {
                    remote_id,
                    name: summary.title.clone(),
                    error,
                }),
                Ok(DesignResult::Captcha) => {
                    warn!(remote_id, "Anti-bot challenge hit, pausing batch");
                    for &rest in &session.selected[index..] {
                        report.skipped.push(SkippedDesign {
                            remote_id: rest,
                            name: by_id.get(&rest).map(|d| d.title.clone()).unwrap_or_default(),
                            reason: REASON_CAPTCHA.to_string(),
                        });
                    }
                    report.state = BatchState::CaptchaPaused(CaptchaPause {
                        remote_id,
                        public_id: summary.public_id.clone(),
                        name: summary.title.clone(),
                    });
                    break;
                }
                Err(e) => report.failed.push(FailedDesign {
                    remote_id,
                    name: summary.title.clone(),
                    error: e.to_string(),
                }),
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "Sync batch finished"
        );
        Ok(report)
    }

    async fn process_design(
        &self,
        session: &SyncSession,
        index: usize,
        total: usize,
        listed: &RemoteDesignSummary,
    ) -> Result<DesignResult> {
        let remote_id = listed.id;
        self.emit(ProgressEvent {
            design_index: index,
            design_total: total,
            design_name: listed.title.clone(),
            file_index: None,
            file_name: None,
            stage: SyncStage::FetchingDetails,
        });

        // Detail enriches the summary; losing it downgrades, never fails.
        let detail = match self.catalog.design_detail(remote_id).await {
            Ok(detail) => Some(detail),
            Err(e) => {
                warn!(remote_id, "Detail fetch failed, continuing with list data: {}", e);
                None
            }
        };
        let summary = detail.as_ref().map(|d| &d.summary).unwrap_or(listed);

        // Classification happens before persistence but the merge config is
        // needed now to decide whether assets are pulled at all.
        let config = session.merge_config_for(remote_id);

        self.emit(ProgressEvent {
            design_index: index,
            design_total: total,
            design_name: summary.title.clone(),
            file_index: None,
            file_name: None,
            stage: SyncStage::DownloadingAssets,
        });

        let mut files: Vec<DownloadedFile> = Vec::new();
        let mut download_errors: Vec<String> = Vec::new();
        if config.sync_assets {
            match self
                .download_assets(session, index, total, summary, detail.as_ref())
                .await?
            {
                DownloadPhase::Captcha => return Ok(DesignResult::Captcha),
                DownloadPhase::Done {
                    files: downloaded,
                    errors,
                } => {
                    files = downloaded;
                    download_errors = errors;
                }
            }
        }

        // Any accumulated download failure fails the design rather than
        // persisting a partial asset set.
        if !download_errors.is_empty() {
            return Ok(DesignResult::Failed(download_errors.join("; ")));
        }

        self.emit(ProgressEvent {
            design_index: index,
            design_total: total,
            design_name: summary.title.clone(),
            file_index: None,
            file_name: None,
            stage: SyncStage::Reconciling,
        });

        let classification = self.reconciler.classify(&session.owner_id, summary).await?;
        let config = match classification {
            Match::New => MergeConfig::full(),
            Match::Linked(_) | Match::ByName(_) => config,
        };

        self.emit(ProgressEvent {
            design_index: index,
            design_total: total,
            design_name: summary.title.clone(),
            file_index: None,
            file_name: None,
            stage: SyncStage::Persisting,
        });

        match self
            .persist_design(session, summary, classification, &config, &files)
            .await
        {
            Ok(completed) => Ok(DesignResult::Completed(completed)),
            Err(e) => {
                warn!(remote_id, "Persisting failed: {}", e);
                Ok(DesignResult::Failed(e.to_string()))
            }
        }
    }

    async fn download_assets(
        &self,
        session: &SyncSession,
        index: usize,
        total: usize,
        summary: &RemoteDesignSummary,
        detail: Option<&RemoteDesignDetail>,
    ) -> Result<DownloadPhase> {
        let candidates = summary.remote_id_candidates();
        let mut files = Vec::new();
        let mut errors = Vec::new();

        let mut file_no = 0usize;

        if session.options.download_cover {
            if let Some(cover_url) = summary.cover_url.as_deref() {
                file_no += 1;
                self.emit_file(index, total, summary, file_no, format!("{}-cover", summary.title));
                match self
                    .downloader
                    .fetch(
                        cover_url,
                        &candidates,
                        &format!("{}-cover", summary.title),
                        AssetKind::Image,
                    )
                    .await
                {
                    Ok(outcome) if outcome.requires_captcha => return Ok(DownloadPhase::Captcha),
                    Ok(outcome) => collect(outcome, &mut files),
                    Err(e) => errors.push(format!("cover: {}", e)),
                }
            }
        }

        if session.options.download_models {
            if let Some(detail) = detail {
                // The archive endpoint 404s for designs without model files.
                if !detail.model_files.is_empty() {
                    file_no += 1;
                    self.emit_file(index, total, summary, file_no, format!("{}-models", summary.title));
                    match self.fetch_model_archive(summary, &candidates).await {
                        Ok(Some(outcome)) if outcome.requires_captcha => {
                            return Ok(DownloadPhase::Captcha)
                        }
                        Ok(Some(outcome)) => collect(outcome, &mut files),
                        Ok(None) => return Ok(DownloadPhase::Captcha),
                        Err(e) => errors.push(format!("model archive: {}", e)),
                    }
                }

                for instance in &detail.instances {
                    file_no += 1;
                    self.emit_file(index, total, summary, file_no, instance.name.clone());
                    match self.fetch_instance(instance.id, &instance.name, &candidates).await {
                        Ok(Some(outcome)) if outcome.requires_captcha => {
                            return Ok(DownloadPhase::Captcha)
                        }
                        Ok(Some(outcome)) => collect(outcome, &mut files),
                        Ok(None) => return Ok(DownloadPhase::Captcha),
                        Err(e) => errors.push(format!("instance {}: {}", instance.name, e)),
                    }
                }
            }
        }

        Ok(DownloadPhase::Done { files, errors })
    }

    /// None means the URL-minting endpoint itself answered 418.
    async fn fetch_model_archive(
        &self,
        summary: &RemoteDesignSummary,
        candidates: &[String],
    ) -> Result<Option<DownloadOutcome>> {
        let url = match self.catalog.model_archive_url(summary.id).await {
            Ok(url) => url,
            Err(e) if e.is_captcha() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let outcome = self
            .downloader
            .fetch(&url, candidates, &format!("{}-models", summary.title), AssetKind::Model)
            .await?;
        Ok(Some(outcome))
    }

    async fn fetch_instance(
        &self,
        instance_id: i64,
        instance_name: &str,
        candidates: &[String],
    ) -> Result<Option<DownloadOutcome>> {
        let url = match self.catalog.instance_file_url(instance_id).await {
            Ok(url) => url,
            Err(e) if e.is_captcha() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let outcome = self
            .downloader
            .fetch(&url, candidates, instance_name, AssetKind::Model)
            .await?;
        Ok(Some(outcome))
    }

    async fn persist_design(
        &self,
        session: &SyncSession,
        summary: &RemoteDesignSummary,
        classification: Match,
        config: &MergeConfig,
        files: &[DownloadedFile],
    ) -> Result<CompletedDesign> {
        let description = normalize_description(
            summary
                .description
                .as_deref()
                .or(summary.summary.as_deref())
                .unwrap_or(""),
        );
        let license = summary
            .license
            .as_deref()
            .map(canonical_license)
            .unwrap_or("")
            .to_string();

        let (design_id, created, changes) = match classification {
            Match::New => {
                let design_id = self
                    .designs
                    .insert_imported(&NewDesign {
                        owner_id: session.owner_id.clone(),
                        name: summary.title.clone(),
                        description: description.clone(),
                        license: license.clone(),
                        category_makerworld: summary.category_id,
                    })
                    .await?;
                debug!(design_id, "Imported new design");
                (design_id, true, vec!["imported".to_string()])
            }
            Match::Linked(design_id) | Match::ByName(design_id) => {
                let comparison = self.reconciler.compare(design_id, summary).await?;
                let fields = DesignFields {
                    name: summary.title.clone(),
                    description: description.clone(),
                    license: license.clone(),
                    category_makerworld: summary.category_id,
                };
                self.designs
                    .update_fields(design_id, &fields, config.field_mask())
                    .await?;
                (design_id, false, comparison.change_summary())
            }
        };

        // Public id preferred once the platform exposes it.
        let stored_remote_id = summary
            .public_id
            .clone()
            .unwrap_or_else(|| summary.id.to_string());
        self.links
            .upsert(self.platform, design_id, &stored_remote_id, PublishStatus::Published)
            .await?;

        if config.sync_tags {
            self.tags
                .sync_tags(design_id, &summary.tags, self.platform, config.append_tags)
                .await?;
        }

        for file in files {
            self.assets
                .upsert_downloaded(
                    design_id,
                    &file.file_name,
                    &file.ext,
                    &file.path,
                    Some(file.size as i64),
                )
                .await?;
        }

        Ok(CompletedDesign {
            remote_id: summary.id,
            design_id,
            name: summary.title.clone(),
            created,
            changes,
        })
    }

    /// Read-only snapshot for pre-populating the reconciliation view
    pub async fn sync_status(&self, owner_id: &str) -> Result<SyncStatus> {
        let synced_remote_ids = self.links.active_remote_ids(self.platform).await?;
        let design_names = self.designs.list_names(owner_id).await?;
        Ok(SyncStatus {
            synced_remote_ids,
            design_names,
        })
    }
}

enum DownloadPhase {
    Done {
        files: Vec<DownloadedFile>,
        errors: Vec<String>,
    },
    Captcha,
}

fn collect(outcome: DownloadOutcome, files: &mut Vec<DownloadedFile>) {
    files.extend(outcome.files);
}
