//! Content-addressed asset downloader
//!
//! Downloads a binary payload from a platform CDN, works out what it really
//! is, unpacks archives, and deduplicates the resulting files against the
//! design's registered asset set by content hash. Only genuinely new content
//! reaches the per-design storage directory.

use crate::error::{Result, SyncError};
use core_designs::{AssetRepository, Platform};
use provider_makerworld::{HttpClient, HttpRequest};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Hint for default-extension resolution when nothing else identifies a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Model,
    Image,
}

impl AssetKind {
    fn default_ext(self) -> &'static str {
        match self {
            AssetKind::Model => "stl",
            AssetKind::Image => "jpg",
        }
    }
}

/// One file produced by a fetch, freshly written or matched to existing content
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub ext: String,
    pub size: u64,
    /// Existing identical content was found; no new file was written
    pub deduplicated: bool,
}

/// Result of one fetch
#[derive(Debug, Default)]
pub struct DownloadOutcome {
    pub files: Vec<DownloadedFile>,
    /// The CDN answered 418; the session needs an interactive challenge
    pub requires_captcha: bool,
}

impl DownloadOutcome {
    fn captcha() -> Self {
        Self {
            files: Vec::new(),
            requires_captcha: true,
        }
    }
}

/// CDN hosts downloads are accepted from. The fetch URL comes from a
/// less-trusted surface, so anything off-list is rejected outright.
const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "makerworld.bblmw.com",
    "makerworld.bblmw.cn",
    "public-cdn.bblmw.com",
    "public-cdn.bambulab.com",
];

/// Extensions extracted from archives; everything else stays inside the zip
const DEFAULT_ARCHIVE_EXTENSIONS: &[&str] = &[
    "stl", "obj", "3mf", "step", "stp", "ply", "gcode", "bgcode", "jpg", "jpeg", "png", "webp",
    "gif",
];

const SANITIZED_NAME_MAX: usize = 50;

/// Downloader configuration
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub allowed_hosts: Vec<String>,
    pub archive_extensions: Vec<String>,
    pub assets_root: PathBuf,
    pub platform: Platform,
}

impl DownloaderConfig {
    pub fn new(assets_root: impl Into<PathBuf>) -> Self {
        Self {
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|s| s.to_string()).collect(),
            archive_extensions: DEFAULT_ARCHIVE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            assets_root: assets_root.into(),
            platform: Platform::MakerWorld,
        }
    }

    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }
}

/// Content-addressed downloader over the shared session HTTP client
pub struct AssetDownloader {
    http: Arc<dyn HttpClient>,
    assets: Arc<dyn AssetRepository>,
    config: DownloaderConfig,
}

impl AssetDownloader {
    pub fn new(
        http: Arc<dyn HttpClient>,
        assets: Arc<dyn AssetRepository>,
        config: DownloaderConfig,
    ) -> Self {
        Self {
            http,
            assets,
            config,
        }
    }

    /// Fetch one URL for the design identified by `remote_ids`.
    ///
    /// Produces zero files (captcha), one file (plain payload, possibly
    /// deduplicated), or several (archive extraction). The archive file
    /// itself is never kept on disk.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        remote_ids: &[String],
        suggested_name: &str,
        kind: AssetKind,
    ) -> Result<DownloadOutcome> {
        let parsed = url::Url::parse(url)
            .map_err(|e| SyncError::Download {
                status: 0,
                message: format!("Invalid URL: {}", e),
            })?;
        let host = parsed.host_str().unwrap_or("");
        if !self.config.allowed_hosts.iter().any(|h| h == host) {
            return Err(SyncError::DisallowedHost(host.to_string()));
        }

        let response = self.http.execute(HttpRequest::get(url)).await?;
        if response.status == 418 {
            debug!("CDN returned 418, surfacing captcha pause");
            return Ok(DownloadOutcome::captcha());
        }
        if !response.is_success() {
            return Err(SyncError::Download {
                status: response.status,
                message: response.text(),
            });
        }

        let payload = response.body.to_vec();
        let mut ext = resolve_extension(
            suggested_name,
            response.content_type(),
            parsed.path(),
            kind,
        );
        // Platforms sometimes mislabel archives; the zip local-file-header
        // signature wins over any declared type.
        if payload.starts_with(b"PK") {
            ext = "zip".to_string();
        }

        // Directory keyed by the stable internal remote id so new designs
        // have a target before any local row exists.
        let dir_key = remote_ids
            .last()
            .cloned()
            .unwrap_or_else(|| "unlinked".to_string());
        let design_dir = self.config.assets_root.join(&dir_key);
        tokio::fs::create_dir_all(&design_dir).await?;

        let valid_names = self
            .assets
            .active_file_names_for_remote(self.config.platform, remote_ids)
            .await
            .map_err(SyncError::Store)?;

        let mut outcome = DownloadOutcome::default();
        if ext == "zip" {
            self.extract_archive(&payload, &design_dir, &valid_names, &mut outcome)
                .await?;
        } else {
            let file = self
                .store_payload(&payload, &design_dir, suggested_name, &ext, &valid_names)
                .await?;
            outcome.files.push(file);
        }

        Ok(outcome)
    }

    /// Unpack allow-listed entries; each entry goes through the same hash,
    /// dedup, and naming pipeline as a plain payload. The archive bytes stay
    /// in memory only.
    async fn extract_archive(
        &self,
        payload: &[u8],
        design_dir: &Path,
        valid_names: &HashSet<String>,
        outcome: &mut DownloadOutcome,
    ) -> Result<()> {
        let mut archive = zip::ZipArchive::new(Cursor::new(payload))
            .map_err(|e| SyncError::Archive(format!("Unreadable archive: {}", e)))?;

        for index in 0..archive.len() {
            let (entry_name, contents) = {
                let mut entry = archive
                    .by_index(index)
                    .map_err(|e| SyncError::Archive(format!("Bad archive entry: {}", e)))?;
                if entry.is_dir() {
                    continue;
                }
                let mut contents = Vec::with_capacity(entry.size() as usize);
                entry
                    .read_to_end(&mut contents)
                    .map_err(|e| SyncError::Archive(format!("Failed to read entry: {}", e)))?;
                (entry.name().to_string(), contents)
            };

            let Some(entry_ext) = name_extension(&entry_name) else {
                continue;
            };
            if !self
                .config
                .archive_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(&entry_ext))
            {
                debug!(entry = %entry_name, "Skipping archive entry with disallowed extension");
                continue;
            }

            // Entry names may carry internal directories; only the base name
            // feeds the stored name.
            let base = entry_name.rsplit('/').next().unwrap_or(&entry_name);
            let file = self
                .store_payload(&contents, design_dir, base, &entry_ext, valid_names)
                .await?;
            outcome.files.push(file);
        }

        Ok(())
    }

    /// Write one payload, or hand back an existing identical file.
    async fn store_payload(
        &self,
        payload: &[u8],
        design_dir: &Path,
        suggested_name: &str,
        ext: &str,
        valid_names: &HashSet<String>,
    ) -> Result<DownloadedFile> {
        let hash = content_hash(payload);

        if !valid_names.is_empty() {
            if let Some(existing) = self
                .find_duplicate(design_dir, ext, &hash, valid_names)
                .await
            {
                debug!(path = %existing.display(), "Content hash matched existing asset");
                let file_name = existing
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                return Ok(DownloadedFile {
                    path: existing,
                    file_name,
                    ext: ext.to_string(),
                    size: payload.len() as u64,
                    deduplicated: true,
                });
            }
        }

        let base = sanitize_file_name(suggested_name);
        let file_name = format!("{:04x}_{}.{}", rand::random::<u16>(), base, ext);
        let path = design_dir.join(&file_name);
        tokio::fs::write(&path, payload).await?;

        Ok(DownloadedFile {
            path,
            file_name,
            ext: ext.to_string(),
            size: payload.len() as u64,
            deduplicated: false,
        })
    }

    /// Scan the design directory for a registered file with identical
    /// content. Any filesystem trouble fails open to a fresh write.
    async fn find_duplicate(
        &self,
        design_dir: &Path,
        ext: &str,
        hash: &str,
        valid_names: &HashSet<String>,
    ) -> Option<PathBuf> {
        let mut entries = match tokio::fs::read_dir(design_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %design_dir.display(), "Dedup scan failed, treating as no duplicate: {}", e);
                return None;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Dedup scan interrupted: {}", e);
                    break;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if !valid_names.contains(&name) {
                continue;
            }
            match name_extension(&name) {
                Some(candidate_ext) if candidate_ext.eq_ignore_ascii_case(ext) => {}
                _ => continue,
            }

            match tokio::fs::read(entry.path()).await {
                Ok(contents) if content_hash(&contents) == hash => return Some(entry.path()),
                Ok(_) => {}
                Err(e) => {
                    warn!(file = %name, "Could not read candidate during dedup scan: {}", e);
                }
            }
        }

        None
    }
}

/// Sha256 hex digest
pub(crate) fn content_hash(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

/// Extension of a file name, lowercased; None when absent or implausible
fn name_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 6 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Resolution order: suggested-name extension, content-type mapping, URL
/// path extension, then the kind default.
fn resolve_extension(
    suggested_name: &str,
    content_type: Option<&str>,
    url_path: &str,
    kind: AssetKind,
) -> String {
    if let Some(ext) = name_extension(suggested_name) {
        return ext;
    }
    if let Some(ct) = content_type {
        let ct = ct.split(';').next().unwrap_or(ct).trim();
        let mapped = match ct {
            "image/jpeg" => Some("jpg"),
            "image/png" => Some("png"),
            "image/webp" => Some("webp"),
            "image/gif" => Some("gif"),
            "application/zip" | "application/x-zip-compressed" => Some("zip"),
            "model/stl" | "application/sla" => Some("stl"),
            "model/3mf" => Some("3mf"),
            _ => None,
        };
        if let Some(ext) = mapped {
            return ext.to_string();
        }
    }
    if let Some(ext) = url_path.rsplit('/').next().and_then(name_extension) {
        return ext;
    }
    kind.default_ext().to_string()
}

/// Keep alphanumerics, dashes, and underscores; cap the length. The random
/// prefix added later keeps collisions from mattering.
fn sanitize_file_name(name: &str) -> String {
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(SANITIZED_NAME_MAX)
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}
