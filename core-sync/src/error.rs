//! Error types for the sync engine

use thiserror::Error;

/// Errors surfaced by the downloader, reconciler, and orchestrator
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Store error: {0}")]
    Store(#[from] core_designs::StoreError),

    #[error("Provider error: {0}")]
    Provider(#[from] provider_makerworld::ProviderError),

    #[error("Download failed with status {status}: {message}")]
    Download { status: u16, message: String },

    #[error("Refusing to download from disallowed host: {0}")]
    DisallowedHost(String),

    #[error("Archive extraction failed: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
