//! # MakerWorld Provider Module
//!
//! ## Overview
//!
//! Read-only client for the MakerWorld design platform. Exposes the
//! [`DesignCatalog`] trait for listing a maker's published designs, fetching
//! full detail, and resolving short-lived download URLs, plus the session
//! [`HttpClient`] seam shared with the asset downloader.
//!
//! Authentication is cookie-based: the host shell captures the platform
//! session (including anti-bot cookies) and installs it on the
//! [`SessionHttpClient`]. HTTP 418 from any endpoint means the anti-bot layer
//! wants a captcha solved; callers detect it with
//! [`ProviderError::is_captcha`].

pub mod catalog;
pub mod error;
pub mod http;
pub mod types;

pub use catalog::{DesignCatalog, MakerWorldCatalog};
pub use error::{ProviderError, Result};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, SessionHttpClient};
pub use types::{RemoteDesignDetail, RemoteDesignSummary, RemoteInstance, RemoteModelFile};
