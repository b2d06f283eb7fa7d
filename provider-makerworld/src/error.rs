//! Error types for the MakerWorld provider

use thiserror::Error;

/// Errors surfaced by the catalog client and HTTP session
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-level failure before any response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// The platform answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response arrived but did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ProviderError {
    /// True when the platform's anti-bot layer intercepted the request.
    ///
    /// MakerWorld signals a required captcha challenge with HTTP 418.
    pub fn is_captcha(&self) -> bool {
        matches!(self, ProviderError::Api { status: 418, .. })
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_captcha_only_for_418() {
        let teapot = ProviderError::Api {
            status: 418,
            message: "challenge".to_string(),
        };
        assert!(teapot.is_captcha());

        let forbidden = ProviderError::Api {
            status: 403,
            message: "denied".to_string(),
        };
        assert!(!forbidden.is_captcha());
        assert!(!ProviderError::Transport("timeout".to_string()).is_captcha());
    }
}
