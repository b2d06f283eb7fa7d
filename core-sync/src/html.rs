//! HTML normalization for remote descriptions
//!
//! Remote descriptions arrive as HTML even when the author typed a single
//! plain line. Normalization keeps such one-liners comparable to local plain
//! text while leaving genuine multi-block HTML intact.

use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\s+(?:style|class)\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).unwrap()
    })
}

fn single_p_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^<p(?:\s[^>]*)?>(.*)</p>$").unwrap())
}

fn block_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?:p|ul|ol|li|h[1-6]|blockquote|pre|div)\b").unwrap())
}

/// Normalize a remote HTML description for comparison and storage.
///
/// Plain text passes through trimmed. Otherwise inline `style`/`class`
/// attributes are stripped, and a lone `<p>` wrapper with no block-level
/// children is unwrapped so single-line remote summaries compare equal to
/// plain local text.
pub fn normalize_description(raw: &str) -> String {
    let trimmed = raw.trim();
    if !tag_re().is_match(trimmed) {
        return trimmed.to_string();
    }

    let cleaned = attr_re().replace_all(trimmed, "").trim().to_string();

    if let Some(caps) = single_p_re().captures(&cleaned) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if !block_tag_re().is_match(inner) {
            return inner.trim().to_string();
        }
    }

    cleaned
}
