//! License and category mapping tables
//!
//! MakerWorld speaks its own short license codes and numeric category ids;
//! the local store keeps SPDX-style identifiers and display names. These are
//! static read-only tables, loaded once.

/// MakerWorld license code → local license identifier
const LICENSE_MAP: &[(&str, &str)] = &[
    ("BY", "CC-BY-4.0"),
    ("BY-SA", "CC-BY-SA-4.0"),
    ("BY-ND", "CC-BY-ND-4.0"),
    ("BY-NC", "CC-BY-NC-4.0"),
    ("BY-NC-SA", "CC-BY-NC-SA-4.0"),
    ("BY-NC-ND", "CC-BY-NC-ND-4.0"),
    ("CC0", "CC0-1.0"),
    ("Standard Digital File License", "Standard Digital File License"),
];

/// Map a platform license code to the local identifier.
///
/// Unknown codes pass through unchanged so nothing is lost on comparison.
pub fn canonical_license(code: &str) -> &str {
    let trimmed = code.trim();
    LICENSE_MAP
        .iter()
        .find(|(remote, local)| remote.eq_ignore_ascii_case(trimmed) || local.eq_ignore_ascii_case(trimmed))
        .map(|(_, local)| *local)
        .unwrap_or(trimmed)
}

/// True when two license strings denote the same license after mapping
/// both sides through the equivalence table.
pub fn licenses_equivalent(a: &str, b: &str) -> bool {
    canonical_license(a).eq_ignore_ascii_case(canonical_license(b))
}

/// MakerWorld category id → display name, for diff presentation
const CATEGORIES: &[(i64, &str)] = &[
    (10, "3D Printer Accessories"),
    (20, "Art & Design"),
    (30, "Education"),
    (40, "Fashion"),
    (50, "Gadgets"),
    (60, "Hobby & DIY"),
    (70, "Household"),
    (80, "Miniatures"),
    (90, "Tools"),
    (100, "Toys & Games"),
];

/// Display name for a category id; unknown ids render as the raw number
pub fn category_name(id: i64) -> String {
    CATEGORIES
        .iter()
        .find(|(cid, _)| *cid == id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| id.to_string())
}
