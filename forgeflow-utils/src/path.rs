//! ABOUTME: Path normalization helpers — forward-slash, project-relative
//! ABOUTME: paths suitable for lineage events and manifests

use std::path::Path;

/// Replaces backslashes with forward slashes, so paths read the same
/// whether they were produced on a Unix or Windows host.
pub fn to_forward_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Strips `base` off `path` (passing `path` through unchanged if it isn't
/// actually rooted at `base`) and forward-slashes the result. Mirrors
/// `DiscoveryAgent::scan_dir`'s per-entry path normalization.
pub fn normalize_relative(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    to_forward_slash(&rel.to_string_lossy())
}
