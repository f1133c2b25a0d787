//! File naming: URL-derived content hash, name hints, title sanitization.

use sha2::{Digest, Sha256};

/// Content-addressed name for a source URL: first 16 bytes of the SHA-256,
/// hex-encoded. Stable for the lifetime of the task (survives `reset`) and
/// collision-free in practice, so it doubles as a safe fallback file name.
pub fn file_hash(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(&digest[..16])
}

/// Extracts the last path segment from a URL for use as a filename hint.
///
/// Returns `None` if the URL cannot be parsed or the path is empty/root.
pub fn filename_from_url_path(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let path = parsed.path();
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Sanitizes a video title for safe use as a filename.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Collapses consecutive underscores
/// - Limits length to 200 bytes, leaving room for an extension
pub fn sanitize_title(title: &str) -> String {
    const MAX_LEN: usize = 200;

    let mut out = String::with_capacity(title.len());
    let mut prev_underscore = false;

    for c in title.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.' || c == '_');

    if trimmed.len() > MAX_LEN {
        let mut take = MAX_LEN;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}

/// Picks an output file name: the URL path segment when it carries one
/// (it usually has the right extension), else the sanitized title, else
/// the content hash.
pub fn suggest_file_name(title: &str, url: &str, file_hash: &str) -> String {
    if let Some(name) = filename_from_url_path(url) {
        return name;
    }
    let title = sanitize_title(title);
    if !title.is_empty() {
        return title;
    }
    file_hash.to_string()
}
