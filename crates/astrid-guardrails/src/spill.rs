//! Content-addressed spill: writing data too large to inline out to disk
//! under a deterministic, retry-safe path (spec §4.9, §6 `spill_dir`).

use std::io::Write as _;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Sanitize a label for use as a path segment: characters outside
/// `[a-zA-Z0-9_\-:.]` become `_`, capped at 80 bytes.
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.chars().take(80).collect()
}

/// sha256 of `bytes`, lowercase hex.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Extension used for a spill file: `image/*` mime types map to their
/// conventional extension, everything else (including text spills) is
/// `txt`/`bin` per the caller's `is_image` flag.
#[must_use]
pub fn extension_for(mime: Option<&str>, is_image: bool) -> &'static str {
    if !is_image {
        return "txt";
    }
    match mime {
        Some("image/png") => "png",
        Some("image/jpeg") => "jpg",
        Some("image/webp") => "webp",
        _ => "bin",
    }
}

/// Write `bytes` under `<spill_root>/<sanitized_label>/<sha256>.<ext>`,
/// content-addressed and create-if-absent: an existing file with the same
/// sha is never overwritten, so retries are safe and idempotent.
///
/// # Errors
///
/// Returns an error message if the directory or file could not be created.
pub fn spill_write(spill_root: &Path, label: &str, ext: &str, bytes: &[u8]) -> Result<(PathBuf, String), String> {
    let dir = spill_root.join(sanitize_label(label));
    std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    let sha = sha256_hex(bytes);
    let path = dir.join(format!("{sha}.{ext}"));
    if path.exists() {
        return Ok((path, sha));
    }
    // create_new fails if another writer raced us to the same path; since
    // the content (and thus the name) is identical, that's success too.
    match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(mut file) => {
            file.write_all(bytes).map_err(|e| e.to_string())?;
            Ok((path, sha))
        },
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok((path, sha)),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_and_caps_label() {
        let label = "weird/label with spaces!".repeat(5);
        let out = sanitize_label(&label);
        assert!(out.len() <= 80);
        assert!(!out.contains(' '));
        assert!(!out.contains('/'));
    }

    #[test]
    fn write_is_idempotent_and_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let (path1, sha1) = spill_write(dir.path(), "tool:fetch", "txt", b"hello").unwrap();
        let (path2, sha2) = spill_write(dir.path(), "tool:fetch", "txt", b"hello").unwrap();
        assert_eq!(path1, path2);
        assert_eq!(sha1, sha2);
        assert_eq!(std::fs::read_to_string(&path1).unwrap(), "hello");
    }

    #[test]
    fn different_content_different_path() {
        let dir = tempfile::tempdir().unwrap();
        let (p1, _) = spill_write(dir.path(), "l", "txt", b"a").unwrap();
        let (p2, _) = spill_write(dir.path(), "l", "txt", b"b").unwrap();
        assert_ne!(p1, p2);
    }
}
