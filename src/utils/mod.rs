//! Utility functions and helpers

use std::path::Path;

use sha2::{Digest, Sha256};

/// Hash length used in emitted asset filenames. Six characters is enough to
/// keep same-named images from different source directories apart.
pub const ASSET_HASH_LEN: usize = 6;

/// Generate a short content hash for asset filenames.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    hex::encode(&digest[..4])[..ASSET_HASH_LEN].to_string()
}

/// Build a hashed asset filename: `name.<hash6>.ext`.
pub fn hashed_filename(stem: &str, content: &[u8], ext: &str) -> String {
    format!("{}.{}.{}", stem, content_hash(content), ext)
}

/// Normalize a path to a stable, forward-slash module identifier relative to
/// the project root. Module identifiers feed chunk naming and hashing, so
/// they must not depend on the machine the build runs on.
pub fn module_id(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.display().to_string().replace('\\', "/")
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f64();

    if secs >= 1.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.0}ms", secs * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_len() {
        assert_eq!(content_hash(b"hello world").len(), ASSET_HASH_LEN);
    }

    #[test]
    fn test_hashed_filename() {
        let name = hashed_filename("logo", b"bytes", "png");
        let parts: Vec<&str> = name.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "logo");
        assert_eq!(parts[1].len(), ASSET_HASH_LEN);
        assert_eq!(parts[2], "png");
    }

    #[test]
    fn test_module_id_is_root_relative() {
        let root = Path::new("/project");
        let path = Path::new("/project/src/css/public.css");
        assert_eq!(module_id(path, root), "src/css/public.css");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
    }

    #[test]
    fn test_format_duration() {
        use std::time::Duration;

        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs_f64(1.5)), "1.50s");
    }
}
