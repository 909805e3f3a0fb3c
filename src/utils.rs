//! Small helpers for log output and the report directory.

use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended. Cuts on a character boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a marker file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Creating a directory can succeed where creating files inside it fails.
    let marker = format!("{}/.hn_tweet_agent_write_check", path.trim_end_matches('/'));
    stdfs::File::create(&marker)?;
    let _ = stdfs::remove_file(&marker);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let result = truncate_for_log("ééé", 1);
        assert_eq!(result, "é…(+4 bytes)");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b");
        let nested = nested.to_str().unwrap();

        ensure_writable_dir(nested).await.unwrap();
        assert!(std::path::Path::new(nested).is_dir());
        let leftovers = std::fs::read_dir(nested).unwrap().count();
        assert_eq!(leftovers, 0, "write check must clean up after itself");
    }
}
