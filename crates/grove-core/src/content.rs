//! Bounded file content reading.
//!
//! The reader never fails: oversized files and read errors come back as
//! marker strings so the builder can store them as observations directly.

use crate::error::ContentReadError;
use std::fs;
use std::path::Path;

/// Appended when content was cut at the character cap.
pub const TRUNCATION_SUFFIX: &str = "... (truncated)";

/// Reads file content under a byte ceiling and a character cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentReader {
    /// Files larger than this are not read at all.
    max_bytes: u64,
    /// Content is cut to this many characters.
    max_chars: usize,
}

impl ContentReader {
    pub fn new(max_bytes: u64, max_chars: usize) -> Self {
        Self {
            max_bytes,
            max_chars,
        }
    }

    /// Returns the file's content, a size marker, or an error marker.
    pub fn read(&self, path: &Path) -> String {
        let size = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) => return error_marker(&ContentReadError::from(e)),
        };

        if size > self.max_bytes {
            return too_large_marker(size);
        }

        match read_utf8(path) {
            Ok(content) => cap_chars(content, self.max_chars),
            Err(e) => error_marker(&e),
        }
    }
}

fn read_utf8(path: &Path) -> Result<String, ContentReadError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8(bytes)?)
}

/// Marker emitted instead of content for files over the byte ceiling.
pub fn too_large_marker(size: u64) -> String {
    format!("File too large ({} bytes)", size)
}

fn error_marker(err: &ContentReadError) -> String {
    format!("Error reading file: {}", err)
}

/// Cuts `content` to `max_chars` characters.
///
/// Reaching the cap exactly also counts as truncated, since a reader that
/// stops at the cap cannot tell whether anything followed.
pub fn cap_chars(mut content: String, max_chars: usize) -> String {
    if content.chars().count() < max_chars {
        return content;
    }

    let end = content
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(content.len());
    content.truncate(end);
    content.push_str(TRUNCATION_SUFFIX);
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_reads_small_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        let reader = ContentReader::new(1024, 100);
        assert_eq!(reader.read(&path), "hello");
    }

    #[test]
    fn test_oversized_file_is_exactly_the_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.txt");
        fs::write(&path, "x".repeat(64)).unwrap();

        let reader = ContentReader::new(10, 1000);
        assert_eq!(reader.read(&path), "File too large (64 bytes)");
    }

    #[test]
    fn test_char_cap_appends_suffix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("long.md");
        fs::write(&path, "abcdefghij").unwrap();

        let reader = ContentReader::new(1024, 4);
        assert_eq!(reader.read(&path), "abcd... (truncated)");
    }

    #[test]
    fn test_cap_reached_exactly_is_marked() {
        assert_eq!(cap_chars("abcd".into(), 4), "abcd... (truncated)");
        assert_eq!(cap_chars("abc".into(), 4), "abc");
    }

    #[test]
    fn test_cap_counts_characters_not_bytes() {
        assert_eq!(cap_chars("héllo".into(), 2), "hé... (truncated)");
    }

    #[test]
    fn test_missing_file_becomes_marker() {
        let dir = tempdir().unwrap();
        let reader = ContentReader::new(1024, 100);

        let out = reader.read(&dir.path().join("nope"));
        assert!(out.starts_with("Error reading file: "));
    }

    #[test]
    fn test_invalid_utf8_becomes_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let reader = ContentReader::new(1024, 100);
        assert!(reader.read(&path).starts_with("Error reading file: "));
    }
}
