//! Storage backends
//!
//! This module provides:
//! - The `FileSystemBase` contract every storage engine implements
//! - An in-memory backend for ephemeral or sandboxed state
//! - A disk backend mapping the builtin namespaces onto OS directories
//!
//! Backends have no notion of authorization. They trust the `Handle` to have
//! checked every call before delegating.

mod disk;
mod memory;

pub use disk::{default_base_dir, DiskConfig, DiskFileSystem};
pub use memory::MemoryFileSystem;

use crate::error::{Error, Result};
use crate::types::{EntryMeta, Grant, LogicalPath};
use regex::Regex;
use std::collections::BTreeMap;

/// Snapshot of the visible entries, keyed by path
pub type Snapshot = BTreeMap<LogicalPath, EntryMeta>;

/// Contract implemented by any storage engine
#[cfg_attr(test, mockall::automock)]
pub trait FileSystemBase: Send + Sync {
    /// Current metadata for every entry visible under `grants`
    fn snapshot(&self, grants: &[Grant]) -> Result<Snapshot>;

    fn read_binary(&self, path: &LogicalPath) -> Result<Vec<u8>>;

    /// Text content, optionally restricted to lines `[index, index + line)`
    fn read_file(
        &self,
        path: &LogicalPath,
        index: Option<usize>,
        line: Option<usize>,
    ) -> Result<String>;

    /// Regex matches in the file's text, see [`scan_regex`]
    fn read_re(&self, path: &LogicalPath, pattern: &str, overlap: Option<usize>)
        -> Result<Vec<String>>;

    fn write(&self, path: &LogicalPath, data: &[u8], overwrite: bool) -> Result<EntryMeta>;

    fn delete(&self, path: &LogicalPath) -> Result<()>;
}

/// Decode file bytes as text, replacing invalid UTF-8 sequences
pub(crate) fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

/// Reject a zero-length line window
pub(crate) fn check_line_window(line: Option<usize>) -> Result<()> {
    if line == Some(0) {
        return Err(Error::invalid_argument("line", Some("0".to_string())));
    }
    Ok(())
}

/// Lines `[index, index + line)` of `text`, joined with `\n`
///
/// With neither bound set the text is returned untouched.
pub fn slice_lines(text: &str, index: Option<usize>, line: Option<usize>) -> Result<String> {
    check_line_window(line)?;

    if index.is_none() && line.is_none() {
        return Ok(text.to_string());
    }

    let lines = text.lines().skip(index.unwrap_or(0));
    let window: Vec<&str> = match line {
        Some(count) => lines.take(count).collect(),
        None => lines.collect(),
    };

    Ok(window.join("\n"))
}

/// Collect regex matches of `pattern` in `text`
///
/// Without `overlap` this is a plain left-to-right scan of non-overlapping
/// matches. With `overlap`, each search restarts at
/// `match_start + max(1, match_len - overlap)` so consecutive matches can share
/// up to `overlap` bytes.
pub fn scan_regex(text: &str, pattern: &str, overlap: Option<usize>) -> Result<Vec<String>> {
    let re = Regex::new(pattern)?;

    let Some(overlap) = overlap else {
        return Ok(re.find_iter(text).map(|m| m.as_str().to_string()).collect());
    };

    let mut matches = Vec::new();
    let mut pos = 0;

    while pos <= text.len() {
        let Some(m) = re.find_at(text, pos) else {
            break;
        };
        matches.push(m.as_str().to_string());

        let step = m.len().saturating_sub(overlap).max(1);
        pos = m.start() + step;
        while pos < text.len() && !text.is_char_boundary(pos) {
            pos += 1;
        }
    }

    Ok(matches)
}
