//! In-memory backend

use super::{decode_text, scan_regex, slice_lines, FileSystemBase, Snapshot};
use crate::error::{Error, Result};
use crate::types::{is_visible, EntryMeta, Grant, LogicalPath};
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryState {
    content: HashMap<LogicalPath, Vec<u8>>,
    meta: Snapshot,
}

/// Dictionary-backed filesystem for ephemeral state
///
/// Content and metadata live in two maps behind a single lock, so a reader
/// never observes one updated without the other.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_bytes(&self, path: &LogicalPath) -> Result<Vec<u8>> {
        self.state
            .lock()
            .content
            .get(path)
            .cloned()
            .ok_or_else(|| Error::not_found(path.as_str()))
    }
}

impl FileSystemBase for MemoryFileSystem {
    fn snapshot(&self, grants: &[Grant]) -> Result<Snapshot> {
        let state = self.state.lock();
        Ok(state
            .meta
            .iter()
            .filter(|(path, _)| is_visible(grants, path.as_str()))
            .map(|(path, meta)| (path.clone(), meta.clone()))
            .collect())
    }

    fn read_binary(&self, path: &LogicalPath) -> Result<Vec<u8>> {
        self.read_bytes(path)
    }

    fn read_file(
        &self,
        path: &LogicalPath,
        index: Option<usize>,
        line: Option<usize>,
    ) -> Result<String> {
        let text = decode_text(self.read_bytes(path)?);
        slice_lines(&text, index, line)
    }

    fn read_re(
        &self,
        path: &LogicalPath,
        pattern: &str,
        overlap: Option<usize>,
    ) -> Result<Vec<String>> {
        let text = decode_text(self.read_bytes(path)?);
        scan_regex(&text, pattern, overlap)
    }

    fn write(&self, path: &LogicalPath, data: &[u8], overwrite: bool) -> Result<EntryMeta> {
        let mut state = self.state.lock();

        if !overwrite && state.content.contains_key(path) {
            return Err(Error::conflict(path.as_str()));
        }

        let meta = EntryMeta::new(path.clone(), data.len() as u64);
        state.content.insert(path.clone(), data.to_vec());
        state.meta.insert(path.clone(), meta.clone());

        debug!("Stored {} bytes at {}", data.len(), path);
        Ok(meta)
    }

    fn delete(&self, path: &LogicalPath) -> Result<()> {
        let mut state = self.state.lock();

        if state.content.remove(path).is_none() {
            return Err(Error::not_found(path.as_str()));
        }
        state.meta.remove(path);

        debug!("Removed {}", path);
        Ok(())
    }
}
