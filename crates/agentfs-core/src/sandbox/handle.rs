//! Capability-checked access to a backend

use crate::backend::{check_line_window, FileSystemBase, Snapshot};
use crate::error::{Error, Result};
use crate::types::{EntryMeta, Grant, LogicalPath, Operation};
use parking_lot::Mutex;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The object through which every filesystem operation is performed
///
/// Each call validates the path, checks the grants for the requested
/// operation and only then touches the backend. Existence-dependent calls
/// refresh the metadata snapshot first; the snapshot is never consulted for
/// authorization.
pub struct Handle {
    backend: Arc<dyn FileSystemBase>,
    grants: Vec<Grant>,
    index: Mutex<Snapshot>,
}

impl Handle {
    pub fn new(backend: Arc<dyn FileSystemBase>, grants: Vec<Grant>) -> Self {
        Self {
            backend,
            grants,
            index: Mutex::new(Snapshot::new()),
        }
    }

    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn backend(&self) -> &Arc<dyn FileSystemBase> {
        &self.backend
    }

    /// Whether any grant covering `path` carries `op`
    pub fn permits(&self, path: &str, op: Operation) -> bool {
        self.grants.iter().any(|g| g.covers(path) && g.allows(op))
    }

    fn authorize(&self, path: &LogicalPath, op: Operation) -> Result<()> {
        if self.permits(path.as_str(), op) {
            return Ok(());
        }
        warn!("Denied {} on {}", op, path);
        Err(Error::access_denied(path.as_str(), op))
    }

    fn refresh(&self) -> Result<()> {
        let snapshot = self.backend.snapshot(&self.grants)?;
        *self.index.lock() = snapshot;
        Ok(())
    }

    fn lookup(&self, path: &LogicalPath) -> Option<EntryMeta> {
        self.index.lock().get(path).cloned()
    }

    /// Refresh the snapshot and fail with `NotFound` unless `path` is in it
    fn require_existing(&self, path: &LogicalPath) -> Result<EntryMeta> {
        self.refresh()?;
        self.lookup(path).ok_or_else(|| Error::not_found(path.as_str()))
    }

    /// Entries under `prefix`, or every entry visible under any grant when
    /// `prefix` is omitted. Sorted by path.
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<EntryMeta>> {
        let prefix = match prefix {
            Some(prefix) => {
                let prefix = LogicalPath::new(prefix)?;
                self.authorize(&prefix, Operation::List)?;
                Some(prefix)
            }
            None => {
                if !self.grants.iter().any(|g| g.allows(Operation::List)) {
                    warn!("Denied unscoped list");
                    return Err(Error::access_denied("/", Operation::List));
                }
                None
            }
        };

        self.refresh()?;
        let index = self.index.lock();
        let entries: Vec<EntryMeta> = index
            .values()
            .filter(|meta| {
                prefix
                    .as_ref()
                    .map_or(true, |prefix| meta.path.starts_with(prefix.as_str()))
            })
            .cloned()
            .collect();

        debug!("Listed {} entries under {:?}", entries.len(), prefix.as_ref().map(|p| p.as_str()));
        Ok(entries)
    }

    pub fn file(&self, path: impl AsRef<str>) -> Result<EntryMeta> {
        let path = LogicalPath::new(path.as_ref())?;
        self.authorize(&path, Operation::File)?;
        self.require_existing(&path)
    }

    pub fn read_binary(&self, path: impl AsRef<str>) -> Result<Vec<u8>> {
        let path = LogicalPath::new(path.as_ref())?;
        self.authorize(&path, Operation::ReadBinary)?;
        self.require_existing(&path)?;

        debug!("read_binary {}", path);
        self.backend.read_binary(&path)
    }

    /// Text of `path`, restricted to lines `[index, index + line)` when given
    pub fn read_file(
        &self,
        path: impl AsRef<str>,
        index: Option<usize>,
        line: Option<usize>,
    ) -> Result<String> {
        let path = LogicalPath::new(path.as_ref())?;
        self.authorize(&path, Operation::ReadFile)?;
        check_line_window(line)?;
        self.require_existing(&path)?;

        debug!("read_file {} index={:?} line={:?}", path, index, line);
        self.backend.read_file(&path, index, line)
    }

    pub fn read_re(
        &self,
        path: impl AsRef<str>,
        pattern: &str,
        overlap: Option<usize>,
    ) -> Result<Vec<String>> {
        let path = LogicalPath::new(path.as_ref())?;
        self.authorize(&path, Operation::ReadRe)?;
        Regex::new(pattern)?;
        self.require_existing(&path)?;

        debug!("read_re {} pattern={:?} overlap={:?}", path, pattern, overlap);
        self.backend.read_re(&path, pattern, overlap)
    }

    pub fn write(
        &self,
        path: impl AsRef<str>,
        data: impl AsRef<[u8]>,
        overwrite: bool,
    ) -> Result<EntryMeta> {
        let path = LogicalPath::new(path.as_ref())?;
        if path.is_dir_like() {
            return Err(Error::invalid_path(path.as_str(), "names a directory"));
        }
        self.authorize(&path, Operation::Write)?;

        self.refresh()?;
        if !overwrite && self.lookup(&path).is_some() {
            return Err(Error::conflict(path.as_str()));
        }

        let meta = self.backend.write(&path, data.as_ref(), overwrite)?;
        self.index.lock().insert(path.clone(), meta.clone());

        info!("write {} ({} bytes)", path, meta.size_or_zero());
        Ok(meta)
    }

    pub fn delete(&self, path: impl AsRef<str>) -> Result<()> {
        let path = LogicalPath::new(path.as_ref())?;
        self.authorize(&path, Operation::Delete)?;
        self.require_existing(&path)?;

        self.backend.delete(&path)?;
        self.index.lock().remove(&path);

        info!("delete {}", path);
        Ok(())
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle").field("grants", &self.grants).finish_non_exhaustive()
    }
}
