//! Disk-backed filesystem mapping each namespace onto an OS directory

use super::{decode_text, scan_regex, slice_lines, FileSystemBase, Snapshot};
use crate::error::{Error, Result};
use crate::types::{is_visible, EntryMeta, Grant, LogicalPath, Namespace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Marker written under `/internal/` when the backend starts
pub const CREATION_MARKER: &str = ".agentfs_created";

/// Name prefix of in-flight temp files; never visible in snapshots
const TMP_PREFIX: &str = ".agentfs-tmp-";

/// Where the disk backend keeps its namespaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskConfig {
    /// Parent for the roots of unconfigured namespaces
    pub base_dir: PathBuf,
    pub internal: Option<PathBuf>,
    pub userinput: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    /// Mount unconfigured namespaces under a new timestamp-named directory
    /// instead of directly under `base_dir`
    #[serde(default)]
    pub fresh_session: bool,
}

impl DiskConfig {
    /// Fresh session: unconfigured namespaces live in `<base>/<timestamp>/<ns>`
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            internal: None,
            userinput: None,
            workspace: None,
            fresh_session: true,
        }
    }

    /// Stable roots at `<base>/<ns>`, shared by every backend opened on them
    pub fn persistent(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            fresh_session: false,
            ..Self::with_base_dir(base_dir)
        }
    }

    fn configured_root(&self, ns: Namespace) -> Option<&PathBuf> {
        match ns {
            Namespace::Internal => self.internal.as_ref(),
            Namespace::Userinput => self.userinput.as_ref(),
            Namespace::Workspace => self.workspace.as_ref(),
        }
    }
}

/// Platform data directory for AgentFS, falling back to the temp dir
pub fn default_base_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("agentfs")
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self::persistent(default_base_dir())
    }
}

/// Filesystem storing each namespace in its own OS directory
#[derive(Debug)]
pub struct DiskFileSystem {
    roots: BTreeMap<Namespace, PathBuf>,
}

impl DiskFileSystem {
    /// Resolve or create the namespace roots and write the creation marker
    pub fn open(config: &DiskConfig) -> Result<Self> {
        let session_dir = if config.fresh_session {
            let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S").to_string();
            config.base_dir.join(stamp)
        } else {
            config.base_dir.clone()
        };
        let mut roots = BTreeMap::new();

        for ns in Namespace::ALL {
            let root = match config.configured_root(ns) {
                Some(root) => root.clone(),
                None => session_dir.join(ns.name()),
            };
            fs::create_dir_all(&root)?;
            info!("Namespace {} mounted at {:?}", ns.prefix(), root);
            roots.insert(ns, root);
        }

        let disk = Self { roots };
        disk.write_marker()?;
        Ok(disk)
    }

    pub fn root(&self, ns: Namespace) -> &Path {
        &self.roots[&ns]
    }

    fn write_marker(&self) -> Result<()> {
        let marker = self.root(Namespace::Internal).join(CREATION_MARKER);
        if !marker.exists() {
            fs::write(&marker, chrono::Utc::now().to_rfc3339())?;
        }
        Ok(())
    }

    /// Translate a logical path into its OS location
    pub fn to_os_path(&self, path: &LogicalPath) -> Result<PathBuf> {
        let ns = Namespace::of(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        let rest = &path.as_str()[ns.prefix().len()..];

        let mut os_path = self.root(ns).to_path_buf();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            os_path.push(segment);
        }
        Ok(os_path)
    }

    /// Like `to_os_path`, but fails with `InvalidPath` when an existing
    /// component below the namespace root is a symbolic link
    fn to_os_path_no_links(&self, path: &LogicalPath) -> Result<PathBuf> {
        let os_path = self.to_os_path(path)?;
        let ns = Namespace::of(path.as_str()).ok_or_else(|| Error::not_found(path.as_str()))?;
        let rel = os_path
            .strip_prefix(self.root(ns))
            .map_err(|_| Error::invalid_path(path.as_str(), "escapes its namespace root"))?;

        let mut current = self.root(ns).to_path_buf();
        for component in rel.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => {
                    warn!("Refusing {}: {:?} is a symbolic link", path, current);
                    return Err(Error::invalid_path(path.as_str(), "traverses a symbolic link"));
                }
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(os_path)
    }

    fn read_bytes(&self, path: &LogicalPath) -> Result<Vec<u8>> {
        let os_path = self.to_os_path(path)?;
        if !os_path.is_file() {
            return Err(Error::not_found(path.as_str()));
        }
        fs::read(&os_path).map_err(|e| io_error(path, e))
    }

    /// Add the visible files of one namespace to `snapshot`
    ///
    /// An unreadable root fails the walk. Errors below the root only skip the
    /// affected entry, since files may vanish while the walk is running.
    fn walk_namespace(&self, ns: Namespace, grants: &[Grant], snapshot: &mut Snapshot) -> Result<()> {
        let root = self.root(ns);

        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(walk_error(e)),
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", ns.prefix(), e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                continue;
            }

            let Some(path) = logical_path_for(ns, root, entry.path()) else {
                warn!("Skipping unrepresentable entry {:?}", entry.path());
                continue;
            };

            if !is_visible(grants, path.as_str()) {
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    warn!("Skipping {}: {}", path, e);
                    continue;
                }
            };

            let meta = EntryMeta {
                path: path.clone(),
                size: Some(metadata.len()),
                updated_at: metadata.modified().ok().map(|t| t.into()),
            };
            snapshot.insert(path, meta);
        }
        Ok(())
    }

    /// Remove now-empty directories between `dir` and its namespace root
    fn prune_empty_parents(&self, ns: Namespace, mut dir: PathBuf) {
        let root = self.root(ns);
        while dir.as_path() != root && dir.starts_with(root) {
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }
}

impl FileSystemBase for DiskFileSystem {
    fn snapshot(&self, grants: &[Grant]) -> Result<Snapshot> {
        let mut snapshot = Snapshot::new();

        for ns in Namespace::ALL {
            if grants.iter().any(|g| g.overlaps(ns.prefix())) {
                self.walk_namespace(ns, grants, &mut snapshot)?;
            }
        }

        debug!("Snapshot holds {} entries", snapshot.len());
        Ok(snapshot)
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
        let os_path = self.to_os_path_no_links(path)?;

        if os_path.is_dir() || (!overwrite && os_path.exists()) {
            return Err(Error::conflict(path.as_str()));
        }

        let parent = os_path
            .parent()
            .ok_or_else(|| Error::not_found(path.as_str()))?
            .to_path_buf();
        fs::create_dir_all(&parent)?;

        let tmp = parent.join(format!("{}{}", TMP_PREFIX, uuid::Uuid::new_v4()));
        fs::write(&tmp, data)?;
        if let Err(e) = fs::rename(&tmp, &os_path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        let metadata = fs::metadata(&os_path)?;
        info!("Wrote {} bytes to {}", metadata.len(), path);

        Ok(EntryMeta {
            path: path.clone(),
            size: Some(metadata.len()),
            updated_at: metadata.modified().ok().map(|t| t.into()),
        })
    }

    fn delete(&self, path: &LogicalPath) -> Result<()> {
        let os_path = self.to_os_path_no_links(path)?;
        if !os_path.is_file() {
            return Err(Error::not_found(path.as_str()));
        }

        fs::remove_file(&os_path).map_err(|e| io_error(path, e))?;
        info!("Deleted {}", path);

        if let (Some(ns), Some(parent)) = (Namespace::of(path.as_str()), os_path.parent()) {
            self.prune_empty_parents(ns, parent.to_path_buf());
        }
        Ok(())
    }
}

fn walk_error(err: walkdir::Error) -> Error {
    let message = err.to_string();
    Error::Io(
        err.into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message)),
    )
}

fn io_error(path: &LogicalPath, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::not_found(path.as_str())
    } else {
        Error::Io(err)
    }
}

/// Logical path of an OS file under a namespace root
fn logical_path_for(ns: Namespace, root: &Path, os_path: &Path) -> Option<LogicalPath> {
    let rel = os_path.strip_prefix(root).ok()?;
    let segments = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    LogicalPath::new(format!("{}{}", ns.prefix(), segments.join("/"))).ok()
}
