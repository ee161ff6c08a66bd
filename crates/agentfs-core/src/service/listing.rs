//! Directory views derived from flat file listings
//!
//! The logical filesystem only stores files. Directories are implied by the
//! path segments between a listing prefix and each file.

use super::DomainService;
use crate::error::{Error, Result};
use crate::types::{EntryMeta, LogicalPath};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Dir,
    File,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Dir => f.write_str("[DIR]"),
            EntryKind::File => f.write_str("[FILE]"),
        }
    }
}

/// Immediate child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Immediate child with the total size of every file beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Size,
}

impl FromStr for SortBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(SortBy::Name),
            "size" => Ok(SortBy::Size),
            other => Err(Error::invalid_argument("sort_by", Some(other.to_string()))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryListing {
    pub entries: Vec<SizedEntry>,
    pub file_count: usize,
    pub dir_count: usize,
    pub total_size: u64,
}

impl DirectoryListing {
    pub fn summary(&self) -> String {
        format!(
            "Total: {} files, {} directories, {} combined",
            self.file_count,
            self.dir_count,
            format_size(self.total_size)
        )
    }
}

impl fmt::Display for DirectoryListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{:<6} {:<30} {:>10}", entry.kind.to_string(), entry.name, format_size(entry.size))?;
        }
        if !self.entries.is_empty() {
            writeln!(f)?;
        }
        f.write_str(&self.summary())
    }
}

/// Node of a `directory_tree` result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<TreeNode>>,
}

/// Human-readable byte count
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.2} {}", value, unit)
}

/// First segment of `path` below `dir`, and whether more segments follow
fn child_of<'a>(dir: &LogicalPath, path: &'a LogicalPath) -> Option<(&'a str, EntryKind)> {
    let rest = path.as_str().strip_prefix(dir.as_str())?;
    match rest.split_once('/') {
        Some((head, _)) => Some((head, EntryKind::Dir)),
        None if rest.is_empty() => None,
        None => Some((rest, EntryKind::File)),
    }
}

#[derive(Default)]
struct TreeBuilder {
    children: BTreeMap<String, TreeBuilder>,
    is_file: bool,
}

impl TreeBuilder {
    fn insert(&mut self, segments: &[&str]) {
        if let Some((first, rest)) = segments.split_first() {
            let child = self.children.entry(first.to_string()).or_default();
            if rest.is_empty() {
                child.is_file = true;
            } else {
                child.insert(rest);
            }
        }
    }

    fn into_nodes(self) -> Vec<TreeNode> {
        self.children
            .into_iter()
            .map(|(name, node)| {
                if node.is_file && node.children.is_empty() {
                    TreeNode {
                        name,
                        kind: EntryKind::File,
                        children: None,
                    }
                } else {
                    TreeNode {
                        name,
                        kind: EntryKind::Dir,
                        children: Some(node.into_nodes()),
                    }
                }
            })
            .collect()
    }
}

impl DomainService {
    fn list_under(&self, path: &str) -> Result<(LogicalPath, Vec<EntryMeta>)> {
        let dir = LogicalPath::new(path)?.as_dir();
        let entries = self.handle().list(Some(dir.as_str()))?;
        Ok((dir, entries))
    }

    /// Immediate children of `path`, sorted and deduplicated
    pub fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        let (dir, entries) = self.list_under(path)?;

        let mut children: BTreeMap<&str, EntryKind> = BTreeMap::new();
        for meta in &entries {
            if let Some((name, kind)) = child_of(&dir, &meta.path) {
                let slot = children.entry(name).or_insert(kind);
                if kind == EntryKind::Dir {
                    *slot = EntryKind::Dir;
                }
            }
        }

        debug!("list_directory {} -> {} children", dir, children.len());
        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry {
                name: name.to_string(),
                kind,
            })
            .collect())
    }

    /// Immediate children of `path` with aggregated descendant sizes
    pub fn list_directory_with_sizes(&self, path: &str, sort_by: SortBy) -> Result<DirectoryListing> {
        let (dir, entries) = self.list_under(path)?;

        let mut children: BTreeMap<&str, (EntryKind, u64)> = BTreeMap::new();
        for meta in &entries {
            if let Some((name, kind)) = child_of(&dir, &meta.path) {
                let slot = children.entry(name).or_insert((kind, 0));
                if kind == EntryKind::Dir {
                    slot.0 = EntryKind::Dir;
                }
                slot.1 += meta.size_or_zero();
            }
        }

        let mut sized: Vec<SizedEntry> = children
            .into_iter()
            .map(|(name, (kind, size))| SizedEntry {
                name: name.to_string(),
                kind,
                size,
            })
            .collect();

        match sort_by {
            SortBy::Name => sized.sort_by(|a, b| match (a.kind, b.kind) {
                (EntryKind::Dir, EntryKind::File) => Ordering::Less,
                (EntryKind::File, EntryKind::Dir) => Ordering::Greater,
                _ => a.name.cmp(&b.name),
            }),
            SortBy::Size => sized.sort_by(|a, b| {
                (a.kind == EntryKind::File, a.size, &a.name).cmp(&(b.kind == EntryKind::File, b.size, &b.name))
            }),
        }

        let file_count = sized.iter().filter(|e| e.kind == EntryKind::File).count();
        Ok(DirectoryListing {
            file_count,
            dir_count: sized.len() - file_count,
            total_size: sized.iter().map(|e| e.size).sum(),
            entries: sized,
        })
    }

    /// Files under `path` whose name matches `pattern` as a glob or contains
    /// it, minus names matching any of `exclude_patterns`
    pub fn search_files(
        &self,
        path: &str,
        pattern: &str,
        exclude_patterns: &[String],
    ) -> Result<Vec<LogicalPath>> {
        let (_, entries) = self.list_under(path)?;

        let include = glob::Pattern::new(pattern).ok();
        let excludes = exclude_patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| Error::invalid_argument("exclude_patterns", Some(format!("{}: {}", p, e))))
            })
            .collect::<Result<Vec<_>>>()?;

        let hits: Vec<LogicalPath> = entries
            .into_iter()
            .map(|meta| meta.path)
            .filter(|path| {
                let name = path.name();
                let included = include.as_ref().is_some_and(|g| g.matches(name)) || name.contains(pattern);
                included && !excludes.iter().any(|g| g.matches(name))
            })
            .collect();

        debug!("search_files {} {:?} -> {} hits", path, pattern, hits.len());
        Ok(hits)
    }

    /// Nested view of everything under `path`
    pub fn directory_tree(&self, path: &str) -> Result<Vec<TreeNode>> {
        let (dir, entries) = self.list_under(path)?;

        let mut root = TreeBuilder::default();
        for meta in &entries {
            if let Some(rest) = meta.path.as_str().strip_prefix(dir.as_str()) {
                let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
                root.insert(&segments);
            }
        }
        Ok(root.into_nodes())
    }
}
