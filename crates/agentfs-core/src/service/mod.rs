//! Domain policy layer over a single handle
//!
//! This module provides:
//! - `DomainPolicy`, business rules layered above capability grants
//! - `DomainService`, the read/list/search/edit surface exposed to tools
//!
//! Grants decide what a handle *can* do. The policy decides what the domain
//! *allows* on top of that, so a userinput write can be refused here even when
//! the handle's own grant would permit it.

mod edit;
mod listing;

pub use edit::{EditOperation, EditResult};
pub use listing::{DirEntry, DirectoryListing, EntryKind, SizedEntry, SortBy, TreeNode};

use crate::error::{Error, Result};
use crate::sandbox::Handle;
use crate::types::{EntryMeta, LogicalPath, Namespace, Operation};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Business rules consumed by `DomainService`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainPolicy {
    pub allow_write_userinput: bool,
    pub allow_edit_userinput: bool,
    pub allow_delete_internal: bool,
    pub allow_delete_workspace: bool,
    pub max_lines: Option<usize>,
    pub max_bytes: Option<usize>,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self {
            allow_write_userinput: false,
            allow_edit_userinput: false,
            allow_delete_internal: false,
            allow_delete_workspace: true,
            max_lines: None,
            max_bytes: None,
        }
    }
}

/// Outcome of one item in a batch read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReadResult {
    pub path: String,
    pub content: Option<String>,
    pub error: Option<String>,
}

impl FileReadResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Metadata reported by `get_file_info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub path: LogicalPath,
    pub name: String,
    pub size: Option<u64>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub mime_type: String,
}

/// A grant prefix and the operations it carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedDirectory {
    pub prefix: LogicalPath,
    pub operations: Vec<Operation>,
}

/// Binary file content encoded for transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub path: LogicalPath,
    pub mime_type: String,
    pub data: String,
}

/// Policy and ergonomics over exactly one handle
#[derive(Debug)]
pub struct DomainService {
    handle: Handle,
    policy: DomainPolicy,
}

impl DomainService {
    pub fn new(handle: Handle, policy: DomainPolicy) -> Self {
        Self { handle, policy }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    fn deny(path: &LogicalPath, op: Operation, reason: &str) -> Error {
        warn!("Policy denied {} on {}: {}", op, path, reason);
        Error::access_denied(path.as_str(), op)
    }

    /// Read text starting at 1-based `start_line`, then apply the policy's
    /// line and byte limits
    pub fn read_text_file(
        &self,
        path: &str,
        start_line: usize,
        read_lines: Option<usize>,
    ) -> Result<String> {
        let path = LogicalPath::new(path)?;
        if start_line == 0 {
            return Err(Error::invalid_argument("start_line", Some("0".to_string())));
        }

        let index = if start_line == 1 && read_lines.is_none() {
            None
        } else {
            Some(start_line - 1)
        };
        let text = self.handle.read_file(&path, index, read_lines)?;
        Ok(self.apply_read_limits(text))
    }

    fn apply_read_limits(&self, mut text: String) -> String {
        let mut notes = Vec::new();

        if let Some(max) = self.policy.max_lines {
            if text.lines().count() > max {
                text = text.lines().take(max).collect::<Vec<_>>().join("\n");
                notes.push(format!("[... truncated: showing first {} lines]", max));
            }
        }

        if let Some(max) = self.policy.max_bytes {
            if text.len() > max {
                let mut cut = max;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
                notes.push(format!("[... truncated: exceeded {} bytes]", max));
            }
        }

        for note in notes {
            text.push('\n');
            text.push_str(&note);
        }
        text
    }

    /// Read several files; a failing item never aborts the batch
    pub fn read_multiple_files<S: AsRef<str>>(&self, paths: &[S]) -> Vec<FileReadResult> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                match self.read_text_file(path, 1, None) {
                    Ok(content) => FileReadResult {
                        path: path.to_string(),
                        content: Some(content),
                        error: None,
                    },
                    Err(e) => FileReadResult {
                        path: path.to_string(),
                        content: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect()
    }

    pub fn get_file_info(&self, path: &str) -> Result<FileInfo> {
        let meta = self.handle.file(path)?;
        let mime_type = mime_guess::from_path(meta.path.name())
            .first_or_octet_stream()
            .to_string();

        Ok(FileInfo {
            name: meta.path.name().to_string(),
            path: meta.path,
            size: meta.size,
            updated_at: meta.updated_at,
            mime_type,
        })
    }

    pub fn list_allowed_directories(&self) -> Vec<AllowedDirectory> {
        let mut dirs: Vec<AllowedDirectory> = self
            .handle
            .grants()
            .iter()
            .map(|g| AllowedDirectory {
                prefix: g.prefix().clone(),
                operations: g.ops().iter().copied().collect(),
            })
            .collect();
        dirs.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        dirs
    }

    pub fn read_media_file(&self, path: &str) -> Result<MediaFile> {
        let path = LogicalPath::new(path)?;
        let bytes = self.handle.read_binary(&path)?;
        let mime_type = mime_guess::from_path(path.name())
            .first_or_octet_stream()
            .to_string();

        Ok(MediaFile {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            path,
            mime_type,
        })
    }

    /// Overwrite `path` with `content`, subject to the userinput write rule
    pub fn write_file(&self, path: &str, content: &str) -> Result<EntryMeta> {
        let path = LogicalPath::new(path)?;
        if Namespace::of(path.as_str()) == Some(Namespace::Userinput)
            && !self.policy.allow_write_userinput
        {
            return Err(Self::deny(&path, Operation::Write, "userinput is read-only"));
        }

        let meta = self.handle.write(&path, content, true)?;
        info!("write_file {} ({} bytes)", path, content.len());
        Ok(meta)
    }

    /// Delete `path`, subject to the per-namespace delete rules
    pub fn delete_file(&self, path: &str) -> Result<()> {
        let path = LogicalPath::new(path)?;
        let allowed = match Namespace::of(path.as_str()) {
            Some(Namespace::Internal) => self.policy.allow_delete_internal,
            Some(Namespace::Workspace) => self.policy.allow_delete_workspace,
            Some(Namespace::Userinput) => false,
            None => true,
        };
        if !allowed {
            return Err(Self::deny(&path, Operation::Delete, "namespace delete disabled"));
        }

        self.handle.delete(&path)
    }

    /// Apply literal replacements in order; with `dry_run` only the diff is
    /// produced
    pub fn edit_file(
        &self,
        path: &str,
        edits: &[EditOperation],
        dry_run: bool,
    ) -> Result<EditResult> {
        let path = LogicalPath::new(path)?;
        if Namespace::of(path.as_str()) == Some(Namespace::Userinput)
            && !self.policy.allow_edit_userinput
        {
            return Err(Self::deny(&path, Operation::Write, "userinput is read-only"));
        }

        let original = String::from_utf8(self.handle.read_binary(&path)?).map_err(|e| {
            Error::invalid_argument(
                "path",
                Some(format!("{} is not valid UTF-8 text: {}", path, e.utf8_error())),
            )
        })?;
        let modified = edit::apply_edits(&original, edits)?;
        let diff = edit::unified_diff(&path, &original, &modified);

        if dry_run {
            debug!("edit_file {} dry run", path);
            return Ok(EditResult {
                diff,
                lines_changed: 0,
                changed: false,
                dry_run: true,
            });
        }

        let changed = modified != original;
        let lines_changed = if changed {
            self.handle.write(&path, &modified, true)?;
            edit::count_changed_lines(&original, &modified)
        } else {
            0
        };

        info!("edit_file {} ({} lines changed)", path, lines_changed);
        Ok(EditResult {
            diff,
            lines_changed,
            changed,
            dry_run: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryFileSystem;
    use crate::error::FsError;
    use crate::sandbox::NamespaceFactory;
    use crate::types::Grant;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn service_with(policy: DomainPolicy) -> DomainService {
        let factory = NamespaceFactory::new(Arc::new(MemoryFileSystem::new()));
        DomainService::new(factory.create_full_handle(), policy)
    }

    fn service() -> DomainService {
        service_with(DomainPolicy::default())
    }

    fn is_denied(err: &Error) -> bool {
        matches!(err.as_fs(), Some(FsError::AccessDenied { .. }))
    }

    #[test]
    fn test_read_text_file_windows() {
        let svc = service();
        svc.write_file("/workspace/hello.txt", "foo a\nbar b\nfoo c\n").unwrap();

        assert_eq!(svc.read_text_file("/workspace/hello.txt", 1, None).unwrap(), "foo a\nbar b\nfoo c\n");
        assert_eq!(svc.read_text_file("/workspace/hello.txt", 2, Some(1)).unwrap(), "bar b");
        assert_eq!(svc.read_text_file("/workspace/hello.txt", 2, None).unwrap(), "bar b\nfoo c");

        let err = svc.read_text_file("/workspace/hello.txt", 0, None).unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { .. })));
    }

    #[test]
    fn test_read_limits() {
        let svc = service_with(DomainPolicy {
            max_lines: Some(2),
            ..DomainPolicy::default()
        });
        svc.write_file("/workspace/long.txt", "1\n2\n3\n4").unwrap();
        assert_eq!(
            svc.read_text_file("/workspace/long.txt", 1, None).unwrap(),
            "1\n2\n[... truncated: showing first 2 lines]"
        );

        let svc = service_with(DomainPolicy {
            max_bytes: Some(4),
            ..DomainPolicy::default()
        });
        svc.write_file("/workspace/wide.txt", "abcdefgh").unwrap();
        assert_eq!(
            svc.read_text_file("/workspace/wide.txt", 1, None).unwrap(),
            "abcd\n[... truncated: exceeded 4 bytes]"
        );

        svc.write_file("/workspace/utf8.txt", "aéé").unwrap();
        let text = svc.read_text_file("/workspace/utf8.txt", 1, None).unwrap();
        assert!(text.starts_with("aé\n"));
    }

    #[test]
    fn test_read_multiple_files_reports_per_item() {
        let svc = service();
        svc.write_file("/workspace/a.txt", "a").unwrap();

        let results = svc.read_multiple_files(&["/workspace/a.txt", "/workspace/missing.txt", "bad"]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].content.as_deref(), Some("a"));
        assert!(results[1].error.as_deref().unwrap().contains("Not found"));
        assert!(!results[2].is_ok());
    }

    #[test]
    fn test_userinput_write_gated_by_policy() {
        // The grant permits the write; the policy still refuses it.
        let backend = Arc::new(MemoryFileSystem::new());
        let handle = Handle::new(backend, vec![Grant::new(LogicalPath::new("/").unwrap(), Operation::ALL)]);
        let svc = DomainService::new(handle, DomainPolicy::default());
        let err = svc.write_file("/userinput/brief.md", "x").unwrap_err();
        assert!(is_denied(&err));

        let svc = service_with(DomainPolicy {
            allow_write_userinput: true,
            ..DomainPolicy::default()
        });
        // Policy allows it, but the default userinput grant does not.
        let err = svc.write_file("/userinput/brief.md", "x").unwrap_err();
        assert!(is_denied(&err));
    }

    #[test]
    fn test_delete_rules() {
        let svc = service();
        svc.write_file("/workspace/a.txt", "a").unwrap();
        svc.write_file("/internal/state.json", "{}").unwrap();

        svc.delete_file("/workspace/a.txt").unwrap();
        assert!(is_denied(&svc.delete_file("/internal/state.json").unwrap_err()));
        assert!(is_denied(&svc.delete_file("/userinput/a.txt").unwrap_err()));

        let svc = service_with(DomainPolicy {
            allow_delete_workspace: false,
            ..DomainPolicy::default()
        });
        svc.write_file("/workspace/a.txt", "a").unwrap();
        assert!(is_denied(&svc.delete_file("/workspace/a.txt").unwrap_err()));
    }

    #[test]
    fn test_get_file_info_and_media() {
        let svc = service();
        svc.write_file("/workspace/notes.md", "# hi").unwrap();

        let info = svc.get_file_info("/workspace/notes.md").unwrap();
        assert_eq!(info.name, "notes.md");
        assert_eq!(info.size, Some(4));
        assert_eq!(info.mime_type, "text/markdown");

        let media = svc.read_media_file("/workspace/notes.md").unwrap();
        assert_eq!(media.data, "IyBoaQ==");
    }

    #[test]
    fn test_list_allowed_directories() {
        let svc = service();
        let dirs = svc.list_allowed_directories();
        let prefixes: Vec<_> = dirs.iter().map(|d| d.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["/internal/", "/userinput/", "/workspace/"]);
        assert!(!dirs[1].operations.contains(&Operation::Write));
        assert_eq!(dirs[2].operations.len(), Operation::ALL.len());
    }

    #[test]
    fn test_edit_dry_run_leaves_file_unchanged() {
        let svc = service();
        svc.write_file("/workspace/doc.txt", "alpha\nbeta\ngamma\n").unwrap();

        let edits = vec![EditOperation::new("beta", "BETA")];
        let result = svc.edit_file("/workspace/doc.txt", &edits, true).unwrap();
        assert!(result.dry_run);
        assert_eq!(result.lines_changed, 0);
        assert!(result.diff.contains("-beta"));
        assert!(result.diff.contains("+BETA"));
        assert_eq!(
            svc.read_text_file("/workspace/doc.txt", 1, None).unwrap(),
            "alpha\nbeta\ngamma\n"
        );
    }

    #[test]
    fn test_edit_applies_in_order() {
        let svc = service();
        svc.write_file("/workspace/doc.txt", "one two\nthree\n").unwrap();

        let edits = vec![
            EditOperation::new("one", "uno"),
            EditOperation::new("uno two", "uno dos"),
        ];
        let result = svc.edit_file("/workspace/doc.txt", &edits, false).unwrap();
        assert!(result.changed);
        assert_eq!(result.lines_changed, 1);
        assert_eq!(
            svc.read_text_file("/workspace/doc.txt", 1, None).unwrap(),
            "uno dos\nthree\n"
        );

        let noop = vec![EditOperation::new("three", "three")];
        let result = svc.edit_file("/workspace/doc.txt", &noop, false).unwrap();
        assert!(!result.changed);
        assert_eq!(result.diff, "(no changes)");
    }

    #[test]
    fn test_edit_rejects_bad_specs_and_userinput() {
        let svc = service();
        svc.write_file("/workspace/doc.txt", "text").unwrap();

        let err = svc
            .edit_file("/workspace/doc.txt", &[EditOperation::new("absent", "x")], false)
            .unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { .. })));

        let err = svc.edit_file("/workspace/doc.txt", &[], false).unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { .. })));

        let err = svc
            .edit_file("/userinput/doc.txt", &[EditOperation::new("a", "b")], true)
            .unwrap_err();
        assert!(is_denied(&err));
    }

    #[test]
    fn test_edit_refuses_non_utf8_content() {
        let svc = service();
        let bytes = vec![b'a', 0xff, b'b'];
        svc.handle().write("/workspace/blob.bin", &bytes, true).unwrap();

        let err = svc
            .edit_file("/workspace/blob.bin", &[EditOperation::new("a", "z")], false)
            .unwrap_err();
        assert!(matches!(
            err.as_fs(),
            Some(FsError::InvalidArgument { argument, .. }) if argument == "path"
        ));
        assert_eq!(svc.handle().read_binary("/workspace/blob.bin").unwrap(), bytes);
    }
}
