//! Operations and capability grants

use super::LogicalPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// File operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    File,
    ReadBinary,
    ReadFile,
    ReadRe,
    Write,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::List,
        Operation::File,
        Operation::ReadBinary,
        Operation::ReadFile,
        Operation::ReadRe,
        Operation::Write,
        Operation::Delete,
    ];

    /// The three read flavours
    pub const READ: [Operation; 3] = [
        Operation::ReadBinary,
        Operation::ReadFile,
        Operation::ReadRe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::File => "file",
            Operation::ReadBinary => "read_binary",
            Operation::ReadFile => "read_file",
            Operation::ReadRe => "read_re",
            Operation::Write => "write",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authority record: `ops` are permitted on any path starting with `prefix`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    prefix: LogicalPath,
    ops: BTreeSet<Operation>,
}

impl Grant {
    pub fn new(prefix: LogicalPath, ops: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            prefix,
            ops: ops.into_iter().collect(),
        }
    }

    pub fn prefix(&self) -> &LogicalPath {
        &self.prefix
    }

    pub fn ops(&self) -> &BTreeSet<Operation> {
        &self.ops
    }

    /// Whether this grant's prefix covers `path`
    pub fn covers(&self, path: &str) -> bool {
        path.starts_with(self.prefix.as_str())
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.ops.contains(&op)
    }

    /// Whether this grant could make anything under `prefix` visible
    ///
    /// True when either prefix contains the other, so a grant on `/` overlaps
    /// every namespace and a grant on `/workspace/docs/` overlaps `/workspace/`.
    pub fn overlaps(&self, prefix: &str) -> bool {
        self.covers(prefix) || self.prefix.starts_with(prefix)
    }
}

/// Union of the operations granted on `path` by every covering grant
pub fn effective_ops(grants: &[Grant], path: &str) -> BTreeSet<Operation> {
    grants
        .iter()
        .filter(|g| g.covers(path))
        .flat_map(|g| g.ops.iter().copied())
        .collect()
}

/// Whether `path` is visible under at least one grant
pub fn is_visible(grants: &[Grant], path: &str) -> bool {
    grants.iter().any(|g| g.covers(path))
}
