//! Core type definitions for AgentFS
//!
//! Logical paths, operations, capability grants and entry metadata shared by
//! the backends, the handle and the domain service.

mod grant;
mod namespace;
mod path;

pub use grant::{effective_ops, is_visible, Grant, Operation};
pub use namespace::Namespace;
pub use path::{validate_path, LogicalPath};

use serde::{Deserialize, Serialize};

/// Metadata describing one logical file
///
/// Produced by backends. Never carries file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMeta {
    pub path: LogicalPath,
    pub size: Option<u64>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl EntryMeta {
    pub fn new(path: LogicalPath, size: u64) -> Self {
        Self {
            path,
            size: Some(size),
            updated_at: Some(chrono::Utc::now()),
        }
    }

    pub fn size_or_zero(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}
