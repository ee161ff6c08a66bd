//! AgentFS Core Library
//!
//! This crate provides a logical filesystem for agents, including:
//! - Validated logical paths and prefix-based capability grants
//! - Pluggable storage backends (in-memory and on-disk)
//! - Capability-checked handles over the three builtin namespaces
//! - A domain service and tool registry for model-facing operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      agentfs-core                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  tools/        - Tool schemas, service-bound dispatch       │
//! │  service/      - Policy, listings, edits, media             │
//! │  sandbox/      - Handles and namespace factory              │
//! │  backend/      - Storage trait, memory and disk engines     │
//! │  types/        - Paths, grants, namespaces                  │
//! │  config.rs     - Settings and service assembly              │
//! │  error.rs      - Error types                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod sandbox;
pub mod service;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use error::{Error, FsError, Result};
pub use types::*;

pub use backend::{
    default_base_dir, DiskConfig, DiskFileSystem, FileSystemBase, MemoryFileSystem, Snapshot,
};
pub use config::{FsSettings, StorageConfig};
pub use sandbox::{Handle, NamespaceFactory};
pub use service::{
    DirEntry, DirectoryListing, DomainPolicy, DomainService, EditOperation, EditResult, SortBy,
    TreeNode,
};
pub use tools::{ToolRegistry, ToolSpec};
