//! Capability enforcement
//!
//! This module provides:
//! - `Handle`, which checks every operation against its grants
//! - Factories minting handles scoped to the builtin namespaces

mod handle;
mod namespace;

pub use handle::Handle;
pub use namespace::NamespaceFactory;
