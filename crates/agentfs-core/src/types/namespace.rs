//! Builtin namespaces

use super::{Grant, LogicalPath, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three fixed top-level prefixes of the logical filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Agent-private scratch space and state
    Internal,
    /// Read-only materials supplied to the agent
    Userinput,
    /// The agent's general work area
    Workspace,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Internal, Namespace::Userinput, Namespace::Workspace];

    pub fn name(&self) -> &'static str {
        match self {
            Namespace::Internal => "internal",
            Namespace::Userinput => "userinput",
            Namespace::Workspace => "workspace",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Internal => "/internal/",
            Namespace::Userinput => "/userinput/",
            Namespace::Workspace => "/workspace/",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.name() == name)
    }

    /// The namespace `path` lives in, if any
    pub fn of(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| path.starts_with(ns.prefix()))
    }

    pub fn default_ops(&self) -> Vec<Operation> {
        let mut ops = vec![Operation::List, Operation::File];
        ops.extend(Operation::READ);
        match self {
            Namespace::Internal => ops.push(Operation::Write),
            Namespace::Userinput => {}
            Namespace::Workspace => ops.extend([Operation::Write, Operation::Delete]),
        }
        ops
    }

    /// The namespace's default grant
    pub fn grant(&self) -> Grant {
        Grant::new(LogicalPath::from_static(self.prefix()), self.default_ops())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_operation_sets() {
        let internal = Namespace::Internal.grant();
        assert!(internal.allows(Operation::Write));
        assert!(!internal.allows(Operation::Delete));

        let userinput = Namespace::Userinput.grant();
        assert!(userinput.allows(Operation::ReadRe));
        assert!(!userinput.allows(Operation::Write));
        assert!(!userinput.allows(Operation::Delete));

        let workspace = Namespace::Workspace.grant();
        for op in Operation::ALL {
            assert!(workspace.allows(op), "workspace should allow {op}");
        }
    }

    #[test]
    fn test_prefixes_are_logical_paths() {
        for ns in Namespace::ALL {
            assert!(crate::types::validate_path(ns.prefix()).is_ok());
            assert_eq!(ns.grant().prefix().as_str(), ns.prefix());
        }
    }

    #[test]
    fn test_classify_paths() {
        assert_eq!(Namespace::of("/internal/state.json"), Some(Namespace::Internal));
        assert_eq!(Namespace::of("/userinput/"), Some(Namespace::Userinput));
        assert_eq!(Namespace::of("/workspaces/x"), None);
        assert_eq!(Namespace::of("/workspace"), None);
        assert_eq!(Namespace::from_name("workspace"), Some(Namespace::Workspace));
        assert_eq!(Namespace::from_name("home"), None);
    }
}
