//! Handle factories for the builtin namespaces

use super::Handle;
use crate::backend::FileSystemBase;
use crate::error::{Error, Result};
use crate::types::{Grant, Namespace};
use std::sync::Arc;
use tracing::debug;

/// Mints handles over one shared backend, scoped to builtin namespaces
#[derive(Clone)]
pub struct NamespaceFactory {
    backend: Arc<dyn FileSystemBase>,
}

impl NamespaceFactory {
    pub fn new(backend: Arc<dyn FileSystemBase>) -> Self {
        Self { backend }
    }

    /// Default grant for a namespace given by name
    pub fn grant(name: &str) -> Result<Grant> {
        Namespace::from_name(name)
            .map(|ns| ns.grant())
            .ok_or_else(|| Error::invalid_argument("namespace", Some(name.to_string())))
    }

    pub fn create_internal_handle(&self) -> Handle {
        self.handle_for(&[Namespace::Internal])
    }

    pub fn create_userinput_handle(&self) -> Handle {
        self.handle_for(&[Namespace::Userinput])
    }

    pub fn create_workspace_handle(&self) -> Handle {
        self.handle_for(&[Namespace::Workspace])
    }

    /// Handle over all three namespaces
    pub fn create_full_handle(&self) -> Handle {
        self.handle_for(&Namespace::ALL)
    }

    /// Handle scoped to the namespaces named in `names`
    pub fn create_handle_for<S: AsRef<str>>(&self, names: &[S]) -> Result<Handle> {
        let namespaces = names
            .iter()
            .map(|name| {
                Namespace::from_name(name.as_ref()).ok_or_else(|| {
                    Error::invalid_argument("namespace", Some(name.as_ref().to_string()))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.handle_for(&namespaces))
    }

    pub fn handle_for(&self, namespaces: &[Namespace]) -> Handle {
        let mut grants: Vec<Grant> = Vec::with_capacity(namespaces.len());
        for ns in namespaces {
            let grant = ns.grant();
            if !grants.contains(&grant) {
                grants.push(grant);
            }
        }

        debug!("Minting handle for {:?}", namespaces);
        Handle::new(Arc::clone(&self.backend), grants)
    }
}
