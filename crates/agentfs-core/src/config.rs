//! Settings for assembling a backend, a handle and a domain service

use crate::backend::{DiskConfig, DiskFileSystem, FileSystemBase, MemoryFileSystem};
use crate::error::{Error, Result};
use crate::sandbox::NamespaceFactory;
use crate::service::DomainService;
use crate::service::DomainPolicy;
use crate::types::Namespace;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Which storage engine to mount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Disk(DiskConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Disk(DiskConfig::default())
    }
}

/// Top-level settings, read once and passed explicitly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FsSettings {
    pub storage: StorageConfig,
    pub namespaces: Vec<Namespace>,
    pub policy: DomainPolicy,
}

impl Default for FsSettings {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            namespaces: Namespace::ALL.to_vec(),
            policy: DomainPolicy::default(),
        }
    }
}

impl FsSettings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agentfs").join("settings.json"))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;
        let settings: Self = serde_json::from_str(&raw)?;
        settings.validate()?;

        info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespaces.is_empty() {
            return Err(Error::Config("at least one namespace must be granted".to_string()));
        }
        if self.policy.max_lines == Some(0) || self.policy.max_bytes == Some(0) {
            return Err(Error::Config("read limits must be positive".to_string()));
        }
        Ok(())
    }

    pub fn build_backend(&self) -> Result<Arc<dyn FileSystemBase>> {
        Ok(match &self.storage {
            StorageConfig::Memory => Arc::new(MemoryFileSystem::new()),
            StorageConfig::Disk(disk) => Arc::new(DiskFileSystem::open(disk)?),
        })
    }

    /// Wire backend, handle and policy into a ready service
    pub fn build_service(&self) -> Result<DomainService> {
        self.validate()?;
        let factory = NamespaceFactory::new(self.build_backend()?);
        let handle = factory.handle_for(&self.namespaces);
        Ok(DomainService::new(handle, self.policy.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_settings() {
        let json = r#"{
            "storage": { "kind": "disk", "baseDir": "/tmp/agentfs", "workspace": "/tmp/work" },
            "namespaces": ["workspace", "userinput"],
            "policy": { "maxLines": 200, "allowDeleteWorkspace": false }
        }"#;
        let settings: FsSettings = serde_json::from_str(json).unwrap();

        let StorageConfig::Disk(disk) = &settings.storage else {
            panic!("expected disk storage");
        };
        assert_eq!(disk.workspace, Some(PathBuf::from("/tmp/work")));
        assert_eq!(disk.internal, None);
        assert_eq!(settings.namespaces, vec![Namespace::Workspace, Namespace::Userinput]);
        assert_eq!(settings.policy.max_lines, Some(200));
        assert!(!settings.policy.allow_delete_workspace);
        assert!(!settings.policy.allow_write_userinput);
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings: FsSettings = serde_json::from_str(r#"{"storage": {"kind": "memory"}}"#).unwrap();
        assert_eq!(settings.storage, StorageConfig::Memory);
        assert_eq!(settings.namespaces.len(), 3);
        assert_eq!(settings.policy, DomainPolicy::default());

        let StorageConfig::Disk(disk) = FsSettings::default().storage else {
            panic!("expected disk storage");
        };
        assert_eq!(disk.base_dir, crate::backend::default_base_dir());
        assert!(disk.base_dir.ends_with("agentfs"));
        assert!(!disk.fresh_session);
    }

    #[test]
    fn test_build_memory_service() {
        let settings = FsSettings {
            storage: StorageConfig::Memory,
            namespaces: vec![Namespace::Workspace],
            policy: DomainPolicy::default(),
        };
        let service = settings.build_service().unwrap();
        service.write_file("/workspace/a.txt", "a").unwrap();
        assert!(service.write_file("/internal/a.txt", "a").is_err());
    }

    #[test]
    fn test_load_from_file_and_build_disk_service() {
        let dir = tempdir().unwrap();
        let settings_path = dir.path().join("settings.json");
        let settings = FsSettings {
            storage: StorageConfig::Disk(DiskConfig::with_base_dir(dir.path().join("data"))),
            ..FsSettings::default()
        };
        std::fs::write(&settings_path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();

        let loaded = FsSettings::load(&settings_path).unwrap();
        assert_eq!(loaded, settings);

        let service = loaded.build_service().unwrap();
        service.write_file("/workspace/out.txt", "done").unwrap();
        assert_eq!(service.read_text_file("/workspace/out.txt", 1, None).unwrap(), "done");
    }

    #[test]
    fn test_persistent_storage_shared_across_services() {
        let dir = tempdir().unwrap();
        let settings = FsSettings {
            storage: StorageConfig::Disk(DiskConfig::persistent(dir.path())),
            ..FsSettings::default()
        };

        settings
            .build_service()
            .unwrap()
            .write_file("/workspace/a.txt", "first run")
            .unwrap();
        let second = settings.build_service().unwrap();
        assert_eq!(
            second.read_text_file("/workspace/a.txt", 1, None).unwrap(),
            "first run"
        );
    }

    #[test]
    fn test_invalid_settings() {
        let settings = FsSettings {
            namespaces: vec![],
            ..FsSettings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::Config(_))));

        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(FsSettings::load(&missing), Err(Error::Config(_))));
        assert_eq!(FsSettings::load_or_default(&missing).unwrap(), FsSettings::default());
    }
}
