//! Logical paths

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Substrings that never appear in a logical path
const FORBIDDEN: [&str; 5] = ["..", "*", "?", "\\", "//"];

/// Check that `path` is a well-formed logical path.
///
/// A logical path is absolute (`/`-rooted), contains no control characters
/// and none of `..`, `*`, `?`, `\` or `//`. It never names an OS location.
pub fn validate_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "must be absolute"));
    }

    if path.chars().any(|c| ('\x00'..='\x1f').contains(&c)) {
        return Err(Error::invalid_path(path, "contains control characters"));
    }

    if let Some(token) = FORBIDDEN.iter().find(|t| path.contains(*t)) {
        return Err(Error::invalid_path(
            path,
            format!("contains forbidden sequence {:?}", token),
        ));
    }

    Ok(())
}

/// A validated, absolute path in the logical filesystem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPath(String);

impl LogicalPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self(path))
    }

    /// Wrap a constant path without revalidating it
    pub(crate) fn from_static(path: &'static str) -> Self {
        debug_assert!(validate_path(path).is_ok(), "{path:?} is not a logical path");
        Self(path.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Plain string-prefix test, as used for grant matching
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    pub fn is_dir_like(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Final path segment (empty for `/` and other trailing-slash paths)
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    /// This path with a trailing `/`, suitable as a listing prefix
    pub fn as_dir(&self) -> LogicalPath {
        if self.is_dir_like() {
            self.clone()
        } else {
            Self(format!("{}/", self.0))
        }
    }

    /// Append a relative `/`-separated suffix
    pub fn join(&self, rest: &str) -> Result<LogicalPath> {
        let base = self.as_dir();
        Self::new(format!("{}{}", base.0, rest.trim_start_matches('/')))
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalPath {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalPath> for String {
    fn from(path: LogicalPath) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FsError;

    fn is_invalid(path: &str) -> bool {
        matches!(
            validate_path(path).unwrap_err().as_fs(),
            Some(FsError::InvalidPath { .. })
        )
    }

    #[test]
    fn test_accepts_well_formed_paths() {
        for path in [
            "/",
            "/workspace/",
            "/workspace/hello.txt",
            "/internal/state/notes.md",
            "/userinput/a b/c-d_e.f",
            "/workspace/.hidden",
        ] {
            assert!(validate_path(path).is_ok(), "{path} should be valid");
        }
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for path in [
            "",
            "workspace/x",
            "/workspace/../etc/passwd",
            "/workspace/*.txt",
            "/workspace/what?",
            "/workspace\\x",
            "/workspace//x",
            "/workspace/x\n",
            "/workspace/\u{0}",
            "/workspace/\u{1f}",
        ] {
            assert!(is_invalid(path), "{path:?} should be invalid");
        }
    }

    #[test]
    fn test_name_and_dir() {
        let path = LogicalPath::new("/workspace/docs/a.txt").unwrap();
        assert_eq!(path.name(), "a.txt");
        assert_eq!(path.as_dir().as_str(), "/workspace/docs/a.txt/");

        let dir = LogicalPath::new("/workspace/").unwrap();
        assert_eq!(dir.name(), "");
        assert_eq!(dir.as_dir(), dir);
        assert_eq!(dir.join("docs/a.txt").unwrap().as_str(), "/workspace/docs/a.txt");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: LogicalPath = serde_json::from_str("\"/workspace/a\"").unwrap();
        assert_eq!(ok.as_str(), "/workspace/a");

        let bad = serde_json::from_str::<LogicalPath>("\"/workspace/../a\"");
        assert!(bad.is_err());
    }
}
