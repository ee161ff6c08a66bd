//! Argument structs deserialized from tool calls

use crate::service::{EditOperation, SortBy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReadTextFileArgs {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<i64>,
    #[serde(default)]
    pub read_lines: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadMultipleFilesArgs {
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditFileArgs {
    pub path: String,
    pub edits: Vec<EditOperation>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathArgs {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDirectoryWithSizesArgs {
    pub path: String,
    #[serde(default)]
    pub sort_by: SortBy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilesArgs {
    pub path: String,
    pub pattern: String,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoArgs {}
