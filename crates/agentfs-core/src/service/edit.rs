//! Literal-replacement edits with unified diff previews

use crate::error::{Error, Result};
use crate::types::LogicalPath;
use serde::{Deserialize, Serialize};
use similar::{DiffTag, TextDiff};

/// Placeholder diff for an edit that leaves the content untouched
pub const NO_CHANGES: &str = "(no changes)";

/// One `{oldText, newText}` replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOperation {
    pub old_text: String,
    pub new_text: String,
}

impl EditOperation {
    pub fn new(old_text: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self {
            old_text: old_text.into(),
            new_text: new_text.into(),
        }
    }
}

/// Result of `edit_file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    pub diff: String,
    pub lines_changed: usize,
    pub changed: bool,
    pub dry_run: bool,
}

/// Apply `edits` in list order, each replacing the first occurrence of its
/// `old_text` in the content produced by the previous edits
pub(crate) fn apply_edits(content: &str, edits: &[EditOperation]) -> Result<String> {
    if edits.is_empty() {
        return Err(Error::invalid_argument("edits", None));
    }

    let mut content = content.to_string();
    for (i, edit) in edits.iter().enumerate() {
        if edit.old_text.is_empty() {
            return Err(Error::invalid_argument(format!("edits[{}].oldText", i), None));
        }

        let Some(start) = content.find(&edit.old_text) else {
            return Err(Error::invalid_argument(
                format!("edits[{}].oldText", i),
                Some(preview(&edit.old_text)),
            ));
        };
        content.replace_range(start..start + edit.old_text.len(), &edit.new_text);
    }

    Ok(content)
}

fn preview(text: &str) -> String {
    const MAX: usize = 60;
    match text.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub(crate) fn unified_diff(path: &LogicalPath, original: &str, modified: &str) -> String {
    if original == modified {
        return NO_CHANGES.to_string();
    }

    TextDiff::from_lines(original, modified)
        .unified_diff()
        .context_radius(3)
        .header(path.as_str(), path.as_str())
        .to_string()
}

/// Lines touched by the change; a replaced block counts its longer side
pub(crate) fn count_changed_lines(original: &str, modified: &str) -> usize {
    TextDiff::from_lines(original, modified)
        .ops()
        .iter()
        .map(|op| match op.tag() {
            DiffTag::Equal => 0,
            _ => op.old_range().len().max(op.new_range().len()),
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_apply_edits_sequentially() {
        let edits = vec![EditOperation::new("a", "b"), EditOperation::new("bb", "c")];
        assert_eq!(apply_edits("ab", &edits).unwrap(), "c");
    }

    #[test]
    fn test_apply_edits_replaces_first_occurrence_only() {
        let edits = vec![EditOperation::new("x", "y")];
        assert_eq!(apply_edits("x x x", &edits).unwrap(), "y x x");
    }

    #[test]
    fn test_apply_edits_rejects_empty_old_text() {
        let err = apply_edits("abc", &[EditOperation::new("", "z")]).unwrap_err();
        assert!(err.to_string().contains("edits[0].oldText"));
    }

    #[test]
    fn test_unified_diff_format() {
        let path = LogicalPath::new("/workspace/doc.txt").unwrap();
        let diff = unified_diff(&path, "alpha\nbeta\n", "alpha\nBETA\n");
        assert_eq!(
            diff,
            "--- /workspace/doc.txt\n+++ /workspace/doc.txt\n@@ -1,2 +1,2 @@\n alpha\n-beta\n+BETA\n"
        );
        assert_eq!(unified_diff(&path, "same", "same"), NO_CHANGES);
    }

    #[test]
    fn test_count_changed_lines() {
        assert_eq!(count_changed_lines("a\nb\nc\n", "a\nB\nc\n"), 1);
        assert_eq!(count_changed_lines("a\n", "a\nb\nc\n"), 2);
        assert_eq!(count_changed_lines("a\n", "a\n"), 0);
    }

    #[test]
    fn test_edit_operation_wire_names() {
        let edit: EditOperation =
            serde_json::from_str(r#"{"oldText": "a", "newText": "b"}"#).unwrap();
        assert_eq!(edit, EditOperation::new("a", "b"));
    }
}
