//! Tool bindings over a `DomainService`
//!
//! Every tool function takes the service as its first parameter. The
//! registry binds that parameter by closure, so the schema a model sees only
//! describes the remaining arguments and the service never leaks into it.

mod args;

pub use args::*;

use crate::error::{Error, Result};
use crate::service::DomainService;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Externally visible description of a tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

type BoundTool = Box<dyn Fn(Value) -> Result<String> + Send + Sync>;

struct RegisteredTool {
    spec: ToolSpec,
    call: BoundTool,
}

/// Named tools with their service already bound
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every filesystem tool, bound to `service`
    pub fn with_service(service: Arc<DomainService>) -> Self {
        let mut registry = Self::new();

        registry.register(
            ToolSpec {
                name: "read_text_file",
                description: "Read a text file, optionally a window of lines starting at a 1-based line",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string", "description": "Logical path of the file" },
                        "start_line": { "type": "integer", "description": "1-based first line (default 1)" },
                        "read_lines": { "type": "integer", "description": "Number of lines to read. Omit for the rest of the file." }
                    },
                    "required": ["path"]
                }),
            },
            Arc::clone(&service),
            read_text_file,
        );

        registry.register(
            ToolSpec {
                name: "read_multiple_files",
                description: "Read several text files; failures are reported per file",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "paths": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["paths"]
                }),
            },
            Arc::clone(&service),
            read_multiple_files,
        );

        registry.register(
            ToolSpec {
                name: "write_file",
                description: "Create or overwrite a file with the given text",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "content": { "type": "string" }
                    },
                    "required": ["path", "content"]
                }),
            },
            Arc::clone(&service),
            write_file,
        );

        registry.register(
            ToolSpec {
                name: "edit_file",
                description: "Apply exact text replacements in order; dry_run returns a unified diff without saving",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "edits": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "oldText": { "type": "string", "description": "Exact text to replace" },
                                    "newText": { "type": "string", "description": "Replacement text" }
                                },
                                "required": ["oldText", "newText"]
                            }
                        },
                        "dry_run": { "type": "boolean", "default": false }
                    },
                    "required": ["path", "edits"]
                }),
            },
            Arc::clone(&service),
            edit_file,
        );

        registry.register(
            ToolSpec {
                name: "delete_file",
                description: "Delete a file",
                parameters: path_only("Logical path of the file"),
            },
            Arc::clone(&service),
            delete_file,
        );

        registry.register(
            ToolSpec {
                name: "list_directory",
                description: "List the immediate children of a directory as [DIR]/[FILE] lines",
                parameters: path_only("Logical directory path"),
            },
            Arc::clone(&service),
            list_directory,
        );

        registry.register(
            ToolSpec {
                name: "list_directory_with_sizes",
                description: "List the immediate children of a directory with aggregated sizes",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "sort_by": { "type": "string", "enum": ["name", "size"], "default": "name" }
                    },
                    "required": ["path"]
                }),
            },
            Arc::clone(&service),
            list_directory_with_sizes,
        );

        registry.register(
            ToolSpec {
                name: "directory_tree",
                description: "Recursive JSON tree of a directory",
                parameters: path_only("Logical directory path"),
            },
            Arc::clone(&service),
            directory_tree,
        );

        registry.register(
            ToolSpec {
                name: "search_files",
                description: "Find files under a directory whose name matches a glob or contains the pattern",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "pattern": { "type": "string" },
                        "exclude_patterns": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["path", "pattern"]
                }),
            },
            Arc::clone(&service),
            search_files,
        );

        registry.register(
            ToolSpec {
                name: "get_file_info",
                description: "Size, modification time and MIME type of a file",
                parameters: path_only("Logical path of the file"),
            },
            Arc::clone(&service),
            get_file_info,
        );

        registry.register(
            ToolSpec {
                name: "list_allowed_directories",
                description: "Directories this session may access, with permitted operations",
                parameters: json!({ "type": "object", "properties": {} }),
            },
            Arc::clone(&service),
            list_allowed_directories,
        );

        registry.register(
            ToolSpec {
                name: "read_media_file",
                description: "Read a binary file as base64 with its MIME type",
                parameters: path_only("Logical path of the file"),
            },
            Arc::clone(&service),
            read_media_file,
        );

        registry
    }

    /// Bind `service` as the first argument of `func`
    pub fn register<A, F>(&mut self, spec: ToolSpec, service: Arc<DomainService>, func: F)
    where
        A: DeserializeOwned,
        F: Fn(&DomainService, A) -> Result<String> + Send + Sync + 'static,
    {
        let name = spec.name;
        let call: BoundTool = Box::new(move |args: Value| {
            let args: A = parse_args(args)?;
            func(&service, args)
        });
        self.tools.insert(name, RegisteredTool { spec, call });
    }

    pub fn specs(&self) -> Vec<&ToolSpec> {
        self.tools.values().map(|t| &t.spec).collect()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn call(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::invalid_argument("tool", Some(name.to_string())))?;
        debug!("Calling tool {}", name);
        (tool.call)(args)
    }
}

fn path_only(description: &'static str) -> Value {
    json!({
        "type": "object",
        "properties": { "path": { "type": "string", "description": description } },
        "required": ["path"]
    })
}

fn parse_args<A: DeserializeOwned>(args: Value) -> Result<A> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| Error::invalid_argument("arguments", Some(e.to_string())))
}

fn count(argument: &str, value: Option<i64>) -> Result<Option<usize>> {
    match value {
        None => Ok(None),
        Some(v) if v < 0 => Err(Error::invalid_argument(argument, Some(v.to_string()))),
        Some(v) => Ok(Some(v as usize)),
    }
}

pub fn read_text_file(service: &DomainService, args: ReadTextFileArgs) -> Result<String> {
    let start_line = count("start_line", args.start_line)?.unwrap_or(1);
    let read_lines = count("read_lines", args.read_lines)?;
    service.read_text_file(&args.path, start_line, read_lines)
}

pub fn read_multiple_files(service: &DomainService, args: ReadMultipleFilesArgs) -> Result<String> {
    let blocks: Vec<String> = service
        .read_multiple_files(&args.paths)
        .into_iter()
        .map(|r| match (r.content, r.error) {
            (Some(content), _) => format!("{}:\n{}", r.path, content),
            (None, error) => format!("{}: Error - {}", r.path, error.unwrap_or_default()),
        })
        .collect();
    Ok(blocks.join("\n---\n"))
}

pub fn write_file(service: &DomainService, args: WriteFileArgs) -> Result<String> {
    let meta = service.write_file(&args.path, &args.content)?;
    Ok(format!(
        "Successfully wrote {} bytes to {}",
        meta.size_or_zero(),
        meta.path
    ))
}

pub fn edit_file(service: &DomainService, args: EditFileArgs) -> Result<String> {
    let result = service.edit_file(&args.path, &args.edits, args.dry_run)?;
    if result.dry_run || !result.changed {
        return Ok(result.diff);
    }
    Ok(format!(
        "{}\n{} lines changed in {}",
        result.diff, result.lines_changed, args.path
    ))
}

pub fn delete_file(service: &DomainService, args: PathArgs) -> Result<String> {
    service.delete_file(&args.path)?;
    Ok(format!("Deleted {}", args.path))
}

pub fn list_directory(service: &DomainService, args: PathArgs) -> Result<String> {
    let entries = service.list_directory(&args.path)?;
    if entries.is_empty() {
        return Ok("(empty directory)".to_string());
    }
    Ok(entries
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn list_directory_with_sizes(
    service: &DomainService,
    args: ListDirectoryWithSizesArgs,
) -> Result<String> {
    Ok(service
        .list_directory_with_sizes(&args.path, args.sort_by)?
        .to_string())
}

pub fn directory_tree(service: &DomainService, args: PathArgs) -> Result<String> {
    let tree = service.directory_tree(&args.path)?;
    Ok(serde_json::to_string_pretty(&tree)?)
}

pub fn search_files(service: &DomainService, args: SearchFilesArgs) -> Result<String> {
    let hits = service.search_files(&args.path, &args.pattern, &args.exclude_patterns)?;
    if hits.is_empty() {
        return Ok("No matches found".to_string());
    }
    Ok(hits
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn get_file_info(service: &DomainService, args: PathArgs) -> Result<String> {
    let info = service.get_file_info(&args.path)?;
    let size = info.size.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
    let updated = info
        .updated_at
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string());
    Ok(format!(
        "path: {}\nname: {}\nsize: {}\nupdated: {}\nmimeType: {}",
        info.path, info.name, size, updated, info.mime_type
    ))
}

pub fn list_allowed_directories(service: &DomainService, _args: NoArgs) -> Result<String> {
    let lines: Vec<String> = service
        .list_allowed_directories()
        .into_iter()
        .map(|d| {
            let ops: Vec<&str> = d.operations.iter().map(|op| op.as_str()).collect();
            format!("{} ({})", d.prefix, ops.join(", "))
        })
        .collect();
    Ok(format!("Allowed directories:\n{}", lines.join("\n")))
}

pub fn read_media_file(service: &DomainService, args: PathArgs) -> Result<String> {
    let media = service.read_media_file(&args.path)?;
    Ok(serde_json::to_string(&json!({
        "type": "media",
        "mimeType": media.mime_type,
        "data": media.data,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryFileSystem;
    use crate::error::FsError;
    use crate::sandbox::NamespaceFactory;
    use crate::service::DomainPolicy;
    use pretty_assertions::assert_eq;

    fn registry() -> ToolRegistry {
        let factory = NamespaceFactory::new(Arc::new(MemoryFileSystem::new()));
        let service = DomainService::new(factory.create_full_handle(), DomainPolicy::default());
        ToolRegistry::with_service(Arc::new(service))
    }

    #[test]
    fn test_schemas_never_expose_service() {
        let registry = registry();
        assert_eq!(registry.specs().len(), 12);

        for spec in registry.specs() {
            let properties = spec.parameters["properties"].as_object().unwrap();
            assert!(!properties.contains_key("service"), "{} exposes service", spec.name);

            let required = spec.parameters.get("required").and_then(|r| r.as_array());
            for name in required.into_iter().flatten() {
                assert_ne!(name, "service");
                assert!(properties.contains_key(name.as_str().unwrap()));
            }
        }
    }

    #[test]
    fn test_call_roundtrip() {
        let registry = registry();
        let out = registry
            .call(
                "write_file",
                json!({"path": "/workspace/hello.txt", "content": "foo a\nbar b\nfoo c"}),
            )
            .unwrap();
        assert_eq!(out, "Successfully wrote 17 bytes to /workspace/hello.txt");

        let out = registry
            .call(
                "read_text_file",
                json!({"path": "/workspace/hello.txt", "start_line": 2, "read_lines": 1}),
            )
            .unwrap();
        assert_eq!(out, "bar b");

        let out = registry.call("list_directory", json!({"path": "/workspace"})).unwrap();
        assert_eq!(out, "[FILE] hello.txt");

        let out = registry
            .call("search_files", json!({"path": "/workspace", "pattern": "zzz"}))
            .unwrap();
        assert_eq!(out, "No matches found");
    }

    #[test]
    fn test_edit_dry_run_via_tool() {
        let registry = registry();
        registry
            .call("write_file", json!({"path": "/workspace/a.txt", "content": "x\n"}))
            .unwrap();

        let diff = registry
            .call(
                "edit_file",
                json!({
                    "path": "/workspace/a.txt",
                    "edits": [{"oldText": "x", "newText": "y"}],
                    "dry_run": true
                }),
            )
            .unwrap();
        assert!(diff.contains("-x\n+y"));

        let content = registry
            .call("read_text_file", json!({"path": "/workspace/a.txt"}))
            .unwrap();
        assert_eq!(content, "x\n");
    }

    #[test]
    fn test_batch_read_never_aborts() {
        let registry = registry();
        registry
            .call("write_file", json!({"path": "/workspace/a.txt", "content": "a"}))
            .unwrap();

        let out = registry
            .call(
                "read_multiple_files",
                json!({"paths": ["/workspace/a.txt", "/workspace/missing"]}),
            )
            .unwrap();
        assert!(out.starts_with("/workspace/a.txt:\na\n---\n/workspace/missing: Error - "));
    }

    #[test]
    fn test_argument_errors() {
        let registry = registry();

        let err = registry
            .call("read_text_file", json!({"path": "/workspace/a", "start_line": -1}))
            .unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { argument, .. }) if argument == "start_line"));

        let err = registry.call("write_file", json!({"path": "/workspace/a"})).unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { argument, .. }) if argument == "arguments"));

        let err = registry.call("format_disk", Value::Null).unwrap_err();
        assert!(matches!(err.as_fs(), Some(FsError::InvalidArgument { argument, .. }) if argument == "tool"));
    }

    #[test]
    fn test_list_allowed_directories_without_args() {
        let registry = registry();
        let out = registry.call("list_allowed_directories", Value::Null).unwrap();
        assert!(out.starts_with("Allowed directories:\n/internal/ (list, file, read_binary"));
        assert!(out.contains("/userinput/ (list, file, read_binary, read_file, read_re)"));
    }
}
