//! AgentFS command-line front end
//!
//! Mounts the configured backend, builds a domain service over the granted
//! namespaces and runs a single tool call per invocation.

use agentfs_core::{DiskConfig, DomainService, FsSettings, SortBy, StorageConfig, ToolRegistry};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "agentfs", version)]
#[command(about = "Capability-checked logical filesystem for agents")]
struct Cli {
    /// Settings file (JSON); defaults to the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store namespaces under this directory instead of the configured storage
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the immediate children of a directory
    Ls { path: String },

    /// List a directory with aggregated sizes
    Du {
        path: String,
        #[arg(long, default_value = "name")]
        sort: SortBy,
    },

    /// Print a text file, optionally a window of lines
    Cat {
        path: String,
        /// 1-based first line
        #[arg(long)]
        start_line: Option<i64>,
        /// Number of lines to print
        #[arg(long)]
        lines: Option<i64>,
    },

    /// Write a file; reads stdin when no content is given
    Write { path: String, content: Option<String> },

    /// Replace text in a file, pairing each --old with the --new at the same position
    Edit {
        path: String,
        #[arg(long = "old", required = true)]
        old: Vec<String>,
        #[arg(long = "new", required = true)]
        new: Vec<String>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Find files by glob or substring
    Find {
        path: String,
        pattern: String,
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },

    /// Show size, modification time and MIME type
    Info { path: String },

    /// Print a directory as a JSON tree
    Tree { path: String },

    /// Delete a file
    Rm { path: String },

    /// Show the directories this session may access
    Dirs,

    /// Print the tool schemas
    Tools,

    /// Invoke a tool by name with JSON arguments
    Call {
        tool: String,
        #[arg(default_value = "{}")]
        args: String,
    },
}

impl Command {
    /// Translate a subcommand into a tool name and its arguments
    fn into_call(self) -> Result<(String, Value)> {
        let call = match self {
            Command::Ls { path } => ("list_directory", json!({ "path": path })),
            Command::Du { path, sort } => (
                "list_directory_with_sizes",
                json!({ "path": path, "sort_by": sort }),
            ),
            Command::Cat {
                path,
                start_line,
                lines,
            } => (
                "read_text_file",
                json!({ "path": path, "start_line": start_line, "read_lines": lines }),
            ),
            Command::Write { path, content } => {
                let content = match content {
                    Some(content) => content,
                    None => {
                        let mut buf = String::new();
                        std::io::stdin()
                            .read_to_string(&mut buf)
                            .context("Failed to read content from stdin")?;
                        buf
                    }
                };
                ("write_file", json!({ "path": path, "content": content }))
            }
            Command::Edit {
                path,
                old,
                new,
                dry_run,
            } => {
                if old.len() != new.len() {
                    bail!("expected as many --new values as --old values");
                }
                let edits: Vec<Value> = old
                    .into_iter()
                    .zip(new)
                    .map(|(o, n)| json!({ "oldText": o, "newText": n }))
                    .collect();
                (
                    "edit_file",
                    json!({ "path": path, "edits": edits, "dry_run": dry_run }),
                )
            }
            Command::Find {
                path,
                pattern,
                exclude,
            } => (
                "search_files",
                json!({ "path": path, "pattern": pattern, "exclude_patterns": exclude }),
            ),
            Command::Info { path } => ("get_file_info", json!({ "path": path })),
            Command::Tree { path } => ("directory_tree", json!({ "path": path })),
            Command::Rm { path } => ("delete_file", json!({ "path": path })),
            Command::Dirs => ("list_allowed_directories", json!({})),
            Command::Call { tool, args } => {
                let args: Value = serde_json::from_str(&args)
                    .with_context(|| format!("Invalid JSON arguments for {}", tool))?;
                return Ok((tool, args));
            }
            Command::Tools => bail!("tools does not map to a tool call"),
        };
        Ok((call.0.to_string(), call.1))
    }
}

fn load_settings(cli: &Cli) -> Result<FsSettings> {
    let mut settings = match (&cli.config, FsSettings::default_path()) {
        (Some(path), _) => FsSettings::load(path)
            .with_context(|| format!("Failed to load settings from {:?}", path))?,
        (None, Some(default)) => FsSettings::load_or_default(default)?,
        (None, None) => FsSettings::default(),
    };

    if let Some(root) = &cli.root {
        settings.storage = StorageConfig::Disk(DiskConfig::persistent(root));
    }
    Ok(settings)
}

fn main() -> Result<()> {
    // Initialize logging; stdout carries command output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    debug!("Settings: {:?}", settings);

    let service: Arc<DomainService> = Arc::new(settings.build_service()?);
    let registry = ToolRegistry::with_service(service);

    if let Command::Tools = cli.command {
        println!("{}", serde_json::to_string_pretty(&registry.specs())?);
        return Ok(());
    }

    let (tool, args) = cli.command.into_call()?;
    info!("Running {}", tool);
    let output = registry.call(&tool, args)?;
    println!("{}", output);
    Ok(())
}
