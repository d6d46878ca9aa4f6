// Local file tools, confined to a root directory

use crate::protocol::ToolSchema;
use crate::tools::{json_schema_boolean, json_schema_object, json_schema_string, Tool, ToolOutput};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Name fragments that mark a path as a secret
const DENY_PATTERNS: &[&str] = &[
    ".env",
    "credentials",
    "secrets",
    "id_rsa",
    "id_ed25519",
    ".pem",
    ".key",
    "password",
    "token",
    "api_key",
    ".git/config",
];

/// Root directory that file tools resolve paths against
#[derive(Debug, Clone)]
pub struct FileRoot {
    base_path: PathBuf,
}

impl FileRoot {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Check if a path (relative to the root) names a secret file
    fn is_secret(relative: &Path) -> bool {
        let path_str = relative.to_string_lossy().to_lowercase().replace('\\', "/");
        DENY_PATTERNS.iter().any(|pattern| path_str.contains(pattern))
    }

    /// Resolve `requested` to an existing path inside the root.
    fn resolve(&self, requested: &str) -> Result<PathBuf> {
        let relative = Path::new(requested);
        if relative.is_absolute() || relative.components().any(|c| c == Component::ParentDir) {
            bail!("Access denied: {} is outside the root directory", requested);
        }
        if Self::is_secret(relative) {
            bail!("Access denied: {} appears to be a secret file", requested);
        }

        let path = self.base_path.join(relative);
        if !path.exists() {
            bail!("File not found: {}", requested);
        }

        // Symlinks may still point outside the root
        let canonical = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", requested))?;
        let base = self
            .base_path
            .canonicalize()
            .context("Failed to resolve root directory")?;
        if !canonical.starts_with(&base) {
            bail!("Access denied: {} is outside the root directory", requested);
        }

        Ok(canonical)
    }
}

/// Tool to list a directory
pub struct ListFilesTool {
    root: FileRoot,
}

impl ListFilesTool {
    pub fn new(root: FileRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct ListFilesArgs {
    directory: String,
    #[serde(default)]
    recursive: bool,
}

#[async_trait::async_trait]
impl Tool for ListFilesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "list_files",
            "List the files in a directory (relative to the server's root directory)",
            json_schema_object(
                serde_json::json!({
                    "directory": json_schema_string("Directory to list, e.g. \".\" for the root"),
                    "recursive": json_schema_boolean("Include nested directories (default: false)")
                }),
                vec!["directory"],
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let args: ListFilesArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for list_files")?;

        let dir = self.root.resolve(&args.directory)?;
        if !dir.is_dir() {
            bail!("Not a directory: {}", args.directory);
        }

        let max_depth = if args.recursive { usize::MAX } else { 1 };
        let mut entries = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(max_depth) {
            let entry = entry.with_context(|| format!("Failed to read directory {}", args.directory))?;
            let relative = entry.path().strip_prefix(&dir).unwrap_or(entry.path());
            if FileRoot::is_secret(relative) {
                continue;
            }
            let name = relative.to_string_lossy().replace('\\', "/");
            entries.push(if entry.file_type().is_dir() {
                format!("{}/", name)
            } else {
                name
            });
        }
        entries.sort();

        Ok(ToolOutput::Text(format!(
            "Directory: {}\n\nContents ({} items):\n{}",
            args.directory,
            entries.len(),
            entries.join("\n")
        )))
    }
}

/// Tool to read a text file
pub struct ReadFileTool {
    root: FileRoot,
}

impl ReadFileTool {
    pub fn new(root: FileRoot) -> Self {
        Self { root }
    }
}

#[derive(Debug, Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "read_file",
            "Read a text file (relative to the server's root directory). Cannot read secret files (.env, credentials, private keys, etc.)",
            json_schema_object(
                serde_json::json!({
                    "path": json_schema_string("Path to the file to read")
                }),
                vec!["path"],
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput> {
        let args: ReadFileArgs = serde_json::from_value(arguments)
            .context("Invalid arguments for read_file")?;

        let path = self.root.resolve(&args.path)?;
        if path.is_dir() {
            bail!("{} is a directory, use list_files instead", args.path);
        }

        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read file {}", args.path))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(ToolOutput::Text(content)),
            Err(e) => bail!(
                "{} is a binary file ({} bytes) and cannot be displayed as text",
                args.path,
                e.as_bytes().len()
            ),
        }
    }
}
