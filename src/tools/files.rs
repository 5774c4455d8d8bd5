//! File manager tools.

use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, parse_args, Tool, ToolContext};
use crate::error::Result;
use crate::files::{EntryKind, FileRecord};
use crate::protocol::{ToolCallResult, ToolDefinition};

pub(super) fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(ListDirectoryTool),
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(CreateDirectoryTool),
        Arc::new(DeleteTool),
        Arc::new(FileInfoTool),
        Arc::new(SearchContentTool),
        Arc::new(FindDuplicatesTool),
        Arc::new(OrganizeTool),
        Arc::new(BatchRenameTool),
        Arc::new(DirectoryStatsTool),
    ]
}

fn schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Tool listing a directory's entries.
pub struct ListDirectoryTool;

#[derive(Debug, Deserialize)]
struct PathArgs {
    path: String,
}

#[async_trait::async_trait]
impl Tool for ListDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "list_directory".into(),
            description: "List contents of a directory.".into(),
            input_schema: schema(
                json!({ "path": { "type": "string", "description": "Directory path to list" } }),
                &["path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: PathArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.path.clone();
        let entries = blocking(move || files.list_directory(&path)).await?;

        if entries.is_empty() {
            return Ok(ToolCallResult::text(format!(
                "Directory '{}' is empty.",
                args.path
            )));
        }

        let lines: Vec<String> = entries
            .iter()
            .map(|e| match (e.kind, e.size) {
                (EntryKind::Directory, _) => format!("📁 {}", e.name),
                (EntryKind::File, Some(size)) => format!("📄 {} ({} bytes)", e.name, size),
                (EntryKind::File, None) => format!("📄 {} (unknown size)", e.name),
            })
            .collect();
        Ok(ToolCallResult::text(format!(
            "Contents of '{}':\n{}",
            args.path,
            lines.join("\n")
        )))
    }
}

/// Tool reading a text file.
pub struct ReadFileTool;

#[derive(Debug, Deserialize)]
struct FilePathArgs {
    file_path: String,
}

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read_file".into(),
            description: "Read contents of a text file.".into(),
            input_schema: schema(
                json!({ "file_path": { "type": "string", "description": "Path to the file to read" } }),
                &["file_path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: FilePathArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.file_path.clone();
        let content = blocking(move || files.read_file(&path)).await?;
        Ok(ToolCallResult::text(format!(
            "Contents of '{}':\n\n{}",
            args.file_path, content
        )))
    }
}

/// Tool writing a file.
pub struct WriteFileTool;

#[derive(Debug, Deserialize)]
struct WriteArgs {
    file_path: String,
    content: String,
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "write_file".into(),
            description: "Write content to a file, creating parent directories as needed.".into(),
            input_schema: schema(
                json!({
                    "file_path": { "type": "string", "description": "Path where to write the file" },
                    "content": { "type": "string", "description": "Content to write to the file" }
                }),
                &["file_path", "content"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: WriteArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.file_path.clone();
        let written = blocking(move || files.write_file(&path, &args.content)).await?;
        Ok(ToolCallResult::text(format!(
            "Successfully wrote {} characters to '{}'.",
            written, args.file_path
        )))
    }
}

/// Tool creating a directory.
pub struct CreateDirectoryTool;

#[derive(Debug, Deserialize)]
struct DirPathArgs {
    dir_path: String,
}

#[async_trait::async_trait]
impl Tool for CreateDirectoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_directory".into(),
            description: "Create a directory and any missing parents.".into(),
            input_schema: schema(
                json!({ "dir_path": { "type": "string", "description": "Path of the directory to create" } }),
                &["dir_path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: DirPathArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.dir_path.clone();
        blocking(move || files.create_directory(&path)).await?;
        Ok(ToolCallResult::text(format!(
            "Successfully created directory '{}'.",
            args.dir_path
        )))
    }
}

/// Tool deleting a file or directory tree.
pub struct DeleteTool;

#[async_trait::async_trait]
impl Tool for DeleteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "delete_file_or_directory".into(),
            description: "Delete a file, or a directory with all its contents.".into(),
            input_schema: schema(
                json!({ "path": { "type": "string", "description": "Path of the file or directory to delete" } }),
                &["path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: PathArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.path.clone();
        let text = match blocking(move || files.delete(&path)).await? {
            EntryKind::File => format!("Successfully deleted file '{}'.", args.path),
            EntryKind::Directory => format!(
                "Successfully deleted directory '{}' and all its contents.",
                args.path
            ),
        };
        Ok(ToolCallResult::text(text))
    }
}

/// Tool describing a file or directory.
pub struct FileInfoTool;

#[async_trait::async_trait]
impl Tool for FileInfoTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_file_info".into(),
            description: "Get detailed information about a file or directory.".into(),
            input_schema: schema(
                json!({ "file_path": { "type": "string", "description": "Path to the file or directory" } }),
                &["file_path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: FilePathArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let path = args.file_path.clone();
        let info = blocking(move || files.file_info(&path)).await?;

        let kind = match info.kind {
            EntryKind::Directory => "Directory",
            EntryKind::File => "File",
        };
        let text = format!(
            "File Information for '{}':\n\
             - Type: {}\n\
             - Size: {} bytes\n\
             - Created: {}\n\
             - Modified: {}\n\
             - MIME Type: {}\n\
             - Encoding: {}\n\
             - Absolute Path: {}",
            args.file_path,
            kind,
            info.size,
            timestamp(&info.created),
            timestamp(&info.modified),
            info.mime_type.as_deref().unwrap_or("Unknown"),
            info.encoding.as_deref().unwrap_or("Unknown"),
            info.absolute_path.display()
        );
        Ok(ToolCallResult::text(text))
    }
}

fn timestamp(time: &DateTime<Local>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Tool searching file contents.
pub struct SearchContentTool;

#[derive(Debug, Deserialize)]
struct SearchArgs {
    directory: String,
    search_term: String,
    file_extensions: Option<String>,
}

#[async_trait::async_trait]
impl Tool for SearchContentTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_files_by_content".into(),
            description: "Search for files containing specific text content (case-insensitive)."
                .into(),
            input_schema: schema(
                json!({
                    "directory": { "type": "string", "description": "Directory to search in" },
                    "search_term": { "type": "string", "description": "Text to search for" },
                    "file_extensions": {
                        "type": "string",
                        "description": "Comma-separated file extensions to search",
                        "default": ".txt,.py,.md,.json,.csv"
                    }
                }),
                &["directory", "search_term"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: SearchArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let (dir, term, exts) = (
            args.directory.clone(),
            args.search_term.clone(),
            args.file_extensions.clone(),
        );
        let matches = blocking(move || files.search_content(&dir, &term, exts.as_deref())).await?;

        if matches.is_empty() {
            return Ok(ToolCallResult::text(format!(
                "No files containing '{}' found in '{}'.",
                args.search_term, args.directory
            )));
        }

        let mut text = format!(
            "Found {} file(s) containing '{}':",
            matches.len(),
            args.search_term
        );
        for m in &matches {
            let _ = write!(text, "\n📄 {} ({} matches)", m.path.display(), m.count);
        }
        Ok(ToolCallResult::text(text))
    }
}

/// Tool finding duplicate files by content hash.
pub struct FindDuplicatesTool;

#[derive(Debug, Deserialize)]
struct DuplicatesArgs {
    directory: String,
    #[serde(default)]
    min_size: u64,
}

#[async_trait::async_trait]
impl Tool for FindDuplicatesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "find_duplicate_files".into(),
            description: "Find duplicate files in a directory based on a content hash.".into(),
            input_schema: schema(
                json!({
                    "directory": { "type": "string", "description": "Directory to search for duplicates" },
                    "min_size": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Minimum file size in bytes to consider",
                        "default": 0
                    }
                }),
                &["directory"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: DuplicatesArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let dir = args.directory.clone();
        let report = blocking(move || files.find_duplicates(&dir, args.min_size)).await?;

        if report.groups.is_empty() {
            return Ok(ToolCallResult::text(format!(
                "No duplicate files found in '{}' (scanned {} files).",
                args.directory, report.scanned
            )));
        }

        let mut text = format!(
            "Found {} duplicate file group(s) (scanned {} files):\n",
            report.groups.len(),
            report.scanned
        );
        for group in &report.groups {
            let short = &group.hash[..group.hash.len().min(8)];
            let _ = write!(
                text,
                "\n🔄 Duplicate group (Size: {} bytes, Hash: {}...):",
                group.size, short
            );
            for file in &group.files {
                let _ = write!(text, "\n   - {}", file.display());
            }
        }
        Ok(ToolCallResult::text(text))
    }
}

/// Tool copying files into per-type folders.
pub struct OrganizeTool;

#[derive(Debug, Deserialize)]
struct OrganizeArgs {
    source_dir: String,
    target_dir: String,
}

#[async_trait::async_trait]
impl Tool for OrganizeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "organize_files_by_type".into(),
            description: "Copy files into subdirectories of the target based on their type."
                .into(),
            input_schema: schema(
                json!({
                    "source_dir": { "type": "string", "description": "Source directory containing files to organize" },
                    "target_dir": { "type": "string", "description": "Target directory where organized files will be placed" }
                }),
                &["source_dir", "target_dir"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: OrganizeArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let (source, target) = (args.source_dir.clone(), args.target_dir.clone());
        let copied = blocking(move || files.organize_by_type(&source, &target)).await?;

        let mut text = format!(
            "Files organized from '{}' to '{}':\n",
            args.source_dir, args.target_dir
        );
        for (category, count) in &copied {
            let _ = write!(text, "\n  {}: {} file(s)", category, count);
        }
        Ok(ToolCallResult::text(text))
    }
}

/// Tool renaming files by regex.
pub struct BatchRenameTool;

#[derive(Debug, Deserialize)]
struct RenameArgs {
    directory: String,
    pattern: String,
    replacement: String,
    file_extensions: Option<String>,
}

#[async_trait::async_trait]
impl Tool for BatchRenameTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "batch_rename_files".into(),
            description: "Batch rename files using a regular expression. Existing files are never overwritten.".into(),
            input_schema: schema(
                json!({
                    "directory": { "type": "string", "description": "Directory containing files to rename" },
                    "pattern": { "type": "string", "description": "Regular expression to match in file names" },
                    "replacement": { "type": "string", "description": "Replacement string ($1 for capture groups)" },
                    "file_extensions": { "type": "string", "description": "Optional comma-separated extensions to filter (e.g. '.txt,.py')" }
                }),
                &["directory", "pattern", "replacement"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: RenameArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let (dir, pattern, replacement, exts) = (
            args.directory.clone(),
            args.pattern.clone(),
            args.replacement.clone(),
            args.file_extensions.clone(),
        );
        let renamed =
            blocking(move || files.batch_rename(&dir, &pattern, &replacement, exts.as_deref()))
                .await?;

        if renamed.is_empty() {
            return Ok(ToolCallResult::text(format!(
                "No files matched the pattern '{}' in '{}'.",
                args.pattern, args.directory
            )));
        }

        let lines: Vec<String> = renamed
            .iter()
            .map(|r| format!("{} → {}", r.from, r.to))
            .collect();
        Ok(ToolCallResult::text(format!(
            "Renamed {} file(s):\n{}",
            renamed.len(),
            lines.join("\n")
        )))
    }
}

/// Tool summarizing a directory tree.
pub struct DirectoryStatsTool;

#[derive(Debug, Deserialize)]
struct DirectoryArgs {
    directory: String,
}

#[async_trait::async_trait]
impl Tool for DirectoryStatsTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_directory_statistics".into(),
            description: "Get comprehensive statistics about a directory.".into(),
            input_schema: schema(
                json!({ "directory": { "type": "string", "description": "Directory to analyze" } }),
                &["directory"],
            ),
        }
    }

    async fn execute(&self, arguments: Value, context: &ToolContext) -> Result<ToolCallResult> {
        let args: DirectoryArgs = parse_args(arguments)?;
        let files = context.files.clone();
        let dir = args.directory.clone();
        let stats = blocking(move || files.directory_statistics(&dir)).await?;

        let mut text = format!("Directory Statistics for '{}':\n", args.directory);
        let _ = writeln!(text, "\n📊 Overview:");
        let _ = writeln!(text, "  - Total Files: {}", stats.total_files);
        let _ = writeln!(text, "  - Total Directories: {}", stats.total_dirs);
        let _ = writeln!(
            text,
            "  - Total Size: {:.2} MB",
            stats.total_size as f64 / (1024.0 * 1024.0)
        );
        let _ = writeln!(text, "\n📁 File Types (Top 10):");
        for (ext, count) in &stats.file_types {
            let _ = writeln!(text, "  - {}: {} file(s)", ext, count);
        }
        let _ = writeln!(text, "\n📈 Records:");
        let _ = writeln!(
            text,
            "  - Largest File: {}",
            record(&stats.largest, |r| format!("{:.2} KB", r.size as f64 / 1024.0))
        );
        let _ = writeln!(text, "  - Oldest File: {}", record(&stats.oldest, day));
        let _ = write!(text, "  - Newest File: {}", record(&stats.newest, day));
        Ok(ToolCallResult::text(text))
    }
}

fn record(record: &Option<FileRecord>, detail: impl Fn(&FileRecord) -> String) -> String {
    match record {
        Some(r) => format!("{} ({})", file_name(&r.path), detail(r)),
        None => "N/A".into(),
    }
}

fn day(record: &FileRecord) -> String {
    DateTime::<Local>::from(record.modified)
        .format("%Y-%m-%d")
        .to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
