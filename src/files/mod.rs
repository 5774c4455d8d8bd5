//! File manager capability.
//!
//! Plain synchronous filesystem work; the MCP tools run it on the blocking
//! pool. Every caller path goes through [`PathGuard`] first.

mod guard;
mod organize;
mod scan;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use mime_guess::mime;
use tracing::debug;

use crate::config::FilesConfig;
use crate::error::{Error, Result};

pub use guard::{normalize, PathGuard};
pub use organize::{Category, Rename};
pub use scan::{ContentMatch, DirectoryStats, DuplicateGroup, DuplicateReport, FileRecord};

/// File manager bound to a guard and read limit.
#[derive(Debug, Clone)]
pub struct FileManager {
    guard: PathGuard,
    max_read_bytes: u64,
    default_extensions: String,
}

impl FileManager {
    /// Create a file manager from config.
    pub fn new(config: &FilesConfig) -> Self {
        Self {
            guard: PathGuard::new(config.allowed_roots.iter().cloned()),
            max_read_bytes: config.max_read_bytes,
            default_extensions: config.default_search_extensions.clone(),
        }
    }

    /// Extensions searched when the caller gives none.
    pub fn default_extensions(&self) -> &str {
        &self.default_extensions
    }

    /// Resolve a caller path through the guard.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        self.guard.resolve(raw)
    }

    /// List a directory's immediate entries, directories first.
    pub fn list_directory(&self, raw: &str) -> Result<Vec<DirEntryInfo>> {
        let path = self.existing_dir(raw, "Directory")?;

        let mut entries = Vec::new();
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            let size = match kind {
                EntryKind::File => entry.metadata().ok().map(|m| m.len()),
                EntryKind::Directory => None,
            };
            entries.push(DirEntryInfo { name, kind, size });
        }

        entries.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Read a text file, refusing large or binary content.
    pub fn read_file(&self, raw: &str) -> Result<String> {
        let path = self.resolve(raw)?;
        if !path.exists() {
            return Err(Error::NotFound(format!("File '{}' does not exist.", raw)));
        }
        if !path.is_file() {
            return Err(Error::Unsupported(format!("'{}' is not a file.", raw)));
        }

        let size = fs::metadata(&path)?.len();
        if size > self.max_read_bytes {
            return Err(Error::Unsupported(format!(
                "File '{}' is too large (>{}) to read.",
                raw,
                human_limit(self.max_read_bytes)
            )));
        }

        if let Some(guessed) = mime_guess::from_path(&path).first() {
            if !is_textual(&guessed) {
                return Err(Error::Unsupported(format!(
                    "File '{}' appears to be a binary file. MIME type: {}",
                    raw,
                    guessed.essence_str()
                )));
            }
        }

        let bytes = fs::read(&path)?;
        String::from_utf8(bytes).map_err(|_| {
            Error::Unsupported(format!(
                "File '{}' cannot be read as text (encoding issue).",
                raw
            ))
        })
    }

    /// Write a file, creating parent directories. Returns the character count.
    pub fn write_file(&self, raw: &str, content: &str) -> Result<usize> {
        let path = self.resolve(raw)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(content.chars().count())
    }

    /// Create a directory and any missing parents.
    pub fn create_directory(&self, raw: &str) -> Result<PathBuf> {
        let path = self.resolve(raw)?;
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    /// Delete a file, or a directory with all its contents.
    pub fn delete(&self, raw: &str) -> Result<EntryKind> {
        let path = self.resolve(raw)?;
        let meta = fs::symlink_metadata(&path)
            .map_err(|_| Error::NotFound(format!("Path '{}' does not exist.", raw)))?;

        if meta.is_dir() {
            fs::remove_dir_all(&path)?;
            Ok(EntryKind::Directory)
        } else {
            fs::remove_file(&path)?;
            Ok(EntryKind::File)
        }
    }

    /// Metadata for a file or directory.
    pub fn file_info(&self, raw: &str) -> Result<FileInfo> {
        let path = self.resolve(raw)?;
        let meta = fs::metadata(&path)
            .map_err(|_| Error::NotFound(format!("Path '{}' does not exist.", raw)))?;

        let modified = meta.modified()?;
        let created = meta.created().unwrap_or(modified);
        let mime_type = if meta.is_dir() {
            None
        } else {
            mime_guess::from_path(&path)
                .first()
                .map(|m| m.essence_str().to_string())
        };

        Ok(FileInfo {
            kind: if meta.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            },
            size: meta.len(),
            created: local_time(created),
            modified: local_time(modified),
            mime_type,
            encoding: content_encoding(&path).map(str::to_string),
            absolute_path: fs::canonicalize(&path).unwrap_or(path),
        })
    }

    /// One-line description used by the `file://` resource.
    pub fn describe_resource(&self, raw: &str) -> String {
        match self.resolve(raw) {
            Ok(path) if path.exists() => format!("File resource: {} (exists)", raw),
            Ok(_) => format!("File resource: {} (does not exist)", raw),
            Err(e) => format!("File resource error: {}", e),
        }
    }

    fn existing_dir(&self, raw: &str, label: &str) -> Result<PathBuf> {
        let path = self.resolve(raw)?;
        if !path.exists() {
            return Err(Error::NotFound(format!("{} '{}' does not exist.", label, raw)));
        }
        if !path.is_dir() {
            return Err(Error::Unsupported(format!("'{}' is not a directory.", raw)));
        }
        Ok(path)
    }
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new(&FilesConfig::default())
    }
}

/// Kind of a directory entry. Directories order before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntryKind {
    Directory,
    File,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
    /// File size in bytes; `None` for directories or unreadable metadata.
    pub size: Option<u64>,
}

/// Result of [`FileManager::file_info`].
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub kind: EntryKind,
    pub size: u64,
    pub created: DateTime<Local>,
    pub modified: DateTime<Local>,
    pub mime_type: Option<String>,
    pub encoding: Option<String>,
    pub absolute_path: PathBuf,
}

fn local_time(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

fn human_limit(bytes: u64) -> String {
    if bytes >= 1024 * 1024 && bytes % (1024 * 1024) == 0 {
        format!("{}MB", bytes / (1024 * 1024))
    } else {
        format!("{} bytes", bytes)
    }
}

/// Text, or a structured-text application type.
fn is_textual(m: &mime::Mime) -> bool {
    if m.type_() == mime::TEXT {
        return true;
    }
    if m.suffix() == Some(mime::JSON) || m.suffix() == Some(mime::XML) {
        return true;
    }
    matches!(
        m.essence_str(),
        "application/json"
            | "application/xml"
            | "application/javascript"
            | "application/toml"
            | "application/x-sh"
            | "application/x-yaml"
            | "application/yaml"
    )
}

/// Compression encoding implied by the file extension.
fn content_encoding(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()? {
        "gz" => Some("gzip"),
        "bz2" => Some("bzip2"),
        "xz" => Some("xz"),
        "br" => Some("br"),
        "Z" => Some("compress"),
        _ => None,
    }
}
