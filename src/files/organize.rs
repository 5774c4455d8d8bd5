//! Bulk operations: sorting files into category folders and regex renames.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use super::scan::{has_extension, parse_extensions, walk_files};
use super::FileManager;
use crate::error::{Error, Result};

/// Destination folder for a file, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Archives,
    Audio,
    Code,
    Documents,
    Images,
    Others,
    Spreadsheets,
    Videos,
}

impl Category {
    const TABLE: &'static [(Category, &'static [&'static str])] = &[
        (Category::Images, &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"]),
        (Category::Documents, &["pdf", "doc", "docx", "txt", "md", "odt"]),
        (Category::Spreadsheets, &["xls", "xlsx", "csv", "ods"]),
        (Category::Videos, &["mp4", "avi", "mkv", "mov", "wmv", "flv"]),
        (Category::Audio, &["mp3", "wav", "flac", "aac", "ogg", "m4a"]),
        (Category::Archives, &["zip", "rar", "7z", "tar", "gz"]),
        (Category::Code, &["py", "js", "java", "cpp", "c", "h", "cs", "html", "css"]),
    ];

    /// Category for a path, by lowercased extension.
    pub fn of(path: &Path) -> Self {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_lowercase(),
            None => return Category::Others,
        };
        Self::TABLE
            .iter()
            .find(|(_, exts)| exts.contains(&ext.as_str()))
            .map(|(c, _)| *c)
            .unwrap_or(Category::Others)
    }

    /// Folder name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Archives => "Archives",
            Category::Audio => "Audio",
            Category::Code => "Code",
            Category::Documents => "Documents",
            Category::Images => "Images",
            Category::Others => "Others",
            Category::Spreadsheets => "Spreadsheets",
            Category::Videos => "Videos",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A performed rename.
#[derive(Debug, Clone, PartialEq)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

impl FileManager {
    /// Copy every file under `source` into `target/<Category>/`.
    ///
    /// Sources are left in place. Name clashes get a `_N` suffix. Returns the
    /// number of files copied per category.
    pub fn organize_by_type(&self, source: &str, target: &str) -> Result<BTreeMap<Category, usize>> {
        let source_root = self.existing_root(source).map_err(|e| match e {
            Error::NotFound(_) => {
                Error::NotFound(format!("Source directory '{}' does not exist.", source))
            }
            other => other,
        })?;
        let target_root = self.resolve(target)?;
        fs::create_dir_all(&target_root)?;

        // Collected up front so copies landing inside the source are not revisited.
        let files: Vec<PathBuf> = walk_files(&source_root)
            .into_iter()
            .filter(|p| !p.starts_with(&target_root))
            .collect();

        let mut copied = BTreeMap::new();
        for file in files {
            let category = Category::of(&file);
            let dir = target_root.join(category.as_str());
            if let Err(e) = fs::create_dir_all(&dir) {
                warn!("Cannot create {}: {}", dir.display(), e);
                continue;
            }
            let destination = free_name(&dir, &file);
            match fs::copy(&file, &destination) {
                Ok(_) => {
                    debug!("Copied {} -> {}", file.display(), destination.display());
                    *copied.entry(category).or_insert(0) += 1;
                }
                Err(e) => warn!("Cannot copy {}: {}", file.display(), e),
            }
        }

        Ok(copied)
    }

    /// Rename files directly inside `directory` by regex replacement.
    ///
    /// The replacement uses `regex` syntax (`$1`, `${name}`). Existing files
    /// are never overwritten.
    pub fn batch_rename(
        &self,
        directory: &str,
        pattern: &str,
        replacement: &str,
        extensions: Option<&str>,
    ) -> Result<Vec<Rename>> {
        let re = Regex::new(pattern)?;
        let dir = self.existing_root(directory)?;
        let extensions = extensions.map(parse_extensions).filter(|e| !e.is_empty());

        let mut files: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        files.sort();

        let mut renamed = Vec::new();
        for path in files {
            if let Some(exts) = &extensions {
                if !has_extension(&path, exts) {
                    continue;
                }
            }
            let old_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            let new_name = re.replace_all(&old_name, replacement).into_owned();
            if new_name == old_name || new_name.is_empty() || new_name.contains('/') {
                continue;
            }

            let new_path = dir.join(&new_name);
            if new_path.exists() {
                debug!("Not renaming {}: {} exists", old_name, new_name);
                continue;
            }
            if let Err(e) = fs::rename(&path, &new_path) {
                warn!("Failed to rename {} to {}: {}", old_name, new_name, e);
                continue;
            }
            renamed.push(Rename {
                from: old_name,
                to: new_name,
            });
        }

        Ok(renamed)
    }
}

/// First `name`, `stem_1.ext`, `stem_2.ext`, ... that does not exist in `dir`.
fn free_name(dir: &Path, file: &Path) -> PathBuf {
    let name = file.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    let candidate = dir.join(&name);
    if !candidate.exists() {
        return candidate;
    }

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = file
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
