//! Recursive scans: content search, duplicate detection, directory statistics.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};
use tracing::debug;
use walkdir::WalkDir;

use super::FileManager;
use crate::error::{Error, Result};

const HASH_CHUNK: usize = 4096;
const TOP_EXTENSIONS: usize = 10;
const NO_EXTENSION: &str = "No extension";

/// A file containing the search term.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMatch {
    pub path: PathBuf,
    /// Case-insensitive, non-overlapping occurrences.
    pub count: usize,
}

/// Files sharing identical content.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub hash: String,
    pub size: u64,
    pub files: Vec<PathBuf>,
}

/// Result of a duplicate scan.
#[derive(Debug, Clone)]
pub struct DuplicateReport {
    pub scanned: usize,
    pub groups: Vec<DuplicateGroup>,
}

/// A file singled out by [`DirectoryStats`].
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Aggregate numbers for a directory tree.
#[derive(Debug, Clone, Default)]
pub struct DirectoryStats {
    pub total_files: usize,
    pub total_dirs: usize,
    pub total_size: u64,
    /// Extension (with dot) or "No extension", most frequent first.
    pub file_types: Vec<(String, usize)>,
    pub largest: Option<FileRecord>,
    pub oldest: Option<FileRecord>,
    pub newest: Option<FileRecord>,
}

impl FileManager {
    /// Find files under `directory` whose text contains `term`.
    ///
    /// `extensions` is a comma-separated list such as `.txt,.md`; `None` uses
    /// the configured default.
    pub fn search_content(
        &self,
        directory: &str,
        term: &str,
        extensions: Option<&str>,
    ) -> Result<Vec<ContentMatch>> {
        if term.is_empty() {
            return Err(Error::InvalidParams("search_term must not be empty".into()));
        }
        let root = self.existing_root(directory)?;
        let extensions = parse_extensions(extensions.unwrap_or(self.default_extensions()));
        let needle = term.to_lowercase();

        let mut matches = Vec::new();
        for path in walk_files(&root) {
            if !has_extension(&path, &extensions) {
                continue;
            }
            let bytes = match fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let haystack = String::from_utf8_lossy(&bytes).to_lowercase();
            let count = haystack.matches(needle.as_str()).count();
            if count > 0 {
                matches.push(ContentMatch { path, count });
            }
        }

        matches.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(matches)
    }

    /// Group files with identical content.
    pub fn find_duplicates(&self, directory: &str, min_size: u64) -> Result<DuplicateReport> {
        let root = self.existing_root(directory)?;

        let mut by_hash: HashMap<String, Vec<(PathBuf, u64)>> = HashMap::new();
        let mut scanned = 0;
        for path in walk_files(&root) {
            let size = match fs::metadata(&path) {
                Ok(m) => m.len(),
                Err(_) => continue,
            };
            if size < min_size {
                continue;
            }
            scanned += 1;
            match hash_file(&path) {
                Ok(hash) => by_hash.entry(hash).or_default().push((path, size)),
                Err(e) => debug!("Cannot hash {}: {}", path.display(), e),
            }
        }

        let mut groups: Vec<DuplicateGroup> = by_hash
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(hash, mut files)| {
                files.sort();
                DuplicateGroup {
                    hash,
                    size: files[0].1,
                    files: files.into_iter().map(|(p, _)| p).collect(),
                }
            })
            .collect();
        groups.sort_by(|a, b| a.files[0].cmp(&b.files[0]));

        Ok(DuplicateReport { scanned, groups })
    }

    /// Count files, directories, sizes and extremes under `directory`.
    pub fn directory_statistics(&self, directory: &str) -> Result<DirectoryStats> {
        let root = self.existing_root(directory)?;

        let mut stats = DirectoryStats::default();
        let mut types: HashMap<String, usize> = HashMap::new();

        for entry in WalkDir::new(&root).min_depth(1).into_iter().filter_map(|e| e.ok()) {
            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.total_dirs += 1;
                continue;
            }
            if !file_type.is_file() {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(m) => m,
                Err(_) => continue,
            };
            let record = FileRecord {
                path: entry.path().to_path_buf(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            };

            stats.total_files += 1;
            stats.total_size += record.size;
            *types.entry(extension_label(&record.path)).or_default() += 1;

            if stats.largest.as_ref().map_or(true, |l| record.size > l.size) {
                stats.largest = Some(record.clone());
            }
            if stats.oldest.as_ref().map_or(true, |o| record.modified < o.modified) {
                stats.oldest = Some(record.clone());
            }
            if stats.newest.as_ref().map_or(true, |n| record.modified > n.modified) {
                stats.newest = Some(record);
            }
        }

        let mut file_types: Vec<_> = types.into_iter().collect();
        file_types.sort_by(|(ea, ca), (eb, cb)| cb.cmp(ca).then_with(|| ea.cmp(eb)));
        file_types.truncate(TOP_EXTENSIONS);
        stats.file_types = file_types;

        Ok(stats)
    }

    pub(super) fn existing_root(&self, directory: &str) -> Result<PathBuf> {
        let root = self.resolve(directory)?;
        if !root.exists() {
            return Err(Error::NotFound(format!(
                "Directory '{}' does not exist.",
                directory
            )));
        }
        Ok(root)
    }
}

/// Regular files under `root`, recursively. Unreadable entries are skipped.
pub(super) fn walk_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Split `.txt, .md` into `[".txt", ".md"]`.
pub(super) fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Exact suffix match, dot included.
pub(super) fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|want| want.strip_prefix('.') == Some(ext)),
        None => false,
    }
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| NO_EXTENSION.to_string())
}

fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root(tmp: &TempDir) -> String {
        tmp.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_search_counts_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), "Rust rust RUST").unwrap();
        fs::write(tmp.path().join("sub/b.md"), "nothing here").unwrap();
        fs::write(tmp.path().join("sub/c.md"), "trusty rust").unwrap();
        fs::write(tmp.path().join("d.rs"), "rust").unwrap();

        let fm = FileManager::default();
        let hits = fm.search_content(&root(&tmp), "rust", None).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].path, tmp.path().join("a.txt"));
        assert_eq!(hits[0].count, 3);
        assert_eq!(hits[1].count, 2);

        let rs = fm.search_content(&root(&tmp), "rust", Some(".rs")).unwrap();
        assert_eq!(rs.len(), 1);
    }

    #[test]
    fn test_search_rejects_empty_term() {
        let tmp = TempDir::new().unwrap();
        let err = FileManager::default()
            .search_content(&root(&tmp), "", None)
            .unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_find_duplicates_groups_identical_content() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("copy")).unwrap();
        fs::write(tmp.path().join("one.txt"), "same bytes").unwrap();
        fs::write(tmp.path().join("copy/two.txt"), "same bytes").unwrap();
        fs::write(tmp.path().join("unique.txt"), "different").unwrap();
        fs::write(tmp.path().join("empty1"), "").unwrap();

        let report = FileManager::default().find_duplicates(&root(&tmp), 1).unwrap();
        assert_eq!(report.scanned, 3);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].size, 10);
        assert_eq!(report.groups[0].files.len(), 2);
        assert_eq!(report.groups[0].hash.len(), 64);
    }

    #[test]
    fn test_directory_statistics() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("x.txt"), "12345").unwrap();
        fs::write(tmp.path().join("a/y.txt"), "1").unwrap();
        fs::write(tmp.path().join("a/b/Makefile"), "all:").unwrap();

        let stats = FileManager::default().directory_statistics(&root(&tmp)).unwrap();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_dirs, 2);
        assert_eq!(stats.total_size, 10);
        assert_eq!(stats.file_types[0], (".txt".to_string(), 2));
        assert_eq!(stats.file_types[1], (NO_EXTENSION.to_string(), 1));
        assert_eq!(stats.largest.unwrap().path, tmp.path().join("x.txt"));
    }

    #[test]
    fn test_statistics_of_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let stats = FileManager::default().directory_statistics(&root(&tmp)).unwrap();
        assert_eq!(stats.total_files, 0);
        assert!(stats.largest.is_none());
        assert!(stats.file_types.is_empty());
    }

    #[test]
    fn test_extension_parsing() {
        let exts = parse_extensions(" .txt, .md ,,");
        assert_eq!(exts, vec![".txt", ".md"]);
        assert!(has_extension(Path::new("/a/notes.md"), &exts));
        assert!(!has_extension(Path::new("/a/notes.MD"), &exts));
        assert!(!has_extension(Path::new("/a/README"), &exts));
    }
}
