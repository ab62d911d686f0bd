use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::globs::compile_glob;

/// Root-relative path with forward slashes, suitable as a module key.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        s.into_owned()
    } else {
        s.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// Compiled ignore matcher for a config's glob list. Patterns that fail to
/// compile are skipped with a debug log.
pub struct IgnoreSet {
    patterns: Vec<Regex>,
}

impl IgnoreSet {
    pub fn new(globs: &[String]) -> Self {
        let patterns = globs
            .iter()
            .filter_map(|g| match compile_glob(g) {
                Ok(re) => Some(re),
                Err(err) => {
                    debug!(pattern = %g, %err, "skipping unparseable ignore pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_ignored(&self, relative_path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(relative_path))
    }
}

/// Enumerate source files under `root` matching the configured extensions
/// and not matching any ignore glob. Symlinks are not followed; unreadable
/// directories are skipped. The result is ordered ascending by relative
/// path so downstream stages are deterministic.
pub fn scan(root: &Path, config: &ProjectConfig) -> Vec<PathBuf> {
    let ignore = IgnoreSet::new(&config.ignore);

    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!(%err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !has_configured_extension(path, config) {
            continue;
        }
        let rel = relative_slash_path(root, path);
        if ignore.is_ignored(&rel) {
            continue;
        }
        files.push((rel, path.to_path_buf()));
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files.into_iter().map(|(_, p)| p).collect()
}

fn has_configured_extension(path: &Path, config: &ProjectConfig) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let dotted = format!(".{}", ext.to_lowercase());
    config.extensions.iter().any(|e| *e == dotted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_scan_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "src/b.py", "");
        write(dir.path(), "README.md", "");
        write(dir.path(), "Makefile", "");

        let config = ProjectConfig::default();
        let files = scan(dir.path(), &config);
        let rels: Vec<String> = files
            .iter()
            .map(|p| relative_slash_path(dir.path(), p))
            .collect();
        assert_eq!(rels, vec!["src/a.ts", "src/b.py"]);
    }

    #[test]
    fn test_scan_applies_ignore_globs() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "node_modules/lodash/index.js", "");
        write(dir.path(), "packages/x/node_modules/y/z.js", "");
        write(dir.path(), "src/types/api.d.ts", "");

        let config = ProjectConfig::default();
        let files = scan(dir.path(), &config);
        let rels: Vec<String> = files
            .iter()
            .map(|p| relative_slash_path(dir.path(), p))
            .collect();
        assert_eq!(rels, vec!["src/a.ts"]);
    }

    #[test]
    fn test_scan_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/z.ts", "");
        write(dir.path(), "src/a.ts", "");
        write(dir.path(), "lib/m.ts", "");

        let config = ProjectConfig::default();
        let files = scan(dir.path(), &config);
        let rels: Vec<String> = files
            .iter()
            .map(|p| relative_slash_path(dir.path(), p))
            .collect();
        assert_eq!(rels, vec!["lib/m.ts", "src/a.ts", "src/z.ts"]);
    }

    #[test]
    fn test_scan_empty_root_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::default();
        assert!(scan(dir.path(), &config).is_empty());
    }

    #[test]
    fn test_extension_case_folded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/App.TSX", "");

        let config = ProjectConfig::default();
        let files = scan(dir.path(), &config);
        assert_eq!(files.len(), 1);
    }
}
