use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use sha2::{Digest, Sha256};

const CACHE_DIR: &str = ".archmap";
const CACHE_FILE: &str = "diagram.hash";

/// Change-detection cache for emitted diagrams, stored as the SHA-256 of
/// the previous emission after normalization.
pub struct DiagramCache {
    path: PathBuf,
}

impl DiagramCache {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(CACHE_DIR).join(CACHE_FILE),
        }
    }

    /// True when no previous emission is recorded or the normalized content
    /// differs from it.
    pub fn has_changed(&self, content: &str) -> bool {
        match std::fs::read_to_string(&self.path) {
            Ok(previous) => previous.trim() != content_hash(&normalize_diagram(content)),
            Err(_) => true,
        }
    }

    /// Record the normalized hash of the latest emission.
    pub fn store(&self, content: &str) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        std::fs::write(&self.path, content_hash(&normalize_diagram(content)))
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// Normalize an emitted document for comparison: drop volatile attributes,
/// collapse inter-tag whitespace, normalize line endings.
pub fn normalize_diagram(content: &str) -> String {
    let unified = content.replace("\r\n", "\n");
    let volatile = Regex::new(r#"\s(?:modified|timestamp|etag)="[^"]*""#)
        .expect("volatile attribute pattern must compile");
    let stripped = volatile.replace_all(&unified, "");
    let between_tags = Regex::new(r">\s+<").expect("inter-tag pattern must compile");
    between_tags.replace_all(&stripped, "><").into_owned()
}

/// SHA-256 of the content, hex-encoded.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
