use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One user-supplied grouping rule. Rules are ordered; the first matching
/// pattern wins and outranks every built-in classifier rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingRule {
    /// Glob pattern matched against the root-relative module path.
    pub pattern: String,
    /// Layer label; slugified to form the layer id.
    pub label: String,
    /// Optional `#RRGGBB` color for the layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Output settings. The analysis core does not consume these; they are
/// passed through to whichever emitter the caller selects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    #[serde(default = "default_output_filename")]
    pub filename: String,
    #[serde(default = "default_output_formats")]
    pub formats: Vec<String>,
}

fn default_output_directory() -> String {
    "architecture".to_string()
}

fn default_output_filename() -> String {
    "architecture".to_string()
}

fn default_output_formats() -> Vec<String> {
    vec!["drawio".to_string()]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            filename: default_output_filename(),
            formats: default_output_formats(),
        }
    }
}

/// Top-level configuration from `.archmap.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Glob patterns for paths to skip during scanning.
    #[serde(default = "default_ignore_patterns")]
    pub ignore: Vec<String>,
    /// Ordered layer grouping overrides.
    #[serde(default)]
    pub grouping: Vec<GroupingRule>,
    /// Layer-id → `#RRGGBB` color overrides.
    #[serde(default)]
    pub styles: BTreeMap<String, String>,
    /// File extensions to analyze; entries are `.`-prefixed if missing.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "node_modules/**",
        "**/node_modules/**",
        "dist/**",
        "build/**",
        "target/**",
        "vendor/**",
        ".git/**",
        "**/__pycache__/**",
        "**/*.d.ts",
        "**/*_test.go",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    [
        ".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts", ".py", ".pyw", ".pyi",
        ".go", ".java",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            ignore: default_ignore_patterns(),
            grouping: Vec::new(),
            styles: BTreeMap::new(),
            extensions: default_extensions(),
            output: OutputConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a `.archmap.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.normalize();
        Ok(config)
    }

    /// Load from `.archmap.toml` in the given directory, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let config_path = dir.join(".archmap.toml");
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Normalize extensions to `.`-prefixed lowercase and drop style entries
    /// that are not 6-digit hex colors.
    pub fn normalize(&mut self) {
        for ext in &mut self.extensions {
            let lowered = ext.to_lowercase();
            *ext = if lowered.starts_with('.') {
                lowered
            } else {
                format!(".{lowered}")
            };
        }
        self.styles.retain(|layer, color| {
            if is_hex_color(color) {
                true
            } else {
                warn!(layer, color, "ignoring invalid style color");
                false
            }
        });
    }

    /// Generate default TOML content for `archmap init`.
    pub fn default_toml() -> String {
        r##"# archmap - architecture analysis configuration

# Glob patterns for paths to skip. `*` matches within a path segment,
# `**` matches across segments.
ignore = [
  "node_modules/**",
  "**/node_modules/**",
  "dist/**",
  "build/**",
  "target/**",
  "vendor/**",
  ".git/**",
  "**/__pycache__/**",
  "**/*.d.ts",
  "**/*_test.go",
]

# File extensions to analyze.
extensions = [".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs", ".mts", ".cts", ".py", ".pyw", ".pyi", ".go", ".java"]

# Ordered grouping rules; the first matching pattern wins and outranks
# the built-in layer heuristics.
# [[grouping]]
# pattern = "src/legacy/**"
# label = "Legacy"
# color = "#8e44ad"

# Layer color overrides (layer id -> hex color).
# [styles]
# services = "#c0392b"

[output]
directory = "architecture"
filename = "architecture"
formats = ["drawio"]
"##
        .to_string()
    }
}

/// True for `#RRGGBB` with exactly six hex digits.
pub fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert!(config.ignore.iter().any(|p| p.contains("node_modules")));
        assert!(config.extensions.contains(&".ts".to_string()));
        assert_eq!(config.output.formats, vec!["drawio"]);
    }

    #[test]
    fn test_default_toml_is_valid() {
        let toml_str = ProjectConfig::default_toml();
        let config: ProjectConfig = toml::from_str(&toml_str).unwrap();
        assert!(!config.ignore.is_empty());
    }

    #[test]
    fn test_deserialize_config() {
        let toml_str = r##"
ignore = ["generated/**"]
extensions = ["ts", ".PY"]

[[grouping]]
pattern = "src/web/**"
label = "Web UI"
color = "#123abc"

[styles]
services = "#c0392b"
"##;
        let mut config: ProjectConfig = toml::from_str(toml_str).unwrap();
        config.normalize();
        assert_eq!(config.ignore, vec!["generated/**"]);
        assert_eq!(config.extensions, vec![".ts", ".py"]);
        assert_eq!(config.grouping.len(), 1);
        assert_eq!(config.grouping[0].label, "Web UI");
        assert_eq!(config.styles.get("services").map(String::as_str), Some("#c0392b"));
    }

    #[test]
    fn test_invalid_styles_dropped() {
        let toml_str = r##"
[styles]
ok = "#abcdef"
short = "#abc"
noprefix = "abcdef"
words = "red"
"##;
        let mut config: ProjectConfig = toml::from_str(toml_str).unwrap();
        config.normalize();
        assert_eq!(config.styles.len(), 1);
        assert!(config.styles.contains_key("ok"));
    }

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#00ff99"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("#fff"));
        assert!(!is_hex_color("00ff99"));
        assert!(!is_hex_color("#00ff9g"));
    }
}
