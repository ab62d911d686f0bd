use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source language of an analyzed module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Java,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::TypeScript => write!(f, "typescript"),
            Language::JavaScript => write!(f, "javascript"),
            Language::Python => write!(f, "python"),
            Language::Go => write!(f, "go"),
            Language::Java => write!(f, "java"),
        }
    }
}

/// Syntactic form of an import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    #[serde(rename = "es6-default")]
    Es6Default,
    #[serde(rename = "es6-named")]
    Es6Named,
    #[serde(rename = "es6-namespace")]
    Es6Namespace,
    #[serde(rename = "commonjs")]
    CommonJs,
    #[serde(rename = "dynamic")]
    Dynamic,
    #[serde(rename = "re-export")]
    ReExport,
    #[serde(rename = "python-import")]
    PythonImport,
    #[serde(rename = "python-from")]
    PythonFrom,
    #[serde(rename = "go-import")]
    GoImport,
    #[serde(rename = "java-import")]
    JavaImport,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportKind::Es6Default => "es6-default",
            ImportKind::Es6Named => "es6-named",
            ImportKind::Es6Namespace => "es6-namespace",
            ImportKind::CommonJs => "commonjs",
            ImportKind::Dynamic => "dynamic",
            ImportKind::ReExport => "re-export",
            ImportKind::PythonImport => "python-import",
            ImportKind::PythonFrom => "python-from",
            ImportKind::GoImport => "go-import",
            ImportKind::JavaImport => "java-import",
        };
        write!(f, "{s}")
    }
}

/// One import statement as recovered from source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// The raw module specifier, e.g. `"./utils"`, `"lodash"`, `"pkg.sub"`.
    pub source: String,
    pub kind: ImportKind,
    /// Imported names, when the syntax carries any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    pub is_relative: bool,
    pub is_external: bool,
    /// 1-based line in the original file content.
    pub line: usize,
}

impl ImportRecord {
    /// Classify an ECMAScript specifier: relative if it starts with `.` or `/`,
    /// external otherwise (scoped `@scope/...` names included).
    pub fn classify_ecma(source: &str) -> (bool, bool) {
        let is_relative = source.starts_with('.') || source.starts_with('/');
        (is_relative, !is_relative)
    }
}

/// A discovered source file, before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Root-relative path, forward-slash normalized.
    pub relative_path: String,
    /// Size of the content in bytes.
    pub size: u64,
    pub language: Language,
}

/// Per-file parser output. Parsers never fail: malformed input yields
/// whatever was recovered plus entries in `errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFile {
    pub file: SourceFile,
    /// Imports in source order.
    pub imports: Vec<ImportRecord>,
    /// Exported names (`"default"` stands in for default exports).
    pub exports: BTreeSet<String>,
    /// Human-readable recovery messages; non-empty means partial data.
    pub errors: Vec<String>,
}

impl ParsedFile {
    pub fn new(file: SourceFile) -> Self {
        Self {
            file,
            imports: Vec::new(),
            exports: BTreeSet::new(),
            errors: Vec::new(),
        }
    }
}

/// Basenames (sans extension, case-folded) treated as entry points.
pub const ENTRY_POINT_NAMES: &[&str] = &["index", "main", "app", "server", "cli", "entry"];

/// A module in the dependency graph, keyed by its root-relative path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    pub path: String,
    /// Display name: basename without extension, or the parent directory
    /// name for `index` files.
    pub name: String,
    pub language: Language,
    /// Weighted in-degree (sum of incoming edge weights).
    pub in_degree: u32,
    /// Weighted out-degree (sum of outgoing edge weights).
    pub out_degree: u32,
    /// (in + out) / max(in + out) over all nodes, in [0, 1].
    pub coupling: f64,
    pub is_entry_point: bool,
    /// Layer id assigned by the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

/// A collapsed dependency edge. Parallel imports from the same source file
/// to the same target accumulate into `weight` and `kinds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEdge {
    pub source: String,
    pub target: String,
    pub weight: u32,
    pub kinds: BTreeSet<ImportKind>,
}

/// Snapshot of the resolved module graph. Nodes iterate ascending by path,
/// edges ascending by (source, target); cycles keep discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<String, ModuleNode>,
    pub edges: Vec<ModuleEdge>,
    pub external_packages: BTreeSet<String>,
    /// Each cycle lists k+1 paths with the first repeated at the end.
    pub cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Modules with normalized coupling above 0.7, ascending by path.
    pub fn high_coupling_modules(&self) -> Vec<&ModuleNode> {
        self.nodes.values().filter(|n| n.coupling > 0.7).collect()
    }

    /// Non-entry-point modules nothing depends on, ascending by path.
    pub fn orphan_modules(&self) -> Vec<&ModuleNode> {
        self.nodes
            .values()
            .filter(|n| n.in_degree == 0 && !n.is_entry_point)
            .collect()
    }
}

/// A horizontal band of modules in the architecture diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    /// Lowercase slug, unique across the result.
    pub id: String,
    /// Title-cased display name.
    pub name: String,
    /// Member module paths, centrality-descending.
    pub modules: Vec<String>,
    /// `#RRGGBB` fill color.
    pub color: String,
    /// 0 = topmost band; ascending in `AnalysisResult.layers`.
    pub level: usize,
}

/// Letter grade derived from the health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::A => write!(f, "A"),
            Grade::B => write!(f, "B"),
            Grade::C => write!(f, "C"),
            Grade::D => write!(f, "D"),
            Grade::F => write!(f, "F"),
        }
    }
}

/// Overall architecture status bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Aggregate health metrics over the final graph and layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Mean per-node coupling, rounded to two decimals.
    pub average_coupling: f64,
    pub circular_dependency_count: usize,
    /// Edges whose source layer sits below its target layer.
    pub layer_violations: usize,
    pub max_in_degree: u32,
    pub max_out_degree: u32,
    pub orphan_count: usize,
    pub entry_point_count: usize,
    /// 0–100 score after penalties.
    pub score: u32,
    pub grade: Grade,
    pub status: HealthStatus,
}

/// Final output of the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub root: PathBuf,
    pub graph: DependencyGraph,
    /// Ascending by `level`.
    pub layers: Vec<Layer>,
    pub generated_at: DateTime<Utc>,
    pub file_count: usize,
    pub edge_count: usize,
    pub health: HealthSummary,
    /// Per-file parse recovery messages, keyed by relative path. Files
    /// listed here still have nodes in the graph.
    #[serde(default)]
    pub parse_errors: BTreeMap<String, Vec<String>>,
}
