use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::graph::ModuleGraph;
use crate::health;
use crate::layer::LayerClassifier;
use crate::parser::{LanguageParser, ParserRegistry};
use crate::scanner;
use crate::types::{AnalysisResult, ParsedFile};

/// Reusable analysis pipeline: scan, parse, build the graph, classify
/// layers, summarize health.
pub struct AnalysisPipeline {
    registry: ParserRegistry,
    config: ProjectConfig,
    classifier: LayerClassifier,
}

impl AnalysisPipeline {
    pub fn new(parsers: Vec<Box<dyn LanguageParser>>, config: ProjectConfig) -> Self {
        let classifier = LayerClassifier::new(&config);
        Self {
            registry: ParserRegistry::new(parsers),
            config,
            classifier,
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Run a full analysis on the given project root.
    ///
    /// Per-file parse failures land in the corresponding node's error list;
    /// only an unusable root or an empty parser registry is fatal. A scan
    /// that finds nothing yields an empty result.
    pub fn analyze(&self, root: &Path) -> Result<AnalysisResult> {
        if self.registry.is_empty() {
            bail!("no parsers registered for the configured extensions");
        }
        let metadata = std::fs::metadata(root)
            .with_context(|| format!("cannot read project root {}", root.display()))?;
        if !metadata.is_dir() {
            bail!("project root {} is not a directory", root.display());
        }

        let files = scanner::scan(root, &self.config);
        if files.is_empty() {
            warn!(root = %root.display(), "no source files matched the configured extensions");
        }

        let mut parsed: Vec<ParsedFile> = files
            .par_iter()
            .filter_map(|path| {
                let Some(parser) = self.registry.parser_for(path) else {
                    debug!(path = %path.display(), "no parser for file");
                    return None;
                };
                let content = match std::fs::read(path) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(err) => {
                        let mut file = ParsedFile::new(crate::parser::source_file(
                            path,
                            root,
                            "",
                            parser.language(),
                        ));
                        file.errors.push(format!("failed to read file: {err}"));
                        return Some(file);
                    }
                };
                Some(parser.parse(&content, path, root))
            })
            .collect();
        parsed.sort_by(|a, b| a.file.relative_path.cmp(&b.file.relative_path));

        let mut graph = ModuleGraph::build(&parsed).finish();
        let layers = self.classifier.assign(&mut graph);
        let health = health::summarize(&graph, &layers);
        let parse_errors = parsed
            .iter()
            .filter(|file| !file.errors.is_empty())
            .map(|file| (file.file.relative_path.clone(), file.errors.clone()))
            .collect();

        Ok(AnalysisResult {
            root: root.to_path_buf(),
            file_count: parsed.len(),
            edge_count: graph.edges.len(),
            graph,
            layers,
            generated_at: Utc::now(),
            health,
            parse_errors,
        })
    }
}
