use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::config::{is_hex_color, ProjectConfig};
use crate::globs::compile_glob_ci;
use crate::types::{DependencyGraph, Layer};

/// Fallback fill when neither styles nor the palette know a layer.
const FALLBACK_COLOR: &str = "#bdc3c7";

/// Built-in palette, keyed by layer id.
const DEFAULT_PALETTE: &[(&str, &str)] = &[
    ("frontend", "#3498db"),
    ("api", "#1abc9c"),
    ("services", "#e74c3c"),
    ("database", "#9b59b6"),
    ("shared", "#f39c12"),
    ("cli", "#2ecc71"),
    ("config", "#7f8c8d"),
    ("types", "#95a5a6"),
];

/// Built-in classification heuristics: (layer id, path-segment alternatives).
/// Order matters; the first matching rule wins.
const BUILTIN_RULES: &[(&str, &str)] = &[
    ("frontend", "ui|views|pages|components|frontend|app"),
    ("api", "api|routes|controllers|handlers|endpoints"),
    ("services", "services|business|logic|core|domain"),
    ("database", "db|database|models|entities|repositories|data"),
    ("shared", "utils|helpers|lib|common|shared"),
    ("cli", "cli"),
    ("config", "config"),
    ("types", "types"),
];

struct LayerRule {
    regex: Regex,
    layer_id: String,
    color: Option<String>,
    level: usize,
}

/// Assigns modules to layers by ordered pattern rules, then infers the
/// layer hierarchy from observed dependency direction.
pub struct LayerClassifier {
    rules: Vec<LayerRule>,
    styles: BTreeMap<String, String>,
}

impl LayerClassifier {
    /// User grouping rules are prepended at level 0 so they outrank every
    /// built-in heuristic; first match wins.
    pub fn new(config: &ProjectConfig) -> Self {
        let mut rules = Vec::new();
        for rule in &config.grouping {
            let regex = match compile_glob_ci(&rule.pattern) {
                Ok(re) => re,
                Err(err) => {
                    debug!(pattern = %rule.pattern, %err, "skipping unparseable grouping pattern");
                    continue;
                }
            };
            rules.push(LayerRule {
                regex,
                layer_id: slugify(&rule.label),
                color: rule.color.as_deref().filter(|c| is_hex_color(c)).map(str::to_string),
                level: 0,
            });
        }
        for (position, (id, segments)) in BUILTIN_RULES.iter().enumerate() {
            let pattern = format!("(^|/)({segments})(/|$)");
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .expect("built-in layer rule must compile");
            rules.push(LayerRule {
                regex,
                layer_id: (*id).to_string(),
                color: None,
                level: position + 1,
            });
        }
        Self {
            rules,
            styles: config.styles.clone(),
        }
    }

    /// Layer id and provisional level for a module path. Unmatched paths
    /// fall back to their first path segment at level 99 (`root` when the
    /// path has no directory).
    fn classify(&self, path: &str) -> (String, usize, Option<&str>) {
        let normalized = path.replace('\\', "/").to_lowercase();
        for rule in &self.rules {
            if rule.regex.is_match(&normalized) {
                return (rule.layer_id.clone(), rule.level, rule.color.as_deref());
            }
        }
        match normalized.split_once('/') {
            Some((first, _)) => (first.to_string(), 99, None),
            None => ("root".to_string(), 99, None),
        }
    }

    /// Assign a layer to every node and return the layer list, ascending by
    /// inferred level. Within a layer, modules are ordered by descending
    /// (in + out) degree with path as the tie-breaker.
    pub fn assign(&self, graph: &mut DependencyGraph) -> Vec<Layer> {
        struct Draft {
            level: usize,
            color: String,
            modules: Vec<String>,
        }

        let mut drafts: BTreeMap<String, Draft> = BTreeMap::new();
        let paths: Vec<String> = graph.nodes.keys().cloned().collect();
        for path in &paths {
            let (id, level, rule_color) = self.classify(path);
            let color = self.color_for(&id, rule_color);
            let draft = drafts.entry(id.clone()).or_insert_with(|| Draft {
                level,
                color,
                modules: Vec::new(),
            });
            draft.level = draft.level.min(level);
            draft.modules.push(path.clone());
            if let Some(node) = graph.nodes.get_mut(path) {
                node.layer = Some(id);
            }
        }

        let mut layers: Vec<Layer> = drafts
            .into_iter()
            .map(|(id, draft)| {
                let mut modules = draft.modules;
                modules.sort_by(|a, b| {
                    let da = graph.nodes[a].in_degree + graph.nodes[a].out_degree;
                    let db = graph.nodes[b].in_degree + graph.nodes[b].out_degree;
                    db.cmp(&da).then_with(|| a.cmp(b))
                });
                Layer {
                    name: title_case(&id),
                    id,
                    modules,
                    color: draft.color,
                    level: draft.level,
                }
            })
            .collect();

        // Provisional order: rule precedence, then id.
        layers.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.id.cmp(&b.id)));
        infer_hierarchy(&mut layers, graph);
        layers
    }

    fn color_for(&self, id: &str, rule_color: Option<&str>) -> String {
        if let Some(color) = self.styles.get(id) {
            return color.clone();
        }
        if let Some(color) = rule_color {
            return color.to_string();
        }
        DEFAULT_PALETTE
            .iter()
            .find(|(layer, _)| *layer == id)
            .map(|(_, color)| (*color).to_string())
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }
}

/// Reorder layers by aggregate inbound weight over cross-layer edges and
/// reassign levels, so the most depended-upon layers sink to the bottom.
fn infer_hierarchy(layers: &mut [Layer], graph: &DependencyGraph) {
    let layer_of: BTreeMap<&str, &str> = graph
        .nodes
        .values()
        .filter_map(|n| n.layer.as_deref().map(|l| (n.path.as_str(), l)))
        .collect();

    let mut inbound: BTreeMap<&str, u64> = BTreeMap::new();
    for edge in &graph.edges {
        let (Some(&src), Some(&tgt)) = (
            layer_of.get(edge.source.as_str()),
            layer_of.get(edge.target.as_str()),
        ) else {
            continue;
        };
        if src != tgt {
            *inbound.entry(tgt).or_insert(0) += u64::from(edge.weight);
        }
    }

    // Stable sort: ties keep the provisional rule-precedence order.
    layers.sort_by_key(|layer| inbound.get(layer.id.as_str()).copied().unwrap_or(0));
    for (level, layer) in layers.iter_mut().enumerate() {
        layer.level = level;
    }
}

/// Lowercase slug: alphanumeric runs joined by hyphens.
pub fn slugify(label: &str) -> String {
    let mut slug = String::new();
    let mut pending_sep = false;
    for c in label.chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() {
        "group".to_string()
    } else {
        slug
    }
}

/// `user-service` / `user_service` -> `User Service`.
pub fn title_case(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
