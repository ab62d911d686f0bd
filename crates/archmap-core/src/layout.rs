use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::types::{AnalysisResult, ModuleEdge};

pub const NODE_WIDTH: f64 = 160.0;
pub const NODE_HEIGHT: f64 = 50.0;
const GAP_X: f64 = 30.0;
const GAP_Y: f64 = 25.0;
const LAYER_GAP: f64 = 60.0;
const LAYER_HEADER: f64 = 30.0;
const LAYER_PADDING: f64 = 20.0;
const CANVAS_PADDING: f64 = 40.0;
const MAX_COLUMNS: usize = 6;

const GROUP_FONT_COLOR: &str = "#333333";
const MODULE_FONT_COLOR: &str = "#ffffff";

/// A positioned rectangle for the downstream emitters. Layer groups carry
/// `is_group = true` and no parent; module nodes point at their group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    pub id: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub fill: String,
    pub stroke: String,
    pub font_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub is_group: bool,
    /// Module path for module nodes; layer id for groups.
    pub key: String,
}

/// A routed edge between two module nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub weight: u32,
    pub stroke_width: f64,
}

/// Planner output: deterministic node/edge geometry plus canvas size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutOptions {
    /// Apply one barycenter sweep to reduce edge crossings between bands.
    pub minimize_crossings: bool,
}

/// Arrange layers as vertical bands with an internal module grid, then emit
/// one edge per graph edge whose endpoints were laid out.
pub fn plan(result: &AnalysisResult, options: LayoutOptions) -> DiagramLayout {
    let mut member_lists: Vec<Vec<String>> = result
        .layers
        .iter()
        .map(|layer| layer.modules.clone())
        .collect();
    if options.minimize_crossings {
        member_lists = minimize_crossings(&member_lists, &result.graph.edges);
    }

    let mut nodes = Vec::new();
    let mut module_ids: HashMap<&str, String> = HashMap::new();
    let mut group_indices: Vec<usize> = Vec::new();
    let mut running_y = CANVAS_PADDING;
    let mut max_layer_width: f64 = 0.0;

    for (layer, members) in result.layers.iter().zip(&member_lists) {
        let count = members.len();
        let columns = count.clamp(1, MAX_COLUMNS);
        let rows = count.div_ceil(columns).max(1);

        let layer_width =
            2.0 * LAYER_PADDING + columns as f64 * NODE_WIDTH + (columns - 1) as f64 * GAP_X;
        let layer_height = LAYER_HEADER
            + 2.0 * LAYER_PADDING
            + rows as f64 * NODE_HEIGHT
            + (rows - 1) as f64 * GAP_Y;
        max_layer_width = max_layer_width.max(layer_width);

        let layer_x = CANVAS_PADDING;
        let layer_y = running_y;
        let group_id = format!("layer-{}", layer.id);
        group_indices.push(nodes.len());
        nodes.push(LayoutNode {
            id: group_id.clone(),
            label: layer.name.clone(),
            x: layer_x,
            y: layer_y,
            width: layer_width,
            height: layer_height,
            fill: lighten(&layer.color, 90.0),
            stroke: layer.color.clone(),
            font_color: GROUP_FONT_COLOR.to_string(),
            parent: None,
            is_group: true,
            key: layer.id.clone(),
        });

        for (position, path) in members.iter().enumerate() {
            let row = position / columns;
            let column = position % columns;
            let id = format!("module-{path}");
            module_ids.insert(path.as_str(), id.clone());
            nodes.push(LayoutNode {
                id,
                label: module_label(result, path),
                x: layer_x + LAYER_PADDING + column as f64 * (NODE_WIDTH + GAP_X),
                y: layer_y + LAYER_HEADER + LAYER_PADDING + row as f64 * (NODE_HEIGHT + GAP_Y),
                width: NODE_WIDTH,
                height: NODE_HEIGHT,
                fill: layer.color.clone(),
                stroke: darken(&layer.color, 20.0),
                font_color: MODULE_FONT_COLOR.to_string(),
                parent: Some(format!("layer-{}", layer.id)),
                is_group: false,
                key: path.clone(),
            });
        }

        running_y += layer_height + LAYER_GAP;
    }
    if !result.layers.is_empty() {
        running_y -= LAYER_GAP;
    }

    // Align every band to the widest one.
    for index in group_indices {
        nodes[index].width = max_layer_width;
    }

    let mut edges = Vec::new();
    for edge in &result.graph.edges {
        let (Some(source), Some(target)) = (
            module_ids.get(edge.source.as_str()),
            module_ids.get(edge.target.as_str()),
        ) else {
            continue;
        };
        edges.push(LayoutEdge {
            id: format!("edge-{}", edges.len() + 1),
            source: source.clone(),
            target: target.clone(),
            weight: edge.weight,
            stroke_width: stroke_width(edge.weight),
        });
    }

    DiagramLayout {
        nodes,
        edges,
        width: if max_layer_width > 0.0 {
            max_layer_width + 2.0 * CANVAS_PADDING
        } else {
            2.0 * CANVAS_PADDING
        },
        height: running_y + CANVAS_PADDING,
    }
}

fn module_label(result: &AnalysisResult, path: &str) -> String {
    result
        .graph
        .nodes
        .get(path)
        .map(|n| n.name.clone())
        .unwrap_or_else(|| path.to_string())
}

/// Edge thickness grows with the log of the collapsed weight, within [1, 3].
pub fn stroke_width(weight: u32) -> f64 {
    (1.0 + f64::from(weight.max(1)).log2()).clamp(1.0, 3.0)
}

/// One barycenter sweep: reorder each band (from the second onward) by the
/// mean index of its inbound neighbors in the previous band. Nodes with no
/// inbound neighbor there sort to the end, keeping their relative order.
pub fn minimize_crossings(layers: &[Vec<String>], edges: &[ModuleEdge]) -> Vec<Vec<String>> {
    let mut inbound: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges {
        inbound
            .entry(edge.target.as_str())
            .or_default()
            .push(edge.source.as_str());
    }

    let mut result: Vec<Vec<String>> = Vec::with_capacity(layers.len());
    for (band, members) in layers.iter().enumerate() {
        if band == 0 {
            result.push(members.clone());
            continue;
        }
        let previous: BTreeMap<&str, usize> = result[band - 1]
            .iter()
            .enumerate()
            .map(|(index, path)| (path.as_str(), index))
            .collect();

        let mut keyed: Vec<(bool, f64, usize, String)> = members
            .iter()
            .enumerate()
            .map(|(original, path)| {
                let positions: Vec<usize> = inbound
                    .get(path.as_str())
                    .map(|sources| {
                        sources
                            .iter()
                            .filter_map(|s| previous.get(s).copied())
                            .collect()
                    })
                    .unwrap_or_default();
                if positions.is_empty() {
                    (true, 0.0, original, path.clone())
                } else {
                    let mean = positions.iter().sum::<usize>() as f64 / positions.len() as f64;
                    (false, mean, original, path.clone())
                }
            })
            .collect();
        keyed.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.2.cmp(&b.2))
        });
        result.push(keyed.into_iter().map(|(_, _, _, path)| path).collect());
    }
    result
}

/// Additive per-channel lighten: each channel gains `percent * 2.55`.
pub fn lighten(hex: &str, percent: f64) -> String {
    shift_color(hex, percent * 2.55)
}

/// Additive per-channel darken: each channel loses `percent * 2.55`.
pub fn darken(hex: &str, percent: f64) -> String {
    shift_color(hex, -percent * 2.55)
}

fn shift_color(hex: &str, delta: f64) -> String {
    let Some((r, g, b)) = parse_hex(hex) else {
        return hex.to_string();
    };
    let shift = |c: u8| -> u8 { (f64::from(c) + delta).clamp(0.0, 255.0).round() as u8 };
    format!("#{:02x}{:02x}{:02x}", shift(r), shift(g), shift(b))
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        DependencyGraph, Grade, HealthStatus, HealthSummary, ImportKind, Language, Layer,
        ModuleNode,
    };
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn make_result(layers: Vec<(&str, Vec<&str>)>, edges: Vec<(&str, &str, u32)>) -> AnalysisResult {
        let mut graph = DependencyGraph::default();
        for (_, modules) in &layers {
            for path in modules {
                graph.nodes.insert(
                    (*path).to_string(),
                    ModuleNode {
                        path: (*path).to_string(),
                        name: path.rsplit('/').next().unwrap().to_string(),
                        language: Language::TypeScript,
                        in_degree: 0,
                        out_degree: 0,
                        coupling: 0.0,
                        is_entry_point: false,
                        layer: None,
                    },
                );
            }
        }
        for (source, target, weight) in edges {
            graph.edges.push(ModuleEdge {
                source: source.to_string(),
                target: target.to_string(),
                weight,
                kinds: BTreeSet::from([ImportKind::Es6Named]),
            });
        }
        let layers: Vec<Layer> = layers
            .into_iter()
            .enumerate()
            .map(|(level, (id, modules))| Layer {
                id: id.to_string(),
                name: id.to_string(),
                modules: modules.into_iter().map(String::from).collect(),
                color: "#3498db".to_string(),
                level,
            })
            .collect();
        AnalysisResult {
            root: PathBuf::from("/repo"),
            file_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
            graph,
            layers,
            generated_at: Utc::now(),
            health: HealthSummary {
                average_coupling: 0.0,
                circular_dependency_count: 0,
                layer_violations: 0,
                max_in_degree: 0,
                max_out_degree: 0,
                orphan_count: 0,
                entry_point_count: 0,
                score: 100,
                grade: Grade::A,
                status: HealthStatus::Healthy,
            },
            parse_errors: BTreeMap::new(),
        }
    }

    #[test]
    fn test_single_layer_geometry() {
        let result = make_result(vec![("api", vec!["api/a.ts", "api/b.ts"])], vec![]);
        let layout = plan(&result, LayoutOptions::default());

        let group = &layout.nodes[0];
        assert!(group.is_group);
        assert_eq!(group.x, 40.0);
        assert_eq!(group.y, 40.0);
        // 2 columns: 2*20 + 2*160 + 30 = 390
        assert_eq!(group.width, 390.0);
        // 30 + 2*20 + 50 = 120
        assert_eq!(group.height, 120.0);

        let first = &layout.nodes[1];
        assert!(!first.is_group);
        assert_eq!(first.x, 40.0 + 20.0);
        assert_eq!(first.y, 40.0 + 30.0 + 20.0);
        assert_eq!(first.width, NODE_WIDTH);
        assert_eq!(first.parent.as_deref(), Some("layer-api"));

        let second = &layout.nodes[2];
        assert_eq!(second.x, first.x + NODE_WIDTH + 30.0);
        assert_eq!(second.y, first.y);

        assert_eq!(layout.width, 390.0 + 80.0);
        assert_eq!(layout.height, 40.0 + 120.0 + 40.0);
    }

    #[test]
    fn test_grid_wraps_after_six_columns() {
        let modules: Vec<String> = (0..7).map(|i| format!("api/m{i}.ts")).collect();
        let module_refs: Vec<&str> = modules.iter().map(String::as_str).collect();
        let result = make_result(vec![("api", module_refs)], vec![]);
        let layout = plan(&result, LayoutOptions::default());

        let group = &layout.nodes[0];
        // 6 columns, 2 rows.
        assert_eq!(group.width, 2.0 * 20.0 + 6.0 * 160.0 + 5.0 * 30.0);
        assert_eq!(group.height, 30.0 + 2.0 * 20.0 + 2.0 * 50.0 + 25.0);

        let seventh = &layout.nodes[7];
        assert_eq!(seventh.x, layout.nodes[1].x);
        assert_eq!(seventh.y, layout.nodes[1].y + NODE_HEIGHT + 25.0);
    }

    #[test]
    fn test_layers_stack_and_align() {
        let result = make_result(
            vec![
                ("api", vec!["api/a.ts"]),
                ("services", vec!["services/a.ts", "services/b.ts"]),
            ],
            vec![],
        );
        let layout = plan(&result, LayoutOptions::default());

        let groups: Vec<&LayoutNode> = layout.nodes.iter().filter(|n| n.is_group).collect();
        assert_eq!(groups.len(), 2);
        // Both bands widened to the widest (two-column) band.
        assert_eq!(groups[0].width, groups[1].width);
        assert_eq!(groups[1].y, groups[0].y + groups[0].height + 60.0);
    }

    #[test]
    fn test_edges_reference_layout_nodes() {
        let result = make_result(
            vec![
                ("api", vec!["api/a.ts"]),
                ("services", vec!["services/s.ts"]),
            ],
            vec![("api/a.ts", "services/s.ts", 2)],
        );
        let layout = plan(&result, LayoutOptions::default());

        assert_eq!(layout.edges.len(), 1);
        let edge = &layout.edges[0];
        assert_eq!(edge.id, "edge-1");
        assert!(layout.nodes.iter().any(|n| n.id == edge.source));
        assert!(layout.nodes.iter().any(|n| n.id == edge.target));
        assert_eq!(edge.stroke_width, 2.0);
    }

    #[test]
    fn test_stroke_width_clamped() {
        assert_eq!(stroke_width(1), 1.0);
        assert_eq!(stroke_width(2), 2.0);
        assert_eq!(stroke_width(4), 3.0);
        assert_eq!(stroke_width(64), 3.0);
    }

    #[test]
    fn test_color_math() {
        assert_eq!(darken("#646464", 20.0), "#313131");
        assert_eq!(lighten("#646464", 90.0), "#ffffff");
        assert_eq!(lighten("#000000", 90.0), "#e6e6e6");
        // Invalid input passes through untouched.
        assert_eq!(lighten("bogus", 90.0), "bogus");
    }

    #[test]
    fn test_barycenter_reorders_second_band() {
        let layers = vec![
            vec!["top/a".to_string(), "top/b".to_string()],
            vec!["low/x".to_string(), "low/y".to_string()],
        ];
        // a -> y and b -> x: mirrored edges should swap the second band.
        let edges = vec![
            ModuleEdge {
                source: "top/a".to_string(),
                target: "low/y".to_string(),
                weight: 1,
                kinds: BTreeSet::new(),
            },
            ModuleEdge {
                source: "top/b".to_string(),
                target: "low/x".to_string(),
                weight: 1,
                kinds: BTreeSet::new(),
            },
        ];
        let reordered = minimize_crossings(&layers, &edges);
        assert_eq!(reordered[0], layers[0]);
        assert_eq!(reordered[1], vec!["low/y".to_string(), "low/x".to_string()]);
    }

    #[test]
    fn test_barycenter_unlinked_nodes_sink() {
        let layers = vec![
            vec!["top/a".to_string()],
            vec!["low/free".to_string(), "low/linked".to_string()],
        ];
        let edges = vec![ModuleEdge {
            source: "top/a".to_string(),
            target: "low/linked".to_string(),
            weight: 1,
            kinds: BTreeSet::new(),
        }];
        let reordered = minimize_crossings(&layers, &edges);
        assert_eq!(
            reordered[1],
            vec!["low/linked".to_string(), "low/free".to_string()]
        );
    }

    #[test]
    fn test_empty_result_layout() {
        let result = make_result(vec![], vec![]);
        let layout = plan(&result, LayoutOptions::default());
        assert!(layout.nodes.is_empty());
        assert!(layout.edges.is_empty());
        assert_eq!(layout.width, 80.0);
        assert_eq!(layout.height, 80.0);
    }
}
