use std::collections::BTreeMap;

use crate::types::{DependencyGraph, Grade, HealthStatus, HealthSummary, Layer};

/// Compute the health summary for a finished graph and its layers.
pub fn summarize(graph: &DependencyGraph, layers: &[Layer]) -> HealthSummary {
    let node_count = graph.nodes.len();

    let average_coupling = if node_count == 0 {
        0.0
    } else {
        let total: f64 = graph.nodes.values().map(|n| n.coupling).sum();
        round2(total / node_count as f64)
    };

    let layer_violations = count_layer_violations(graph, layers);
    let max_in_degree = graph.nodes.values().map(|n| n.in_degree).max().unwrap_or(0);
    let max_out_degree = graph.nodes.values().map(|n| n.out_degree).max().unwrap_or(0);
    let orphan_count = graph.orphan_modules().len();
    let entry_point_count = graph.nodes.values().filter(|n| n.is_entry_point).count();
    let circular_dependency_count = graph.cycles.len();

    let score = compute_score(
        graph,
        circular_dependency_count,
        orphan_count,
        layer_violations,
        max_in_degree,
        max_out_degree,
    );

    HealthSummary {
        average_coupling,
        circular_dependency_count,
        layer_violations,
        max_in_degree,
        max_out_degree,
        orphan_count,
        entry_point_count,
        score,
        grade: grade_for(score),
        status: status_for(score),
    }
}

/// Edges whose source layer sits strictly below its target layer point
/// "upward" against the inferred hierarchy.
pub fn count_layer_violations(graph: &DependencyGraph, layers: &[Layer]) -> usize {
    let level_of: BTreeMap<&str, usize> =
        layers.iter().map(|l| (l.id.as_str(), l.level)).collect();
    graph
        .edges
        .iter()
        .filter(|edge| {
            let src_layer = graph
                .nodes
                .get(&edge.source)
                .and_then(|n| n.layer.as_deref())
                .and_then(|l| level_of.get(l));
            let tgt_layer = graph
                .nodes
                .get(&edge.target)
                .and_then(|n| n.layer.as_deref())
                .and_then(|l| level_of.get(l));
            matches!((src_layer, tgt_layer), (Some(s), Some(t)) if s > t)
        })
        .count()
}

/// Piecewise score: start at 100, apply capped deductions, clamp to [0, 100].
fn compute_score(
    graph: &DependencyGraph,
    cycles: usize,
    orphans: usize,
    layer_violations: usize,
    max_in: u32,
    max_out: u32,
) -> u32 {
    let node_count = graph.nodes.len();
    let mut score: i64 = 100;

    score -= (cycles as i64 * 3).min(30);

    // Average dependencies per module (weighted in + out).
    let total_degree: u64 = graph
        .nodes
        .values()
        .map(|n| u64::from(n.in_degree + n.out_degree))
        .sum();
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        total_degree as f64 / node_count as f64
    };
    if avg_degree > 5.0 {
        score -= 5;
    }
    if avg_degree > 10.0 {
        score -= 10;
    }
    if avg_degree > 20.0 {
        score -= 5;
    }

    if node_count > 0 {
        let orphan_ratio = orphans as f64 / node_count as f64;
        if orphan_ratio > 0.1 {
            score -= 5;
        }
        if orphan_ratio > 0.3 {
            score -= 10;
        }
        if orphan_ratio > 0.5 {
            score -= 15;
        }
    }

    score -= (layer_violations as i64).min(15);

    if max_in > 50 {
        score -= 5;
    }
    if max_out > 50 {
        score -= 5;
    }

    // Hubs pull in both directions: >= 5 distinct inbound and outbound modules.
    let hubs = count_hub_modules(graph);
    if hubs > 0 {
        score -= 2;
    }
    if hubs > 3 {
        score -= 5;
    }

    // Mean instability Ce/(Ca+Ce) far from mid-range signals an extreme.
    if let Some(instability) = mean_instability(graph) {
        if !(0.1..=0.9).contains(&instability) {
            score -= 3;
        }
    }

    score.clamp(0, 100) as u32
}

/// Modules with at least five distinct inbound and five distinct outbound
/// neighbors. Collapsed edges make edge counts equal neighbor counts.
fn count_hub_modules(graph: &DependencyGraph) -> usize {
    let mut in_edges: BTreeMap<&str, u32> = BTreeMap::new();
    let mut out_edges: BTreeMap<&str, u32> = BTreeMap::new();
    for edge in &graph.edges {
        *out_edges.entry(edge.source.as_str()).or_insert(0) += 1;
        *in_edges.entry(edge.target.as_str()).or_insert(0) += 1;
    }
    graph
        .nodes
        .keys()
        .filter(|path| {
            in_edges.get(path.as_str()).copied().unwrap_or(0) >= 5
                && out_edges.get(path.as_str()).copied().unwrap_or(0) >= 5
        })
        .count()
}

/// Mean of per-node Ce/(Ca+Ce) over nodes with any degree; None when no
/// node has edges.
fn mean_instability(graph: &DependencyGraph) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for node in graph.nodes.values() {
        let total = node.in_degree + node.out_degree;
        if total == 0 {
            continue;
        }
        sum += f64::from(node.out_degree) / f64::from(total);
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

fn grade_for(score: u32) -> Grade {
    match score {
        90..=100 => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

fn status_for(score: u32) -> HealthStatus {
    if score >= 70 {
        HealthStatus::Healthy
    } else if score >= 50 {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, ModuleEdge, ModuleNode};
    use std::collections::BTreeSet;

    fn node(path: &str, in_degree: u32, out_degree: u32, entry: bool) -> ModuleNode {
        ModuleNode {
            path: path.to_string(),
            name: path.to_string(),
            language: Language::TypeScript,
            in_degree,
            out_degree,
            coupling: 0.0,
            is_entry_point: entry,
            layer: None,
        }
    }

    fn edge(source: &str, target: &str, weight: u32) -> ModuleEdge {
        ModuleEdge {
            source: source.to_string(),
            target: target.to_string(),
            weight,
            kinds: BTreeSet::new(),
        }
    }

    fn layer(id: &str, level: usize) -> Layer {
        Layer {
            id: id.to_string(),
            name: id.to_string(),
            modules: vec![],
            color: "#bdc3c7".to_string(),
            level,
        }
    }

    #[test]
    fn test_empty_graph_scores_perfect() {
        let graph = DependencyGraph::default();
        let health = summarize(&graph, &[]);
        assert_eq!(health.score, 100);
        assert_eq!(health.grade, Grade::A);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.average_coupling, 0.0);
    }

    #[test]
    fn test_cycle_penalty() {
        let mut graph = DependencyGraph::default();
        let mut a = node("a", 1, 1, true);
        a.coupling = 1.0;
        let mut b = node("b", 1, 1, true);
        b.coupling = 1.0;
        graph.nodes.insert("a".to_string(), a);
        graph.nodes.insert("b".to_string(), b);
        graph.edges.push(edge("a", "b", 1));
        graph.edges.push(edge("b", "a", 1));
        graph.cycles.push(vec!["a".to_string(), "b".to_string(), "a".to_string()]);

        let health = summarize(&graph, &[]);
        assert_eq!(health.circular_dependency_count, 1);
        assert_eq!(health.score, 97);
        assert_eq!(health.grade, Grade::A);
    }

    #[test]
    fn test_cycle_penalty_capped() {
        let mut graph = DependencyGraph::default();
        for cycle in 0..20 {
            graph.cycles.push(vec![
                format!("n{cycle}"),
                format!("m{cycle}"),
                format!("n{cycle}"),
            ]);
        }
        let health = summarize(&graph, &[]);
        // 20 cycles would be -60 uncapped; cap holds it at -30.
        assert_eq!(health.score, 70);
    }

    #[test]
    fn test_orphan_ratio_tiers() {
        let mut graph = DependencyGraph::default();
        // One connected pair plus two orphans: ratio 0.5.
        graph.nodes.insert("a".to_string(), node("a", 0, 1, true));
        graph.nodes.insert("b".to_string(), node("b", 1, 0, false));
        graph.nodes.insert("c".to_string(), node("c", 0, 0, false));
        graph.nodes.insert("d".to_string(), node("d", 0, 0, false));
        graph.edges.push(edge("a", "b", 1));

        let health = summarize(&graph, &[]);
        assert_eq!(health.orphan_count, 2);
        // -5 (>10%) and -10 (>30%), not -15 (ratio is exactly 0.5).
        assert_eq!(health.score, 85);
    }

    #[test]
    fn test_layer_violations_counted_and_penalized() {
        let mut graph = DependencyGraph::default();
        let mut low = node("db/m.ts", 0, 1, false);
        low.layer = Some("database".to_string());
        let mut high = node("api/u.ts", 1, 0, false);
        high.layer = Some("api".to_string());
        graph.nodes.insert("db/m.ts".to_string(), low);
        graph.nodes.insert("api/u.ts".to_string(), high);
        graph.edges.push(edge("db/m.ts", "api/u.ts", 1));

        let layers = vec![layer("api", 0), layer("database", 1)];
        let health = summarize(&graph, &layers);
        assert_eq!(health.layer_violations, 1);

        // One violation (-1) plus one orphan of two nodes (-5 -10).
        assert_eq!(health.score, 84);
    }

    #[test]
    fn test_hub_penalty() {
        let mut graph = DependencyGraph::default();
        graph.nodes.insert("hub".to_string(), node("hub", 5, 5, true));
        for i in 0..5 {
            let src = format!("in{i}");
            let dst = format!("out{i}");
            graph.nodes.insert(src.clone(), node(&src, 0, 1, true));
            graph.nodes.insert(dst.clone(), node(&dst, 1, 0, false));
            graph.edges.push(edge(&src, "hub", 1));
            graph.edges.push(edge("hub", &dst, 1));
        }

        let health = summarize(&graph, &[]);
        // Only the hub deduction applies: 11 nodes, avg degree < 5, no orphans.
        assert_eq!(health.score, 98);
    }

    #[test]
    fn test_status_tiers() {
        assert_eq!(status_for(70), HealthStatus::Healthy);
        assert_eq!(status_for(69), HealthStatus::Warning);
        assert_eq!(status_for(50), HealthStatus::Warning);
        assert_eq!(status_for(49), HealthStatus::Critical);
    }

    #[test]
    fn test_grade_tiers() {
        assert_eq!(grade_for(100), Grade::A);
        assert_eq!(grade_for(90), Grade::A);
        assert_eq!(grade_for(89), Grade::B);
        assert_eq!(grade_for(79), Grade::C);
        assert_eq!(grade_for(69), Grade::D);
        assert_eq!(grade_for(59), Grade::F);
    }

    #[test]
    fn test_average_coupling_rounded() {
        let mut graph = DependencyGraph::default();
        let mut a = node("a", 0, 1, true);
        a.coupling = 1.0 / 3.0;
        let mut b = node("b", 1, 0, true);
        b.coupling = 1.0 / 3.0;
        graph.nodes.insert("a".to_string(), a);
        graph.nodes.insert("b".to_string(), b);
        graph.edges.push(edge("a", "b", 1));

        let health = summarize(&graph, &[]);
        assert_eq!(health.average_coupling, 0.33);
    }
}
