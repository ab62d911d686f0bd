use archmap_core::types::{AnalysisResult, HealthStatus};

/// Render a self-contained HTML dashboard for an analysis result.
pub fn render(result: &AnalysisResult) -> String {
    let health = &result.health;
    let status_color = match health.status {
        HealthStatus::Healthy => "#2ecc71",
        HealthStatus::Warning => "#f39c12",
        HealthStatus::Critical => "#e74c3c",
    };

    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str(&format!(
        "<title>Architecture Health — {}</title>\n",
        escape_html(&result.root.display().to_string())
    ));
    out.push_str(
        "<style>\n\
         body { font-family: -apple-system, 'Segoe UI', sans-serif; margin: 2rem; color: #2c3e50; }\n\
         h1 { margin-bottom: 0.25rem; }\n\
         .grade { display: inline-block; padding: 0.4rem 1rem; border-radius: 8px; color: #fff; font-size: 1.6rem; font-weight: bold; }\n\
         .tiles { display: flex; flex-wrap: wrap; gap: 1rem; margin: 1.5rem 0; }\n\
         .tile { border: 1px solid #ecf0f1; border-radius: 8px; padding: 1rem 1.5rem; min-width: 8rem; }\n\
         .tile .value { font-size: 1.5rem; font-weight: bold; }\n\
         .tile .label { color: #7f8c8d; font-size: 0.85rem; }\n\
         table { border-collapse: collapse; margin: 1rem 0; }\n\
         th, td { text-align: left; padding: 0.4rem 1rem; border-bottom: 1px solid #ecf0f1; }\n\
         .swatch { display: inline-block; width: 0.9rem; height: 0.9rem; border-radius: 3px; margin-right: 0.4rem; vertical-align: middle; }\n\
         code { background: #f6f8fa; padding: 0.1rem 0.3rem; border-radius: 3px; }\n\
         </style>\n</head>\n<body>\n",
    );

    out.push_str("<h1>Architecture Health</h1>\n");
    out.push_str(&format!(
        "<p><code>{}</code> — generated {}</p>\n",
        escape_html(&result.root.display().to_string()),
        result.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!(
        "<p><span class=\"grade\" style=\"background:{status_color}\">{}</span> score {} · {}</p>\n",
        health.grade, health.score, health.status
    ));

    out.push_str("<div class=\"tiles\">\n");
    for (label, value) in [
        ("Modules", result.graph.nodes.len().to_string()),
        ("Dependencies", result.graph.edges.len().to_string()),
        ("Avg coupling", format!("{:.2}", health.average_coupling)),
        ("Cycles", health.circular_dependency_count.to_string()),
        ("Layer violations", health.layer_violations.to_string()),
        ("Orphans", health.orphan_count.to_string()),
        ("Entry points", health.entry_point_count.to_string()),
        (
            "External packages",
            result.graph.external_packages.len().to_string(),
        ),
    ] {
        out.push_str(&format!(
            "  <div class=\"tile\"><div class=\"value\">{}</div><div class=\"label\">{}</div></div>\n",
            escape_html(&value),
            label
        ));
    }
    out.push_str("</div>\n");

    out.push_str("<h2>Layers</h2>\n<table>\n<tr><th>Layer</th><th>Level</th><th>Modules</th></tr>\n");
    for layer in &result.layers {
        out.push_str(&format!(
            "<tr><td><span class=\"swatch\" style=\"background:{}\"></span>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&layer.color),
            escape_html(&layer.name),
            layer.level,
            layer.modules.len()
        ));
    }
    out.push_str("</table>\n");

    let hotspots = result.graph.high_coupling_modules();
    if !hotspots.is_empty() {
        out.push_str("<h2>Coupling hotspots</h2>\n<table>\n<tr><th>Module</th><th>In</th><th>Out</th><th>Coupling</th></tr>\n");
        for node in hotspots {
            out.push_str(&format!(
                "<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td>{:.2}</td></tr>\n",
                escape_html(&node.path),
                node.in_degree,
                node.out_degree,
                node.coupling
            ));
        }
        out.push_str("</table>\n");
    }

    if !result.graph.cycles.is_empty() {
        out.push_str("<h2>Circular dependencies</h2>\n<ul>\n");
        for cycle in &result.graph.cycles {
            out.push_str(&format!(
                "<li><code>{}</code></li>\n",
                escape_html(&cycle.join(" → "))
            ));
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use archmap_core::types::{
        DependencyGraph, Grade, HealthSummary, Language, Layer, ModuleNode,
    };
    use chrono::Utc;
    use std::path::PathBuf;

    fn sample_result() -> AnalysisResult {
        let mut graph = DependencyGraph::default();
        graph.nodes.insert(
            "api/a.ts".to_string(),
            ModuleNode {
                path: "api/a.ts".to_string(),
                name: "a".to_string(),
                language: Language::TypeScript,
                in_degree: 3,
                out_degree: 4,
                coupling: 0.9,
                is_entry_point: false,
                layer: Some("api".to_string()),
            },
        );
        graph.cycles.push(vec![
            "api/a.ts".to_string(),
            "api/b.ts".to_string(),
            "api/a.ts".to_string(),
        ]);
        AnalysisResult {
            root: PathBuf::from("/repo"),
            file_count: 1,
            edge_count: 0,
            graph,
            layers: vec![Layer {
                id: "api".to_string(),
                name: "Api".to_string(),
                modules: vec!["api/a.ts".to_string()],
                color: "#1abc9c".to_string(),
                level: 0,
            }],
            generated_at: Utc::now(),
            health: HealthSummary {
                average_coupling: 0.9,
                circular_dependency_count: 1,
                layer_violations: 0,
                max_in_degree: 3,
                max_out_degree: 4,
                orphan_count: 0,
                entry_point_count: 0,
                score: 97,
                grade: Grade::A,
                status: HealthStatus::Healthy,
            },
            parse_errors: Default::default(),
        }
    }

    #[test]
    fn test_dashboard_structure() {
        let html = render(&sample_result());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Architecture Health"));
        assert!(html.contains(">A<"));
        assert!(html.contains("Coupling hotspots"));
        assert!(html.contains("Circular dependencies"));
        assert!(html.contains("api/a.ts"));
        assert!(html.ends_with("</html>\n"));
    }

    #[test]
    fn test_escaping() {
        let mut result = sample_result();
        result.root = PathBuf::from("/repo/<evil>&'");
        let html = render(&result);
        assert!(html.contains("&lt;evil&gt;&amp;&#39;"));
    }
}
