use colored::Colorize;

use archmap_core::types::{AnalysisResult, HealthStatus};

/// Format a full analysis report for terminal output.
pub fn format_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let health = &result.health;

    out.push_str(&format!("\n{}\n", "archmap - Architecture Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    let status = match health.status {
        HealthStatus::Healthy => "healthy".green().bold().to_string(),
        HealthStatus::Warning => "warning".yellow().bold().to_string(),
        HealthStatus::Critical => "critical".red().bold().to_string(),
    };
    out.push_str(&format!(
        "{}: {} (grade {}, {status})\n",
        "Score".bold(),
        health.score,
        health.grade
    ));

    out.push_str(&format!(
        "\n{}: {} modules, {} dependencies, {} external packages\n",
        "Summary".bold(),
        result.graph.nodes.len(),
        result.graph.edges.len(),
        result.graph.external_packages.len(),
    ));
    out.push_str(&format!(
        "  avg coupling {:.2} · max in {} · max out {} · {} orphans · {} entry points\n",
        health.average_coupling,
        health.max_in_degree,
        health.max_out_degree,
        health.orphan_count,
        health.entry_point_count,
    ));

    if !result.layers.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Layers".bold(), "-".repeat(40)));
        for layer in &result.layers {
            out.push_str(&format!(
                "  {:>2}. {} ({} modules)\n",
                layer.level,
                layer.name,
                layer.modules.len()
            ));
        }
    }

    if health.layer_violations > 0 {
        out.push_str(&format!(
            "\n{}: {} dependencies point upward against the layer hierarchy\n",
            "Layer violations".red().bold(),
            health.layer_violations
        ));
    }

    if result.graph.cycles.is_empty() {
        out.push_str(&format!("\n{}\n", "No circular dependencies.".green()));
    } else {
        out.push_str(&format!(
            "\n{} ({} found)\n{}\n",
            "Circular dependencies".red().bold(),
            result.graph.cycles.len(),
            "-".repeat(40),
        ));
        for cycle in &result.graph.cycles {
            out.push_str(&format!("  {}\n", cycle.join(" -> ")));
        }
    }

    let hotspots = result.graph.high_coupling_modules();
    if !hotspots.is_empty() {
        out.push_str(&format!("\n{}\n", "Coupling hotspots".yellow().bold()));
        for node in hotspots {
            out.push_str(&format!(
                "  {} (in {}, out {}, coupling {:.2})\n",
                node.path, node.in_degree, node.out_degree, node.coupling
            ));
        }
    }

    out
}
