use archmap_core::types::AnalysisResult;

/// Render a Mermaid `flowchart TB` with one subgraph per layer.
pub fn render(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str("flowchart TB\n");

    for layer in &result.layers {
        out.push_str(&format!(
            "  subgraph {}[\"{}\"]\n",
            sanitize_id(&layer.id),
            escape_label(&layer.name)
        ));
        for path in &layer.modules {
            let label = result
                .graph
                .nodes
                .get(path)
                .map(|n| n.name.as_str())
                .unwrap_or(path.as_str());
            out.push_str(&format!(
                "    {}[\"{}\"]\n",
                sanitize_id(path),
                escape_label(label)
            ));
        }
        out.push_str("  end\n");
    }

    for edge in &result.graph.edges {
        out.push_str(&format!(
            "  {} --> {}\n",
            sanitize_id(&edge.source),
            sanitize_id(&edge.target)
        ));
    }

    if !result.layers.is_empty() {
        out.push('\n');
        for layer in &result.layers {
            out.push_str(&format!(
                "  style {} fill:{}33,stroke:{}\n",
                sanitize_id(&layer.id),
                layer.color,
                layer.color
            ));
        }
    }

    out
}

/// Reduce a string to `[A-Za-z0-9_]`, prefixing `_` when it starts with a
/// digit so the id stays a valid Mermaid identifier.
pub fn sanitize_id(value: &str) -> String {
    let mut id: String = value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if id.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    if id.is_empty() {
        id.push('_');
    }
    id
}

fn escape_label(label: &str) -> String {
    label.replace('"', "#quot;")
}
