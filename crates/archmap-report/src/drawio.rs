use archmap_core::layout::{DiagramLayout, LayoutNode};
use archmap_core::types::AnalysisResult;

/// Render a draw.io (mxGraph) document from a planned layout. Layer groups
/// become swimlanes, modules rounded rectangles, dependencies orthogonal
/// edges.
pub fn render(result: &AnalysisResult, layout: &DiagramLayout) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<mxfile host=\"archmap\" modified=\"{}\" agent=\"archmap\" version=\"1.0\">\n",
        escape_xml(&result.generated_at.to_rfc3339())
    ));
    out.push_str("  <diagram id=\"architecture\" name=\"Architecture\">\n");
    out.push_str(&format!(
        "    <mxGraphModel dx=\"0\" dy=\"0\" grid=\"0\" guides=\"1\" tooltips=\"1\" connect=\"1\" arrows=\"1\" page=\"1\" pageWidth=\"{}\" pageHeight=\"{}\">\n",
        layout.width.round(),
        layout.height.round()
    ));
    out.push_str("      <root>\n");
    out.push_str("        <mxCell id=\"0\"/>\n");
    out.push_str("        <mxCell id=\"1\" parent=\"0\"/>\n");

    for node in &layout.nodes {
        if node.is_group {
            out.push_str(&render_group(node));
        } else {
            out.push_str(&render_module(node, layout));
        }
    }

    for edge in &layout.edges {
        out.push_str(&format!(
            "        <mxCell id=\"{}\" style=\"edgeStyle=orthogonalEdgeStyle;rounded=1;curved=1;strokeWidth={};strokeColor=#7f8c8d;\" edge=\"1\" parent=\"1\" source=\"{}\" target=\"{}\">\n",
            escape_xml(&edge.id),
            edge.stroke_width,
            escape_xml(&edge.source),
            escape_xml(&edge.target)
        ));
        out.push_str("          <mxGeometry relative=\"1\" as=\"geometry\"/>\n");
        out.push_str("        </mxCell>\n");
    }

    out.push_str("      </root>\n");
    out.push_str("    </mxGraphModel>\n");
    out.push_str("  </diagram>\n");
    out.push_str("</mxfile>\n");
    out
}

fn render_group(node: &LayoutNode) -> String {
    let style = format!(
        "swimlane;horizontal=1;startSize=30;rounded=1;fillColor={};strokeColor={};fontColor={};fontStyle=1;",
        node.fill, node.stroke, node.font_color
    );
    format!(
        "        <mxCell id=\"{}\" value=\"{}\" style=\"{}\" vertex=\"1\" parent=\"1\">\n          <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/>\n        </mxCell>\n",
        escape_xml(&node.id),
        escape_xml(&node.label),
        escape_xml(&style),
        node.x,
        node.y,
        node.width,
        node.height
    )
}

/// Module cells are children of their swimlane; coordinates are relative to
/// the group origin.
fn render_module(node: &LayoutNode, layout: &DiagramLayout) -> String {
    let (parent_id, parent_x, parent_y) = node
        .parent
        .as_deref()
        .and_then(|pid| {
            layout
                .nodes
                .iter()
                .find(|n| n.id == pid)
                .map(|p| (pid, p.x, p.y))
        })
        .unwrap_or(("1", 0.0, 0.0));

    let style = format!(
        "rounded=1;whiteSpace=wrap;html=1;fillColor={};strokeColor={};fontColor={};",
        node.fill, node.stroke, node.font_color
    );
    format!(
        "        <mxCell id=\"{}\" value=\"{}\" style=\"{}\" vertex=\"1\" parent=\"{}\">\n          <mxGeometry x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" as=\"geometry\"/>\n        </mxCell>\n",
        escape_xml(&node.id),
        escape_xml(&node.label),
        escape_xml(&style),
        escape_xml(parent_id),
        node.x - parent_x,
        node.y - parent_y,
        node.width,
        node.height
    )
}

/// Escape the five XML-special characters for attribute and text positions.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
