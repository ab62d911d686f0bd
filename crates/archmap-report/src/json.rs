use archmap_core::types::AnalysisResult;

/// Format a full analysis result as JSON. Map-like fields are BTree-backed,
/// so the output is canonical for a given result.
pub fn format_report(result: &AnalysisResult, compact: bool) -> String {
    if compact {
        serde_json::to_string(result).expect("AnalysisResult should be serializable")
    } else {
        serde_json::to_string_pretty(result).expect("AnalysisResult should be serializable")
    }
}
