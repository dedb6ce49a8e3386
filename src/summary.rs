//! The root-level wrapper: precomputed totals/counts over a [`RollResult`]
//! tree, plus its two printed forms and JSON projection.

use serde::Serialize;

use crate::rolldie::RolledDie;
use crate::rollresult::RollResult;

/// Caches the root [`RollResult`]'s totals, flag counts, and kept/discarded
/// pools so callers don't need to re-walk `detailed_results` themselves.
#[derive(Debug, Clone, Serialize)]
pub struct RollSummary {
    pub expression: String,
    pub total: i64,
    /// The root's kept dice.
    pub results: Vec<RolledDie>,
    /// The root's discarded dice.
    pub discarded: Vec<RolledDie>,
    #[serde(rename = "successCount")]
    pub success_count: usize,
    #[serde(rename = "failureCount")]
    pub failure_count: usize,
    #[serde(rename = "critSuccessCount")]
    pub crit_success_count: usize,
    #[serde(rename = "critFailureCount")]
    pub crit_failure_count: usize,
    /// The root node, retained for graph inspection.
    #[serde(rename = "detailedResults")]
    pub detailed_results: RollResult,
}

impl RollSummary {
    pub fn new(expression: impl Into<String>, root: RollResult) -> Self {
        RollSummary {
            expression: expression.into(),
            total: root.total(),
            results: root.results.clone(),
            discarded: root.discarded.clone(),
            success_count: root.success_count(),
            failure_count: root.failure_count(),
            crit_success_count: root.crit_success_count(),
            crit_failure_count: root.crit_failure_count(),
            detailed_results: root,
        }
    }

    /// A compact one-liner, e.g. `4d6 kh2 => 11`.
    pub fn to_compact_string(&self) -> String {
        let mut s = format!("{} => {}", self.expression, self.total);
        if self.success_count > 0 || self.failure_count > 0 {
            s.push_str(&format!(" ({} success, {} failure)", self.success_count, self.failure_count));
        }
        s
    }

    /// An indented tree dump of the full provenance graph.
    pub fn to_tree_string(&self) -> String {
        let mut out = format!("{}\n", self.expression);
        write_tree(&self.detailed_results, 0, &mut out);
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for RollSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_compact_string())
    }
}

fn write_tree(node: &RollResult, indent: usize, out: &mut String) {
    let pad = "  ".repeat(indent);
    out.push_str(&format!(
        "{pad}{:?} `{}` total={} kept={} discarded={}\n",
        node.op_type,
        node.expression,
        node.total(),
        node.results.len(),
        node.discarded.len()
    ));
    if let Some(left) = &node.left {
        write_tree(left, indent + 1, out);
    }
    if let Some(right) = &node.right {
        write_tree(right, indent + 1, out);
    }
}
