//! Depth, size and weighted cost of an operation under construction.
use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::configuration::Limits;
use crate::structure::SelectionNode;

const PAGINATION_ARGUMENTS: [&str; 4] = ["first", "last", "limit", "count"];
const DEPTH_MULTIPLIER: f64 = 1.2;
const SCORE_WARNING_RATIO: f64 = 0.7;
const DEPTH_WARNING_RATIO: f64 = 0.8;

/// Measurements of a selection tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityReport {
    pub valid: bool,
    pub depth: usize,
    pub field_count: usize,
    pub complexity_score: f64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Measure `structure` against `limits`.
///
/// Root fields are at depth 1, and an empty operation still has depth 1. Each field scores
/// `1 + 0.5 * arguments + 0.3 * directives`, plus `2 * log10(n)` for every pagination argument
/// whose value `n` exceeds 100, scaled by `1.2^depth`. A fragment spread adds 2 to the score
/// and 1 to the field count; fragment definitions are not expanded.
pub fn analyze(structure: &SelectionNode, limits: &Limits) -> ComplexityReport {
    let mut analyzer = Analyzer {
        limits,
        depth: 1,
        field_count: 0,
        score: 0.0,
        errors: Vec::new(),
        visiting: HashSet::new(),
    };
    analyzer.node(structure, 1, "");

    let Analyzer {
        depth,
        field_count,
        score,
        mut errors,
        ..
    } = analyzer;
    let mut warnings = Vec::new();
    if field_count > limits.max_fields {
        errors.push(format!(
            "Query has {field_count} fields, exceeding the maximum of {}",
            limits.max_fields
        ));
    }
    if score > limits.max_score {
        errors.push(format!(
            "Query complexity score {score:.1} exceeds maximum of {}",
            limits.max_score
        ));
    } else if score > limits.max_score * SCORE_WARNING_RATIO {
        warnings.push(format!(
            "Query complexity score {score:.1} is approaching the maximum of {}",
            limits.max_score
        ));
    }
    if depth <= limits.max_depth && depth as f64 > limits.max_depth as f64 * DEPTH_WARNING_RATIO {
        warnings.push(format!(
            "Query depth {depth} is approaching the maximum allowed depth of {}",
            limits.max_depth
        ));
    }

    ComplexityReport {
        valid: errors.is_empty(),
        depth,
        field_count,
        complexity_score: (score * 100.0).round() / 100.0,
        errors,
        warnings,
    }
}

struct Analyzer<'a> {
    limits: &'a Limits,
    depth: usize,
    field_count: usize,
    score: f64,
    errors: Vec<String>,
    /// Paths currently on the recursion stack.
    visiting: HashSet<String>,
}

impl Analyzer<'_> {
    fn node(&mut self, node: &SelectionNode, depth: usize, path: &str) {
        if !self.visiting.insert(path.to_string()) {
            return;
        }
        self.fields(&node.fields, depth, path);
        for _ in &node.fragment_spreads {
            self.score += 2.0;
            self.field_count += 1;
        }
        for fragment in &node.inline_fragments {
            let fragment_path = join(path, &format!("... on {}", fragment.on_type));
            if self.visiting.insert(fragment_path.clone()) {
                self.fields(&fragment.selections, depth + 1, &fragment_path);
                self.visiting.remove(&fragment_path);
            }
        }
        self.visiting.remove(path);
    }

    fn fields(&mut self, fields: &IndexMap<String, SelectionNode>, depth: usize, path: &str) {
        for (key, field) in fields {
            let field_path = join(path, key);
            self.depth = self.depth.max(depth);
            if depth > self.limits.max_depth {
                self.errors.push(format!(
                    "Query depth {depth} exceeds maximum allowed depth of {} at path '{field_path}'",
                    self.limits.max_depth
                ));
                continue;
            }
            self.field_count += 1;
            self.score += field_score(field) * DEPTH_MULTIPLIER.powi(depth as i32);
            self.node(field, depth + 1, &field_path);
        }
    }
}

fn field_score(field: &SelectionNode) -> f64 {
    let pagination: f64 = field
        .args
        .iter()
        .filter(|(name, _)| PAGINATION_ARGUMENTS.contains(&name.as_str()))
        .filter_map(|(_, value)| value.as_f64())
        .filter(|size| *size > 100.0)
        .map(|size| size.log10() * 2.0)
        .sum();
    1.0 + 0.5 * field.args.len() as f64 + 0.3 * field.directives.len() as f64 + pagination
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}
