//! FILENAME: engine/src/dependency_extractor.rs
//! PURPOSE: Extracts the cell references of a parsed expression.
//! CONTEXT: After cell text is parsed into an expression tree, this module
//! walks the tree to find every cell the expression directly reads. The
//! resulting set drives both cycle detection and dependency-edge rewriting.
//! Ranges (e.g. SUM(A1:B10)) expand to every cell within the range;
//! duplicate references coalesce to a single entry.

use parser::{ExprKind, Expression};
use std::collections::HashSet;

/// Returns the names of all cells the expression directly references.
pub fn extract_references(exp: &Expression) -> HashSet<String> {
    let mut references = HashSet::new();
    collect(exp.kind(), &mut references);
    references
}

fn collect(kind: &ExprKind, references: &mut HashSet<String>) {
    match kind {
        ExprKind::Identifier(name) => {
            references.insert(name.clone());
        }
        ExprKind::Compound { lhs, rhs, .. } => {
            collect(lhs.kind(), references);
            collect(rhs.kind(), references);
        }
        ExprKind::RangeFn { range, .. } => {
            references.extend(range.all_cell_names());
        }
        ExprKind::Number(_) | ExprKind::Text(_) => {}
    }
}
