//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the expression tree for cell contents and its evaluation.
//! CONTEXT: The Parser converts raw cell text into this tree structure. Each
//! node caches the value computed by its most recent evaluation so the
//! spreadsheet can read cell values without recomputing them.
//!
//! NODE KINDS:
//! - Number: a numeric constant such as 3.14 or 42
//! - Text: a text string constant; evaluates to 0.0
//! - Identifier: a reference to another cell, such as A5
//! - Compound: two sub-expressions joined by an arithmetic operator
//! - RangeFn: a range of cells aggregated by a function, such as SUM(B2:B5)

use crate::range::{self, Range};
use std::fmt;

/// Operators accepted by a Compound expression.
pub const KNOWN_OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Errors surfaced while evaluating an expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A Compound expression carries an operator outside + - * /.
    /// The parser never builds such a node; direct construction can.
    IllegalOperator(char),
    /// An Identifier whose name is not a valid cell name.
    UnknownCell(String),
    /// A RangeFn whose function name is not in the known set.
    UnknownFunction(String),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::IllegalOperator(op) => {
                write!(f, "Illegal operator in expression: {}", op)
            }
            EvalError::UnknownCell(name) => write!(f, "{} is not a valid cell name", name),
            EvalError::UnknownFunction(name) => write!(f, "Unknown function name: {}", name),
        }
    }
}

impl std::error::Error for EvalError {}

/// The model an expression reads cell values from during evaluation.
/// The spreadsheet implements this; tests can substitute a fixture.
pub trait CellModel {
    /// Returns the current calculated value of the named cell.
    /// Unknown or empty cells read as 0.0; this is not an error.
    fn get_calculated_value(&self, cellname: &str) -> f64;

    /// Appends the current calculated values of all cells in the range,
    /// in column-major order.
    fn fill_from_range(&self, range: &Range, values: &mut Vec<f64>);
}

/// The five kinds of expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(f64),
    Text(String),
    Identifier(String),
    Compound {
        op: char,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    RangeFn {
        function: String,
        range: Range,
    },
}

/// A node in a parsed cell expression. Carries the raw source text (only
/// non-empty on the root returned by the parser) and the value computed by
/// the most recent evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    kind: ExprKind,
    raw_text: String,
    last_value: f64,
}

impl Expression {
    /// A numeric constant. The cached value is primed with the constant.
    pub fn number(value: f64) -> Self {
        Expression {
            kind: ExprKind::Number(value),
            raw_text: String::new(),
            last_value: value,
        }
    }

    /// A text string constant.
    pub fn text(text: impl Into<String>) -> Self {
        Expression {
            kind: ExprKind::Text(text.into()),
            raw_text: String::new(),
            last_value: 0.0,
        }
    }

    /// A reference to another cell by name.
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression {
            kind: ExprKind::Identifier(name.into()),
            raw_text: String::new(),
            last_value: 0.0,
        }
    }

    /// Two sub-expressions joined by a binary operator. The node exclusively
    /// owns both children.
    pub fn compound(op: char, lhs: Expression, rhs: Expression) -> Self {
        Expression {
            kind: ExprKind::Compound {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            raw_text: String::new(),
            last_value: 0.0,
        }
    }

    /// An aggregate function applied to a range of cells. The function name
    /// is trimmed and uppercased before storage.
    pub fn range_fn(function: impl Into<String>, range: Range) -> Self {
        Expression {
            kind: ExprKind::RangeFn {
                function: function.into().trim().to_uppercase(),
                range,
            },
            raw_text: String::new(),
            last_value: 0.0,
        }
    }

    /// Returns the node's kind tag for pattern matching.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Returns the raw text this expression was parsed from, such as
    /// "=A2+SUM(B1:B6)*5". Empty unless this is the root of the tree.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn set_raw_text(&mut self, raw_text: impl Into<String>) {
        self.raw_text = raw_text.into();
    }

    /// Returns the cached value of the most recent evaluation without
    /// recomputing. 0.0 if the expression has never been evaluated
    /// (except a Number, whose value is cached at construction).
    pub fn value(&self) -> f64 {
        self.last_value
    }

    /// Returns true if this expression must be recalculated when the cells
    /// it references change: an Identifier, Compound, or RangeFn node.
    pub fn is_formula(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Identifier(_) | ExprKind::Compound { .. } | ExprKind::RangeFn { .. }
        )
    }

    /// Recursively evaluates this expression against the model, caches the
    /// result in every visited node, and returns it.
    pub fn evaluate(&mut self, model: &dyn CellModel) -> Result<f64, EvalError> {
        let value = match &mut self.kind {
            ExprKind::Number(n) => *n,
            ExprKind::Text(_) => 0.0,
            ExprKind::Identifier(name) => {
                if !range::is_valid_name(name) {
                    return Err(EvalError::UnknownCell(name.clone()));
                }
                model.get_calculated_value(name)
            }
            ExprKind::Compound { op, lhs, rhs } => {
                let op = *op;
                if !KNOWN_OPERATORS.contains(&op) {
                    return Err(EvalError::IllegalOperator(op));
                }
                let right = rhs.evaluate(model)?;
                let left = lhs.evaluate(model)?;
                match op {
                    '+' => left + right,
                    '-' => left - right,
                    '*' => left * right,
                    // dividing by 0.0 gives +/- INF, not an error
                    '/' => left / right,
                    _ => unreachable!(),
                }
            }
            ExprKind::RangeFn { function, range } => {
                if !range::is_known_function_name(function) {
                    return Err(EvalError::UnknownFunction(function.clone()));
                }
                let mut values = Vec::new();
                model.fill_from_range(range, &mut values);
                match function.as_str() {
                    "AVERAGE" | "MEAN" => range::average(&values),
                    "SUM" => range::sum(&values),
                    "PRODUCT" => range::product(&values),
                    "MAX" => range::max_value(&values),
                    "MIN" => range::min_value(&values),
                    "MEDIAN" => range::median(&values),
                    "STDEV" => range::stdev(&values),
                    other => return Err(EvalError::UnknownFunction(other.to_string())),
                }
            }
        };
        self.last_value = value;
        Ok(value)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Number(n) => write!(f, "{}", n),
            ExprKind::Text(text) => write!(f, "{}", text),
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::Compound { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            ExprKind::RangeFn { function, range } => write!(f, "{}({})", function, range),
        }
    }
}
