//! Engine-neutral boolean predicate over a node's fields.

use chrono::NaiveDate;
use serde_json::Value;

use super::{Comparison, Constraint, FieldType, Operand, DATE_FORMAT};
use crate::graph::Record;

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Gt => ">",
            CmpOp::Lt => "<",
            CmpOp::Gte => ">=",
            CmpOp::Lte => "<=",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CmpOp::Eq => ordering == Equal,
            CmpOp::Gt => ordering == Greater,
            CmpOp::Lt => ordering == Less,
            CmpOp::Gte => ordering != Less,
            CmpOp::Lte => ordering != Greater,
        }
    }
}

/// Compiled predicate. Field names are always schema-table names; operands
/// stay typed values so engines bind them as parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every node.
    Always,
    Compare {
        field: &'static str,
        ty: FieldType,
        op: CmpOp,
        value: Operand,
    },
    /// Inclusive on both bounds.
    Between {
        field: &'static str,
        ty: FieldType,
        low: Operand,
        high: Operand,
    },
    /// Identity allowance: the field equals one of the listed values.
    OneOf {
        field: &'static str,
        values: Vec<Operand>,
    },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Predicate for a single parsed constraint.
    pub fn from_constraint(constraint: &Constraint) -> Self {
        let field = constraint.field.name;
        let ty = constraint.field.ty;
        let compare = |op: CmpOp, value: &Operand| Predicate::Compare {
            field,
            ty,
            op,
            value: value.clone(),
        };
        match &constraint.comparison {
            Comparison::Eq(v) => compare(CmpOp::Eq, v),
            Comparison::Gt(v) => compare(CmpOp::Gt, v),
            Comparison::Lt(v) => compare(CmpOp::Lt, v),
            Comparison::Gte(v) => compare(CmpOp::Gte, v),
            Comparison::Lte(v) => compare(CmpOp::Lte, v),
            Comparison::Between(lo, hi) => Predicate::Between {
                field,
                ty,
                low: lo.clone(),
                high: hi.clone(),
            },
        }
    }

    /// Conjunction that collapses to `Always` when empty.
    pub fn all(mut parts: Vec<Predicate>) -> Self {
        parts.retain(|p| *p != Predicate::Always);
        match parts.len() {
            0 => Predicate::Always,
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    pub fn is_always(&self) -> bool {
        matches!(self, Predicate::Always)
    }

    /// Number of leaf comparisons, for logging.
    pub fn leaf_count(&self) -> usize {
        match self {
            Predicate::Always => 0,
            Predicate::Compare { .. } | Predicate::Between { .. } | Predicate::OneOf { .. } => 1,
            Predicate::And(parts) | Predicate::Or(parts) => parts.iter().map(Predicate::leaf_count).sum(),
        }
    }

    /// Evaluate against an untyped record.
    ///
    /// This is the reference meaning of a predicate: an executor that renders
    /// predicates into its own query language must admit exactly the records
    /// this admits. Missing or null fields never match, as in SQL NULL
    /// comparison, and a stored value of the wrong type never matches either.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Compare { field, ty, op, value } => record
                .get(*field)
                .and_then(|stored| compare_stored(stored, *ty, value))
                .map_or(false, |ord| op.holds(ord)),
            Predicate::Between { field, ty, low, high } => match record.get(*field) {
                Some(stored) => {
                    let above = compare_stored(stored, *ty, low).map_or(false, |o| CmpOp::Gte.holds(o));
                    let below = compare_stored(stored, *ty, high).map_or(false, |o| CmpOp::Lte.holds(o));
                    above && below
                }
                None => false,
            },
            Predicate::OneOf { field, values } => match record.get(*field) {
                Some(stored) => values.iter().any(|v| {
                    compare_stored(stored, field_type_of(v), v) == Some(std::cmp::Ordering::Equal)
                }),
                None => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.evaluate(record)),
        }
    }
}

fn field_type_of(operand: &Operand) -> FieldType {
    match operand {
        Operand::Int(_) => FieldType::Int,
        Operand::Float(_) => FieldType::Float,
        Operand::Date(_) => FieldType::Date,
        Operand::Text(_) => FieldType::Text,
    }
}

fn compare_stored(stored: &Value, ty: FieldType, operand: &Operand) -> Option<std::cmp::Ordering> {
    match (ty, operand) {
        (FieldType::Date, Operand::Date(d)) => {
            let stored = NaiveDate::parse_from_str(stored.as_str()?, DATE_FORMAT).ok()?;
            Some(stored.cmp(d))
        }
        (FieldType::Text, Operand::Text(s)) => Some(stored.as_str()?.cmp(s.as_str())),
        (_, Operand::Int(i)) => match stored.as_i64() {
            Some(v) => Some(v.cmp(i)),
            None => stored.as_f64()?.partial_cmp(&(*i as f64)),
        },
        (_, Operand::Float(f)) => stored.as_f64()?.partial_cmp(f),
        _ => None,
    }
}
