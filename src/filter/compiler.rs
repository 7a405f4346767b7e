//! Filter compiler: raw filter maps to typed constraints and predicates.

use chrono::NaiveDate;
use serde_json::Value;

use super::{Category, Comparison, Constraint, FieldDef, FieldType, FilterMap, Operand, Operator, Predicate, DATE_FORMAT};
use crate::error::{Result, SixDegreesError};

/// Parse one `key: operand` filter entry for a category.
pub fn parse_entry(category: Category, key: &str, value: &Value) -> Result<Constraint> {
    let (base, op) = Operator::split_key(key);
    let field = category
        .field(base)
        .ok_or_else(|| SixDegreesError::UnknownField {
            category,
            field: base.to_string(),
        })?;

    let comparison = match op {
        Operator::In => {
            let bounds = value.as_array().ok_or_else(|| {
                SixDegreesError::invalid_operand(key, "expected a [low, high] pair")
            })?;
            if bounds.len() != 2 {
                return Err(SixDegreesError::invalid_operand(
                    key,
                    format!("expected exactly 2 bounds, got {}", bounds.len()),
                ));
            }
            Comparison::Between(coerce(key, field, &bounds[0])?, coerce(key, field, &bounds[1])?)
        }
        Operator::Eq => Comparison::Eq(coerce(key, field, value)?),
        Operator::Gt => Comparison::Gt(coerce(key, field, value)?),
        Operator::Lt => Comparison::Lt(coerce(key, field, value)?),
        Operator::Gte => Comparison::Gte(coerce(key, field, value)?),
        Operator::Lte => Comparison::Lte(coerce(key, field, value)?),
    };

    Ok(Constraint {
        category,
        field,
        comparison,
    })
}

/// Parse every entry of a category filter. Fails on the first bad entry.
pub fn parse_filter(category: Category, filter: &FilterMap) -> Result<Vec<Constraint>> {
    filter
        .iter()
        .map(|(key, value)| parse_entry(category, key, value))
        .collect()
}

/// Compile a category filter into the AND of its entries' predicates.
pub fn compile_filter(category: Category, filter: &FilterMap) -> Result<Predicate> {
    let constraints = parse_filter(category, filter)?;
    Ok(Predicate::all(
        constraints.iter().map(Predicate::from_constraint).collect(),
    ))
}

fn coerce(key: &str, field: &FieldDef, value: &Value) -> Result<Operand> {
    let mismatch = || {
        SixDegreesError::invalid_operand(key, format!("expected {} operand, got {}", field.ty, describe(value)))
    };
    match field.ty {
        FieldType::Int => value.as_i64().map(Operand::Int).ok_or_else(mismatch),
        FieldType::Float => value.as_f64().map(Operand::Float).ok_or_else(mismatch),
        FieldType::Text => value
            .as_str()
            .map(|s| Operand::Text(s.to_string()))
            .ok_or_else(mismatch),
        FieldType::Date => {
            let raw = value.as_str().ok_or_else(mismatch)?;
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Operand::Date)
                .map_err(|e| SixDegreesError::invalid_operand(key, format!("invalid date '{}': {}", raw, e)))
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
