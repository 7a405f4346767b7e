//! Filter AST: typed field constraints for the person, movie and episode categories.
//!
//! Callers describe filters as JSON objects keyed by field name, optionally
//! suffixed with `_GT`, `_LT`, `_GTE`, `_LTE` or `_IN`. Each entry parses into a
//! [`Constraint`] over a field declared in the category's schema table, so the
//! column a constraint touches always comes from this module, never from input.

mod compiler;
mod predicate;

pub use compiler::{compile_filter, parse_entry, parse_filter};
pub use predicate::{CmpOp, Predicate};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Date format for date operands and stored date columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Entity category a filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Person,
    Movie,
    Episode,
}

impl Category {
    /// Fields callers may filter on for this category.
    pub fn fields(&self) -> &'static [FieldDef] {
        match self {
            Category::Person => PERSON_FIELDS,
            Category::Movie => MOVIE_FIELDS,
            Category::Episode => EPISODE_FIELDS,
        }
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    /// Identity field of the category's nodes.
    pub fn id_field(&self) -> &'static str {
        match self {
            Category::Person => "person_id",
            Category::Movie => "movie_id",
            Category::Episode => "episode_id",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Person => "person",
            Category::Movie => "movie",
            Category::Episode => "episode",
        };
        f.write_str(name)
    }
}

/// Declared semantic type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Date,
    Text,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::Text => "string",
        };
        f.write_str(name)
    }
}

/// A filterable field: its stored name and declared type.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
}

const fn field(name: &'static str, ty: FieldType) -> FieldDef {
    FieldDef { name, ty }
}

static PERSON_FIELDS: &[FieldDef] = &[
    field("person_id", FieldType::Int),
    field("name", FieldType::Text),
    field("birthday", FieldType::Date),
    field("deathday", FieldType::Date),
    field("gender", FieldType::Int),
    field("popularity", FieldType::Float),
    field("place_of_birth", FieldType::Text),
    field("known_for_department", FieldType::Text),
    field("imdb_id", FieldType::Text),
    field("profile_path", FieldType::Text),
];

static MOVIE_FIELDS: &[FieldDef] = &[
    field("movie_id", FieldType::Int),
    field("title", FieldType::Text),
    field("original_title", FieldType::Text),
    field("release_date", FieldType::Date),
    field("budget", FieldType::Int),
    field("revenue", FieldType::Int),
    field("runtime", FieldType::Int),
    field("popularity", FieldType::Float),
    field("vote_average", FieldType::Float),
    field("vote_count", FieldType::Int),
    field("original_language", FieldType::Text),
    field("status", FieldType::Text),
    field("tagline", FieldType::Text),
    field("poster_path", FieldType::Text),
    field("imdb_id", FieldType::Text),
];

static EPISODE_FIELDS: &[FieldDef] = &[
    field("episode_id", FieldType::Int),
    field("show_id", FieldType::Int),
    field("name", FieldType::Text),
    field("air_date", FieldType::Date),
    field("season_number", FieldType::Int),
    field("episode_number", FieldType::Int),
    field("vote_average", FieldType::Float),
    field("vote_count", FieldType::Int),
    field("still_path", FieldType::Text),
    field("overview", FieldType::Text),
];

/// Operator selected by a filter key's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
}

impl Operator {
    /// Suffix checked longest-first so `_GTE` is never read as `_GT`.
    const SUFFIXES: [(&'static str, Operator); 5] = [
        ("_GTE", Operator::Gte),
        ("_LTE", Operator::Lte),
        ("_GT", Operator::Gt),
        ("_LT", Operator::Lt),
        ("_IN", Operator::In),
    ];

    /// Split a filter key into its base field name and operator.
    pub fn split_key(key: &str) -> (&str, Operator) {
        for (suffix, op) in Self::SUFFIXES {
            if let Some(base) = key.strip_suffix(suffix) {
                if !base.is_empty() {
                    return (base, op);
                }
            }
        }
        (key, Operator::Eq)
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Eq => "",
            Operator::Gt => "_GT",
            Operator::Lt => "_LT",
            Operator::Gte => "_GTE",
            Operator::Lte => "_LTE",
            Operator::In => "_IN",
        }
    }
}

/// A typed operand, already coerced to its field's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Text(String),
}

impl Operand {
    /// JSON form as a caller would have written it.
    pub fn to_json(&self) -> Value {
        match self {
            Operand::Int(v) => Value::from(*v),
            Operand::Float(v) => Value::from(*v),
            Operand::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            Operand::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Comparison carried by a constraint; `Between` is the closed range of `_IN`.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Eq(Operand),
    Gt(Operand),
    Lt(Operand),
    Gte(Operand),
    Lte(Operand),
    Between(Operand, Operand),
}

/// One parsed filter entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub category: Category,
    pub field: &'static FieldDef,
    pub comparison: Comparison,
}

impl Constraint {
    pub fn operator(&self) -> Operator {
        match self.comparison {
            Comparison::Eq(_) => Operator::Eq,
            Comparison::Gt(_) => Operator::Gt,
            Comparison::Lt(_) => Operator::Lt,
            Comparison::Gte(_) => Operator::Gte,
            Comparison::Lte(_) => Operator::Lte,
            Comparison::Between(..) => Operator::In,
        }
    }

    /// Render back to the `(key, operand)` filter entry this constraint parses from.
    pub fn to_entry(&self) -> (String, Value) {
        let key = format!("{}{}", self.field.name, self.operator().suffix());
        let value = match &self.comparison {
            Comparison::Eq(v)
            | Comparison::Gt(v)
            | Comparison::Lt(v)
            | Comparison::Gte(v)
            | Comparison::Lte(v) => v.to_json(),
            Comparison::Between(lo, hi) => Value::Array(vec![lo.to_json(), hi.to_json()]),
        };
        (key, value)
    }
}

/// Raw filter map for one category, as received from callers.
pub type FilterMap = Map<String, Value>;

/// Optional per-category filters of a path request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<FilterMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie: Option<FilterMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode: Option<FilterMap>,
}

impl PathFilters {
    pub fn get(&self, category: Category) -> Option<&FilterMap> {
        match category {
            Category::Person => self.person.as_ref(),
            Category::Movie => self.movie.as_ref(),
            Category::Episode => self.episode.as_ref(),
        }
    }

    /// True when no category carries any entry.
    pub fn is_empty(&self) -> bool {
        [Category::Person, Category::Movie, Category::Episode]
            .iter()
            .all(|c| self.get(*c).map_or(true, |m| m.is_empty()))
    }
}
