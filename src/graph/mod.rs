//! People/film/TV graph: raw path results, typed entities and the steps that
//! turn one into the other.
//!
//! The executor hands back untyped records (field name → JSON value) arranged
//! as node/edge/node segments. [`decompose`] normalizes each segment into a
//! (person, relationship, project) [`Triple`], using [`resolve`] to pick the
//! concrete variant of every record from the fields it carries, and
//! [`enrich`] attaches parent shows to episodes afterwards.

pub mod decompose;
pub mod enrich;
pub mod executor;
pub mod model;
pub mod resolve;
pub mod sqlite;
pub mod store;

pub use decompose::decompose_path;
pub use enrich::attach_parent_shows;
pub use executor::{GraphExecutor, LookupKey};
pub use model::{Cast, Crew, Episode, Movie, Person, Project, Relationship, Show, Triple};
pub use sqlite::SqliteGraph;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An untyped node or edge record as returned by the graph store.
pub type Record = Map<String, Value>;

/// Which way a segment walks its underlying edge. Edges are stored
/// person → project, so `Outgoing` segments start at the person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// One node–edge–node step of a path, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub start: Record,
    pub edge: Record,
    pub end: Record,
    pub direction: Direction,
}

/// Ordered path returned by a traversal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPath {
    pub segments: Vec<RawSegment>,
}

impl RawPath {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// True when the record carries `key` with a non-null value.
pub fn has_field(record: &Record, key: &str) -> bool {
    record.get(key).map_or(false, |v| !v.is_null())
}
