//! SQLite-backed graph executor.
//!
//! Shortest paths are found with a level-by-level BFS over the bipartite
//! person ↔ project graph. Category predicates are rendered into the
//! neighbour queries as SQL over schema-table column names with `?`
//! placeholders; every operand is a bound parameter. The rendered SQL selects
//! exactly the rows [`Predicate::evaluate`] admits.
//!
//! The BFS runs on a blocking thread and checks the request deadline before
//! every expansion, so a traversal the caller has given up on releases its
//! connection instead of running to completion.

use async_trait::async_trait;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Number, Value};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};

use super::executor::{GraphExecutor, LookupKey};
use super::model::ProjectKey;
use super::{Direction, RawPath, RawSegment, Record};
use crate::db::Db;
use crate::error::{Result, SixDegreesError};
use crate::filter::{FieldType, Operand, Predicate, DATE_FORMAT};
use crate::query::TraversalRequest;

/// Graph executor over the SQLite schema in `migrations/`.
#[derive(Debug, Clone)]
pub struct SqliteGraph {
    db: Db,
}

impl SqliteGraph {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

#[async_trait]
impl GraphExecutor for SqliteGraph {
    async fn execute_traversal(&self, request: &TraversalRequest) -> Result<Option<RawPath>> {
        let request = request.clone();
        self.db
            .with_connection(move |conn| shortest_path(conn, &request))
            .await
            .map_err(|e| match e {
                SixDegreesError::TraversalFailed(_) => e,
                other => SixDegreesError::TraversalFailed(other.to_string()),
            })
    }

    async fn execute_lookup(&self, key: &LookupKey) -> Result<Option<Record>> {
        let key = *key;
        self.db
            .with_connection(move |conn| match key {
                LookupKey::Show(tv_id) => fetch_record(conn, "SELECT * FROM shows WHERE tv_id = ?", tv_id),
            })
            .await
            .map_err(|e| SixDegreesError::LookupFailed(e.to_string()))
    }
}

/// Render a predicate against a table alias, appending bound operands to
/// `params` in placeholder order.
pub fn render_predicate(predicate: &Predicate, alias: &str, params: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Always => "1".to_string(),
        Predicate::Compare { field, ty, op, value } => {
            let column = column(alias, field, *ty);
            let placeholder = bind(value, *ty, params);
            format!("{} {} {}", column, op.symbol(), placeholder)
        }
        Predicate::Between { field, ty, low, high } => {
            let column = column(alias, field, *ty);
            let low = bind(low, *ty, params);
            let high = bind(high, *ty, params);
            format!("{} BETWEEN {} AND {}", column, low, high)
        }
        Predicate::OneOf { field, values } => {
            if values.is_empty() {
                return "0".to_string();
            }
            let placeholders: Vec<&str> = values.iter().map(|v| bind(v, FieldType::Int, params)).collect();
            format!("{}.{} IN ({})", alias, field, placeholders.join(", "))
        }
        Predicate::And(parts) => join(parts, " AND ", "1", alias, params),
        Predicate::Or(parts) => join(parts, " OR ", "0", alias, params),
    }
}

fn join(parts: &[Predicate], sep: &str, empty: &str, alias: &str, params: &mut Vec<SqlValue>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts
        .iter()
        .map(|p| format!("({})", render_predicate(p, alias, params)))
        .collect();
    rendered.join(sep)
}

fn column(alias: &str, field: &str, ty: FieldType) -> String {
    match ty {
        FieldType::Date => format!("date({}.{})", alias, field),
        _ => format!("{}.{}", alias, field),
    }
}

fn bind(value: &Operand, ty: FieldType, params: &mut Vec<SqlValue>) -> &'static str {
    params.push(match value {
        Operand::Int(v) => SqlValue::Integer(*v),
        Operand::Float(v) => SqlValue::Real(*v),
        Operand::Date(d) => SqlValue::Text(d.format(DATE_FORMAT).to_string()),
        Operand::Text(s) => SqlValue::Text(s.clone()),
    });
    match ty {
        FieldType::Date => "date(?)",
        _ => "?",
    }
}

/// Neighbour queries for one traversal, with their predicate parameters.
struct NeighbourQueries {
    projects_of_person: String,
    project_params: Vec<SqlValue>,
    people_of_movie: String,
    people_of_episode: String,
    person_params: Vec<SqlValue>,
    /// People whose credits have been fetched so far.
    expanded: Cell<usize>,
}

impl NeighbourQueries {
    fn new(request: &TraversalRequest) -> Self {
        let mut project_params = Vec::new();
        let movie = render_predicate(&request.movie, "m", &mut project_params);
        let episode = render_predicate(&request.episode, "e", &mut project_params);
        let projects_of_person = format!(
            "SELECT c.credit_id, c.movie_id, c.episode_id FROM credits c \
             LEFT JOIN movies m ON m.movie_id = c.movie_id \
             LEFT JOIN episodes e ON e.episode_id = c.episode_id \
             WHERE c.person_id = ? \
               AND ((m.movie_id IS NOT NULL AND ({})) OR (e.episode_id IS NOT NULL AND ({}))) \
             ORDER BY c.credit_id",
            movie, episode
        );

        let mut person_params = Vec::new();
        let person = render_predicate(&request.person, "p", &mut person_params);
        let people_of = |project_column: &str| {
            format!(
                "SELECT c.credit_id, c.person_id FROM credits c \
                 JOIN persons p ON p.person_id = c.person_id \
                 WHERE c.{} = ? AND ({}) \
                 ORDER BY c.credit_id",
                project_column, person
            )
        };

        Self {
            people_of_movie: people_of("movie_id"),
            people_of_episode: people_of("episode_id"),
            projects_of_person,
            project_params,
            person_params,
            expanded: Cell::new(0),
        }
    }

    fn projects_of(&self, conn: &Connection, person_id: i64) -> Result<Vec<(String, ProjectKey)>> {
        self.expanded.set(self.expanded.get() + 1);
        let mut stmt = conn.prepare_cached(&self.projects_of_person)?;
        let params = std::iter::once(SqlValue::Integer(person_id)).chain(self.project_params.iter().cloned());
        let rows = stmt.query_map(params_from_iter(params), |row| {
            let credit_id: String = row.get(0)?;
            let movie_id: Option<i64> = row.get(1)?;
            let episode_id: Option<i64> = row.get(2)?;
            Ok((credit_id, movie_id, episode_id))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (credit_id, movie_id, episode_id) = row?;
            let key = match (movie_id, episode_id) {
                (Some(id), _) => ProjectKey::Movie(id),
                (None, Some(id)) => ProjectKey::Episode(id),
                (None, None) => continue,
            };
            out.push((credit_id, key));
        }
        Ok(out)
    }

    fn people_of(&self, conn: &Connection, project: ProjectKey) -> Result<Vec<(String, i64)>> {
        let (sql, id) = match project {
            ProjectKey::Movie(id) => (&self.people_of_movie, id),
            ProjectKey::Episode(id) => (&self.people_of_episode, id),
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let params = std::iter::once(SqlValue::Integer(id)).chain(self.person_params.iter().cloned());
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            .map_err(SixDegreesError::Database)
    }
}

/// How BFS reached a person: from whom, through which project and credits.
#[derive(Debug, Clone)]
struct Hop {
    from: i64,
    project: ProjectKey,
    credit_in: String,
    credit_out: String,
}

fn person_exists(conn: &Connection, person_id: i64) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM persons WHERE person_id = ?")?;
    Ok(stmt.exists([person_id])?)
}

fn check_deadline(request: &TraversalRequest, depth: usize) -> Result<()> {
    if request.deadline_passed() {
        log::warn!("[{}] traversal abandoned at depth {}: deadline passed", request.request_id, depth);
        return Err(SixDegreesError::TraversalFailed(format!(
            "traversal deadline passed at depth {}",
            depth
        )));
    }
    Ok(())
}

/// BFS from `request.source` to `request.target`, one project hop per level.
pub(crate) fn shortest_path(conn: &Connection, request: &TraversalRequest) -> Result<Option<RawPath>> {
    if !person_exists(conn, request.source)? || !person_exists(conn, request.target)? {
        log::debug!(
            "[{}] endpoint {} or {} not in graph",
            request.request_id,
            request.source,
            request.target
        );
        return Ok(None);
    }
    if request.source == request.target {
        return Ok(Some(RawPath::default()));
    }

    let queries = NeighbourQueries::new(request);
    let result = search(conn, request, &queries);
    log::debug!("[{}] expanded {} people", request.request_id, queries.expanded.get());
    result
}

fn search(conn: &Connection, request: &TraversalRequest, queries: &NeighbourQueries) -> Result<Option<RawPath>> {
    let mut reached: HashMap<i64, Hop> = HashMap::new();
    let mut seen_projects: HashSet<ProjectKey> = HashSet::new();
    let mut frontier = vec![request.source];

    for depth in 1..=request.max_depth {
        let mut next = Vec::new();
        for &person in &frontier {
            check_deadline(request, depth)?;
            for (credit_in, project) in queries.projects_of(conn, person)? {
                if !seen_projects.insert(project) {
                    continue;
                }
                check_deadline(request, depth)?;
                for (credit_out, other) in queries.people_of(conn, project)? {
                    if other == request.source || reached.contains_key(&other) {
                        continue;
                    }
                    reached.insert(
                        other,
                        Hop {
                            from: person,
                            project,
                            credit_in: credit_in.clone(),
                            credit_out,
                        },
                    );
                    if other == request.target {
                        log::debug!("[{}] reached person {} at depth {}", request.request_id, other, depth);
                        return materialize(conn, request, &reached).map(Some);
                    }
                    next.push(other);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    Ok(None)
}

/// Walk hops back from the target and load every record on the path.
fn materialize(conn: &Connection, request: &TraversalRequest, reached: &HashMap<i64, Hop>) -> Result<RawPath> {
    let mut hops = Vec::new();
    let mut cursor = request.target;
    while cursor != request.source {
        let hop = reached.get(&cursor).ok_or_else(|| {
            SixDegreesError::TraversalFailed(format!("no predecessor recorded for person {}", cursor))
        })?;
        hops.push((hop, cursor));
        cursor = hop.from;
    }
    hops.reverse();

    let mut segments = Vec::with_capacity(hops.len() * 2);
    for (hop, to) in hops {
        let from_person = required(person_record(conn, hop.from)?, "person", hop.from)?;
        let to_person = required(person_record(conn, to)?, "person", to)?;
        let project = project_record(conn, hop.project)?;
        let credit_in = credit_record(conn, &hop.credit_in)?;
        let credit_out = credit_record(conn, &hop.credit_out)?;

        segments.push(RawSegment {
            start: from_person,
            edge: credit_in,
            end: project.clone(),
            direction: Direction::Outgoing,
        });
        segments.push(RawSegment {
            start: project,
            edge: credit_out,
            end: to_person,
            direction: Direction::Incoming,
        });
    }

    Ok(RawPath { segments })
}

fn required(record: Option<Record>, what: &str, id: i64) -> Result<Record> {
    record.ok_or_else(|| SixDegreesError::TraversalFailed(format!("{} {} vanished during traversal", what, id)))
}

fn person_record(conn: &Connection, person_id: i64) -> Result<Option<Record>> {
    fetch_record(conn, "SELECT * FROM persons WHERE person_id = ?", person_id)
}

fn project_record(conn: &Connection, project: ProjectKey) -> Result<Record> {
    let (sql, what, id) = match project {
        ProjectKey::Movie(id) => ("SELECT * FROM movies WHERE movie_id = ?", "movie", id),
        ProjectKey::Episode(id) => ("SELECT * FROM episodes WHERE episode_id = ?", "episode", id),
    };
    required(fetch_record(conn, sql, id)?, what, id)
}

fn credit_record(conn: &Connection, credit_id: &str) -> Result<Record> {
    let mut stmt = conn.prepare_cached(
        "SELECT credit_id, character, department, job FROM credits WHERE credit_id = ?",
    )?;
    stmt.query_row([credit_id], row_to_record)
        .optional()?
        .ok_or_else(|| SixDegreesError::TraversalFailed(format!("credit {} vanished during traversal", credit_id)))
}

fn fetch_record(conn: &Connection, sql: &str, id: i64) -> Result<Option<Record>> {
    let mut stmt = conn.prepare_cached(sql)?;
    Ok(stmt.query_row([id], row_to_record).optional()?)
}

/// Convert a row into a record, omitting NULL columns so presence checks
/// see only populated fields.
fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut record = Record::new();
    let stmt = row.as_ref();
    for idx in 0..stmt.column_count() {
        let name = stmt.column_name(idx)?.to_string();
        let value = match row.get_ref(idx)? {
            ValueRef::Null | ValueRef::Blob(_) => continue,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => match Number::from_f64(f) {
                Some(n) => Value::Number(n),
                None => continue,
            },
            ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        };
        record.insert(name, value);
    }
    Ok(record)
}
