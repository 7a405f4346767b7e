//! Path decomposition into (person, relationship, project) triples.

use super::model::{ProjectKey, Triple};
use super::resolve::{resolve_person, resolve_project, resolve_relationship};
use super::{has_field, Direction, RawPath, Record};
use crate::error::{Result, SixDegreesError};

/// Role a node record plays in a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Person,
    Project,
    Unknown,
}

impl Role {
    fn of(record: &Record) -> Role {
        let person = has_field(record, "person_id");
        let project = has_field(record, "movie_id") || has_field(record, "episode_id") || has_field(record, "show_id");
        match (person, project) {
            (true, false) => Role::Person,
            (false, true) => Role::Project,
            _ => Role::Unknown,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Role::Person => "person",
            Role::Project => "project",
            Role::Unknown => "unidentifiable node",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKey {
    Person(i64),
    Project(ProjectKey),
}

/// Turn a traversal result into triples, one per segment, in path order.
///
/// Each segment must join exactly one person and one project. The person may
/// sit on either side, but the side must agree with the segment's direction:
/// an `Outgoing` segment starts at the person, an `Incoming` one ends there.
/// The path must start at `first_person_id`, end at `second_person_id`, and
/// every segment must begin where the previous one ended.
pub fn decompose_path(path: &RawPath, first_person_id: i64, second_person_id: i64) -> Result<Vec<Triple>> {
    if path.is_empty() {
        return Err(SixDegreesError::EmptyPath);
    }

    let mut triples = Vec::with_capacity(path.len());
    let mut previous_end: Option<NodeKey> = None;

    for (index, segment) in path.segments.iter().enumerate() {
        let malformed = |reason: String| SixDegreesError::MalformedSegment { index, reason };

        let (person_record, project_record, person_first) = match (Role::of(&segment.start), Role::of(&segment.end)) {
            (Role::Person, Role::Project) => (&segment.start, &segment.end, true),
            (Role::Project, Role::Person) => (&segment.end, &segment.start, false),
            (a, b) => {
                return Err(malformed(format!(
                    "expected one person and one project, found {} and {}",
                    a.describe(),
                    b.describe()
                )))
            }
        };

        let declared_person_first = segment.direction == Direction::Outgoing;
        if person_first != declared_person_first {
            return Err(malformed(format!(
                "{:?} segment has its person at the {}",
                segment.direction,
                if person_first { "start" } else { "end" }
            )));
        }

        let person = resolve_person(person_record)?;
        let relationship = resolve_relationship(&segment.edge)?;
        let project = resolve_project(project_record)?;

        let person_key = NodeKey::Person(person.person_id);
        let project_key = NodeKey::Project(project.key());
        let (start, end) = if person_first {
            (person_key, project_key)
        } else {
            (project_key, person_key)
        };

        match previous_end {
            None if start != NodeKey::Person(first_person_id) => {
                return Err(malformed(format!("path does not start at person {}", first_person_id)));
            }
            Some(prev) if prev != start => {
                return Err(malformed("segment does not continue from the previous node".to_string()));
            }
            _ => {}
        }
        previous_end = Some(end);

        triples.push(Triple {
            person,
            relationship,
            project,
        });
    }

    if previous_end != Some(NodeKey::Person(second_person_id)) {
        return Err(SixDegreesError::MalformedSegment {
            index: path.len() - 1,
            reason: format!("path does not end at person {}", second_person_id),
        });
    }

    log::debug!("Decomposed path into {} triples", triples.len());
    Ok(triples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{Project, Relationship};
    use crate::graph::{Direction, RawSegment};
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record fixture must be an object"),
        }
    }

    fn person(id: i64) -> Record {
        record(json!({"person_id": id, "name": format!("Person {}", id)}))
    }

    fn movie(id: i64) -> Record {
        record(json!({"movie_id": id, "title": format!("Movie {}", id)}))
    }

    fn episode(id: i64, show: i64) -> Record {
        record(json!({"episode_id": id, "show_id": show}))
    }

    fn cast(id: &str) -> Record {
        record(json!({"credit_id": id, "character": "Self"}))
    }

    fn crew(id: &str) -> Record {
        record(json!({"credit_id": id, "department": "Directing", "job": "Director"}))
    }

    fn out(start: Record, edge: Record, end: Record) -> RawSegment {
        RawSegment { start, edge, end, direction: Direction::Outgoing }
    }

    fn inc(start: Record, edge: Record, end: Record) -> RawSegment {
        RawSegment { start, edge, end, direction: Direction::Incoming }
    }

    /// 1 -[cast]-> movie 10 <-[crew]- 2 -[cast]-> episode 20 <-[cast]- 3
    fn two_hop_path() -> RawPath {
        RawPath {
            segments: vec![
                out(person(1), cast("a"), movie(10)),
                inc(movie(10), crew("b"), person(2)),
                out(person(2), cast("c"), episode(20, 7)),
                inc(episode(20, 7), cast("d"), person(3)),
            ],
        }
    }

    #[test]
    fn test_triple_per_segment_with_normalized_person() {
        let triples = decompose_path(&two_hop_path(), 1, 3).unwrap();
        assert_eq!(triples.len(), 4);
        let people: Vec<i64> = triples.iter().map(|t| t.person.person_id).collect();
        assert_eq!(people, vec![1, 2, 2, 3]);
        assert!(matches!(triples[0].project, Project::Movie(ref m) if m.movie_id == 10));
        assert!(matches!(triples[1].relationship, Relationship::Crew(_)));
        assert!(matches!(triples[3].project, Project::Episode(ref e) if e.episode_id == 20));
        assert_eq!(triples[3].relationship.credit_id(), "d");
    }

    #[test]
    fn test_projects_and_people_chain() {
        let triples = decompose_path(&two_hop_path(), 1, 3).unwrap();
        for pair in triples.chunks(2) {
            assert_eq!(pair[0].project.key(), pair[1].project.key());
        }
        for window in triples[1..].chunks(2).filter(|c| c.len() == 2) {
            assert_eq!(window[0].person.person_id, window[1].person.person_id);
        }
    }

    #[test]
    fn test_empty_path() {
        let err = decompose_path(&RawPath::default(), 1, 1).unwrap_err();
        assert!(matches!(err, SixDegreesError::EmptyPath));
    }

    #[test]
    fn test_two_people_in_one_segment_is_malformed() {
        let path = RawPath {
            segments: vec![out(person(1), cast("a"), person(2))],
        };
        let err = decompose_path(&path, 1, 2).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 0, .. }));
    }

    #[test]
    fn test_two_projects_in_one_segment_is_malformed() {
        let path = RawPath {
            segments: vec![
                out(person(1), cast("a"), movie(10)),
                inc(movie(10), cast("b"), movie(11)),
            ],
        };
        let err = decompose_path(&path, 1, 2).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 1, .. }));
    }

    #[test]
    fn test_wrong_start_person_is_malformed() {
        let err = decompose_path(&two_hop_path(), 2, 3).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 0, .. }));
    }

    #[test]
    fn test_wrong_end_person_is_malformed() {
        let err = decompose_path(&two_hop_path(), 1, 4).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 3, .. }));
    }

    #[test]
    fn test_broken_chain_is_malformed() {
        let path = RawPath {
            segments: vec![
                out(person(1), cast("a"), movie(10)),
                inc(movie(11), cast("b"), person(2)),
            ],
        };
        let err = decompose_path(&path, 1, 2).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 1, .. }));
    }

    #[test]
    fn test_person_side_follows_direction() {
        // Project first on the way in, person first on the way out
        let path = RawPath {
            segments: vec![
                out(person(1), cast("a"), movie(10)),
                inc(movie(10), cast("b"), person(2)),
            ],
        };
        let triples = decompose_path(&path, 1, 2).unwrap();
        assert_eq!(triples[0].person.person_id, 1);
        assert_eq!(triples[1].person.person_id, 2);
        assert_eq!(triples[1].relationship.credit_id(), "b");
    }

    #[test]
    fn test_direction_contradicting_roles_is_malformed() {
        let path = RawPath {
            segments: vec![
                inc(person(1), cast("a"), movie(10)),
                out(movie(10), cast("b"), person(2)),
            ],
        };
        let err = decompose_path(&path, 1, 2).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 0, ref reason } if reason.contains("Incoming")));

        let path = RawPath {
            segments: vec![
                out(person(1), cast("a"), movie(10)),
                out(movie(10), cast("b"), person(2)),
            ],
        };
        let err = decompose_path(&path, 1, 2).unwrap_err();
        assert!(matches!(err, SixDegreesError::MalformedSegment { index: 1, .. }));
    }

    #[test]
    fn test_unresolvable_edge_surfaces() {
        let path = RawPath {
            segments: vec![
                out(person(1), record(json!({"credit_id": "x"})), movie(10)),
                inc(movie(10), cast("b"), person(2)),
            ],
        };
        assert!(matches!(decompose_path(&path, 1, 2), Err(SixDegreesError::UnresolvedType(_))));
    }
}
