//! Entity type resolution from record shape.
//!
//! Records carry no explicit tag. The variant is decided by which identifying
//! fields are present (non-null), then the record is decoded into that
//! variant's struct.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::model::{Cast, Crew, Episode, Movie, Person, Project, Relationship, Show};
use super::{has_field, Record};
use crate::error::{Result, SixDegreesError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Movie,
    Episode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    Cast,
    Crew,
}

/// `movie_id` wins over `episode_id`/`show_id`.
pub fn project_kind(record: &Record) -> Result<ProjectKind> {
    match (has_field(record, "movie_id"), has_field(record, "episode_id") || has_field(record, "show_id")) {
        (true, _) => Ok(ProjectKind::Movie),
        (false, true) => Ok(ProjectKind::Episode),
        (false, false) => Err(SixDegreesError::UnresolvedType(format!(
            "project record has neither movie_id nor episode_id/show_id (fields: {})",
            field_list(record)
        ))),
    }
}

/// `character` wins over `department`.
pub fn relationship_kind(record: &Record) -> Result<RelationshipKind> {
    match (has_field(record, "character"), has_field(record, "department")) {
        (true, _) => Ok(RelationshipKind::Cast),
        (false, true) => Ok(RelationshipKind::Crew),
        (false, false) => Err(SixDegreesError::UnresolvedType(format!(
            "relationship record has neither character nor department (fields: {})",
            field_list(record)
        ))),
    }
}

pub fn resolve_project(record: &Record) -> Result<Project> {
    Ok(match project_kind(record)? {
        ProjectKind::Movie => Project::Movie(decode::<Movie>("Movie", record)?),
        ProjectKind::Episode => Project::Episode(decode::<Episode>("Episode", record)?),
    })
}

pub fn resolve_relationship(record: &Record) -> Result<Relationship> {
    Ok(match relationship_kind(record)? {
        RelationshipKind::Cast => Relationship::Cast(decode::<Cast>("Cast", record)?),
        RelationshipKind::Crew => Relationship::Crew(decode::<Crew>("Crew", record)?),
    })
}

pub fn resolve_person(record: &Record) -> Result<Person> {
    decode("Person", record)
}

pub fn resolve_show(record: &Record) -> Result<Show> {
    decode("Show", record)
}

fn decode<T: DeserializeOwned>(type_name: &str, record: &Record) -> Result<T> {
    serde_json::from_value(Value::Object(record.clone()))
        .map_err(|e| SixDegreesError::UnresolvedType(format!("record is not a valid {}: {}", type_name, e)))
}

fn field_list(record: &Record) -> String {
    if record.is_empty() {
        return "none".to_string();
    }
    record.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record fixture must be an object"),
        }
    }

    #[test]
    fn test_movie_id_resolves_movie() {
        let r = record(json!({"movie_id": 1, "title": "Footloose"}));
        assert_eq!(project_kind(&r).unwrap(), ProjectKind::Movie);
        assert!(matches!(resolve_project(&r).unwrap(), Project::Movie(m) if m.movie_id == 1));
    }

    #[test]
    fn test_movie_id_wins_over_show_id() {
        let r = record(json!({"movie_id": 1, "show_id": 4}));
        assert_eq!(project_kind(&r).unwrap(), ProjectKind::Movie);
    }

    #[test]
    fn test_episode_or_show_id_resolves_episode() {
        let by_episode = record(json!({"episode_id": 3, "name": "Pilot"}));
        let by_show = record(json!({"show_id": 4, "episode_id": 8}));
        assert_eq!(project_kind(&by_episode).unwrap(), ProjectKind::Episode);
        assert_eq!(project_kind(&by_show).unwrap(), ProjectKind::Episode);
    }

    #[test]
    fn test_show_id_alone_is_episode_kind_but_fails_decode() {
        let r = record(json!({"show_id": 4}));
        assert_eq!(project_kind(&r).unwrap(), ProjectKind::Episode);
        assert!(matches!(resolve_project(&r), Err(SixDegreesError::UnresolvedType(_))));
    }

    #[test]
    fn test_neither_is_unresolved() {
        let r = record(json!({"title": "Mystery"}));
        assert!(matches!(project_kind(&r), Err(SixDegreesError::UnresolvedType(_))));
        let nulls = record(json!({"movie_id": null, "episode_id": null}));
        assert!(matches!(project_kind(&nulls), Err(SixDegreesError::UnresolvedType(_))));
    }

    #[test]
    fn test_relationship_kinds() {
        let cast = record(json!({"credit_id": "c1", "character": "Ren McCormack"}));
        let crew = record(json!({"credit_id": "c2", "department": "Directing", "job": "Director"}));
        assert!(matches!(resolve_relationship(&cast).unwrap(), Relationship::Cast(c) if c.character == "Ren McCormack"));
        assert!(matches!(resolve_relationship(&crew).unwrap(), Relationship::Crew(c) if c.department == "Directing"));
    }

    #[test]
    fn test_relationship_without_discriminant_is_unresolved() {
        let r = record(json!({"credit_id": "c3", "job": "Grip"}));
        assert!(matches!(resolve_relationship(&r), Err(SixDegreesError::UnresolvedType(_))));
    }

    #[test]
    fn test_mistyped_identity_is_unresolved() {
        let r = record(json!({"movie_id": "not-a-number"}));
        assert!(matches!(resolve_project(&r), Err(SixDegreesError::UnresolvedType(_))));
    }
}
