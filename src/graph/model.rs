//! Typed entities produced from path records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub person_id: i64,
    pub name: Option<String>,
    pub birthday: Option<String>,
    pub deathday: Option<String>,
    pub gender: Option<i64>,
    pub popularity: Option<f64>,
    pub place_of_birth: Option<String>,
    pub known_for_department: Option<String>,
    pub imdb_id: Option<String>,
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub movie_id: i64,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub release_date: Option<String>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub runtime: Option<i64>,
    pub popularity: Option<f64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub original_language: Option<String>,
    pub status: Option<String>,
    pub tagline: Option<String>,
    pub poster_path: Option<String>,
    pub imdb_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_id: i64,
    pub show_id: Option<i64>,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub season_number: Option<i64>,
    pub episode_number: Option<i64>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub still_path: Option<String>,
    pub overview: Option<String>,
    /// Filled by enrichment; `None` serializes as an explicit null.
    #[serde(default)]
    pub parent_show: Option<Show>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub tv_id: i64,
    pub name: Option<String>,
    pub poster_path: Option<String>,
    pub first_air_date: Option<String>,
    pub popularity: Option<f64>,
}

/// A movie or a TV episode a person worked on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Project {
    Movie(Movie),
    Episode(Episode),
}

/// Identity of a project node, independent of its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKey {
    Movie(i64),
    Episode(i64),
}

impl Project {
    pub fn key(&self) -> ProjectKey {
        match self {
            Project::Movie(m) => ProjectKey::Movie(m.movie_id),
            Project::Episode(e) => ProjectKey::Episode(e.episode_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub credit_id: String,
    pub character: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crew {
    pub credit_id: String,
    pub department: String,
    pub job: Option<String>,
}

/// The credit linking a person to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__typename")]
pub enum Relationship {
    Cast(Cast),
    Crew(Crew),
}

impl Relationship {
    pub fn credit_id(&self) -> &str {
        match self {
            Relationship::Cast(c) => &c.credit_id,
            Relationship::Crew(c) => &c.credit_id,
        }
    }
}

/// One normalized path step: who worked on what, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triple {
    pub person: Person,
    pub relationship: Relationship,
    pub project: Project,
}
