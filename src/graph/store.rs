//! Bulk loading of graph data into the SQLite store.

use rusqlite::{params, Transaction};
use serde::{Deserialize, Serialize};

use super::model::{Episode, Movie, Person, Show};
use crate::db::Db;
use crate::error::{Result, SixDegreesError};

/// A person's credit on a movie or an episode, as it appears in a dataset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRow {
    pub credit_id: String,
    pub person_id: i64,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub episode_id: Option<i64>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
}

impl CreditRow {
    /// `cast` when a character is given, `crew` when a department is.
    fn kind(&self) -> Result<&'static str> {
        match (&self.character, &self.department) {
            (Some(_), _) => Ok("cast"),
            (None, Some(_)) => Ok("crew"),
            (None, None) => Err(SixDegreesError::InvalidInput(format!(
                "credit {} has neither character nor department",
                self.credit_id
            ))),
        }
    }
}

/// Everything a dataset file may contain. Missing sections are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub persons: Vec<Person>,
    #[serde(default)]
    pub movies: Vec<Movie>,
    #[serde(default)]
    pub shows: Vec<Show>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub credits: Vec<CreditRow>,
}

/// Row counts written by [`load_dataset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub persons: usize,
    pub movies: usize,
    pub shows: usize,
    pub episodes: usize,
    pub credits: usize,
}

/// Insert (or replace) a whole dataset in one transaction.
pub async fn load_dataset(db: &Db, dataset: Dataset) -> Result<LoadStats> {
    for credit in &dataset.credits {
        if credit.movie_id.is_some() == credit.episode_id.is_some() {
            return Err(SixDegreesError::InvalidInput(format!(
                "credit {} must reference exactly one of movie_id or episode_id",
                credit.credit_id
            )));
        }
        credit.kind()?;
    }

    let stats = db
        .with_connection(move |conn| {
            let tx = conn.transaction()?;
            let stats = write_dataset(&tx, &dataset)?;
            tx.commit()?;
            Ok(stats)
        })
        .await?;

    log::info!(
        "Loaded {} persons, {} movies, {} shows, {} episodes, {} credits",
        stats.persons,
        stats.movies,
        stats.shows,
        stats.episodes,
        stats.credits
    );
    Ok(stats)
}

fn write_dataset(tx: &Transaction<'_>, dataset: &Dataset) -> Result<LoadStats> {
    for p in &dataset.persons {
        tx.execute(
            "INSERT OR REPLACE INTO persons (
                person_id, name, birthday, deathday, gender, popularity,
                place_of_birth, known_for_department, imdb_id, profile_path
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                p.person_id,
                p.name,
                p.birthday,
                p.deathday,
                p.gender,
                p.popularity,
                p.place_of_birth,
                p.known_for_department,
                p.imdb_id,
                p.profile_path,
            ],
        )?;
    }

    for m in &dataset.movies {
        tx.execute(
            "INSERT OR REPLACE INTO movies (
                movie_id, title, original_title, release_date, budget, revenue, runtime,
                popularity, vote_average, vote_count, original_language, status, tagline,
                poster_path, imdb_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                m.movie_id,
                m.title,
                m.original_title,
                m.release_date,
                m.budget,
                m.revenue,
                m.runtime,
                m.popularity,
                m.vote_average,
                m.vote_count,
                m.original_language,
                m.status,
                m.tagline,
                m.poster_path,
                m.imdb_id,
            ],
        )?;
    }

    for s in &dataset.shows {
        tx.execute(
            "INSERT OR REPLACE INTO shows (tv_id, name, poster_path, first_air_date, popularity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![s.tv_id, s.name, s.poster_path, s.first_air_date, s.popularity],
        )?;
    }

    for e in &dataset.episodes {
        tx.execute(
            "INSERT OR REPLACE INTO episodes (
                episode_id, show_id, name, air_date, season_number, episode_number,
                vote_average, vote_count, still_path, overview
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                e.episode_id,
                e.show_id,
                e.name,
                e.air_date,
                e.season_number,
                e.episode_number,
                e.vote_average,
                e.vote_count,
                e.still_path,
                e.overview,
            ],
        )?;
    }

    for c in &dataset.credits {
        let kind = c.kind()?;
        tx.execute(
            "INSERT OR REPLACE INTO credits (
                credit_id, person_id, movie_id, episode_id, kind, character, department, job
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                c.credit_id,
                c.person_id,
                c.movie_id,
                c.episode_id,
                kind,
                c.character,
                c.department,
                c.job,
            ],
        )?;
    }

    Ok(LoadStats {
        persons: dataset.persons.len(),
        movies: dataset.movies.len(),
        shows: dataset.shows.len(),
        episodes: dataset.episodes.len(),
        credits: dataset.credits.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrate;
    use serde_json::json;
    use std::path::Path;
    use tempfile::TempDir;

    async fn setup_db() -> (Db, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Db::new(temp_dir.path().join("graph.db"));
        let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
            .await
            .unwrap();
        (db, temp_dir)
    }

    fn dataset(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_load_and_count() {
        let (db, _temp) = setup_db().await;
        let data = dataset(json!({
            "persons": [{"person_id": 1, "name": "A"}, {"person_id": 2, "name": "B"}],
            "movies": [{"movie_id": 10, "title": "M", "budget": 5}],
            "shows": [{"tv_id": 7, "name": "S"}],
            "episodes": [{"episode_id": 20, "show_id": 7}],
            "credits": [
                {"credit_id": "c1", "person_id": 1, "movie_id": 10, "character": "Hero"},
                {"credit_id": "c2", "person_id": 2, "episode_id": 20, "department": "Writing", "job": "Writer"}
            ]
        }));
        let stats = load_dataset(&db, data).await.unwrap();
        assert_eq!(stats.persons, 2);
        assert_eq!(stats.credits, 2);

        let kinds: Vec<String> = db
            .with_connection(|conn| {
                let mut stmt = conn.prepare("SELECT kind FROM credits ORDER BY credit_id")?;
                let kinds = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
                Ok(kinds)
            })
            .await
            .unwrap();
        assert_eq!(kinds, vec!["cast".to_string(), "crew".to_string()]);
    }

    #[tokio::test]
    async fn test_dangling_show_reference_is_allowed() {
        let (db, _temp) = setup_db().await;
        let data = dataset(json!({"episodes": [{"episode_id": 1, "show_id": 999}]}));
        assert!(load_dataset(&db, data).await.is_ok());
    }

    #[tokio::test]
    async fn test_credit_must_reference_one_project() {
        let (db, _temp) = setup_db().await;
        let both = dataset(json!({
            "credits": [{"credit_id": "c", "person_id": 1, "movie_id": 1, "episode_id": 2, "character": "X"}]
        }));
        assert!(matches!(load_dataset(&db, both).await, Err(SixDegreesError::InvalidInput(_))));

        let untyped = dataset(json!({
            "credits": [{"credit_id": "c", "person_id": 1, "movie_id": 1}]
        }));
        assert!(matches!(load_dataset(&db, untyped).await, Err(SixDegreesError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_credit_to_unknown_person_rolls_back() {
        let (db, _temp) = setup_db().await;
        let data = dataset(json!({
            "movies": [{"movie_id": 10}],
            "credits": [{"credit_id": "c", "person_id": 404, "movie_id": 10, "character": "Ghost"}]
        }));
        assert!(matches!(load_dataset(&db, data).await, Err(SixDegreesError::Database(_))));

        let movies: i64 = db
            .with_connection(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(movies, 0);
    }
}
