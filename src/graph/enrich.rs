//! Parent-show enrichment for episode projects.

use std::collections::{BTreeSet, HashMap};

use futures_util::stream::{self, StreamExt};

use super::executor::{GraphExecutor, LookupKey};
use super::model::{Project, Show, Triple};
use super::resolve::resolve_show;

/// Attach `parent_show` to every episode in `triples`.
///
/// Each distinct `show_id` is looked up once, with at most `concurrency`
/// lookups in flight, and the result is copied into every episode of that
/// show. The call returns only after every lookup has settled. A dangling
/// `show_id`, a failed lookup or an undecodable show record all leave
/// `parent_show` as `None` for the episodes of that show alone.
pub async fn attach_parent_shows(executor: &dyn GraphExecutor, triples: &mut [Triple], concurrency: usize) {
    let show_ids: BTreeSet<i64> = triples
        .iter()
        .filter_map(|triple| match &triple.project {
            Project::Episode(episode) => episode.show_id,
            Project::Movie(_) => None,
        })
        .collect();

    if show_ids.is_empty() {
        return;
    }

    let start = std::time::Instant::now();
    let lookups = show_ids.len();

    let shows: HashMap<i64, Option<Show>> = stream::iter(show_ids)
        .map(|tv_id| async move { (tv_id, lookup_show(executor, tv_id).await) })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut enriched = 0;
    for triple in triples.iter_mut() {
        if let Project::Episode(episode) = &mut triple.project {
            episode.parent_show = episode.show_id.and_then(|tv_id| shows.get(&tv_id).cloned().flatten());
            enriched += 1;
        }
    }

    log::debug!(
        "Enriched {} episode triples from {} show lookups in {:?}",
        enriched,
        lookups,
        start.elapsed()
    );
}

async fn lookup_show(executor: &dyn GraphExecutor, tv_id: i64) -> Option<Show> {
    match executor.execute_lookup(&LookupKey::Show(tv_id)).await {
        Ok(Some(record)) => match resolve_show(&record) {
            Ok(show) => Some(show),
            Err(e) => {
                log::warn!("Show {} has an unexpected shape, attaching null: {}", tv_id, e);
                None
            }
        },
        Ok(None) => {
            log::warn!("Show {} not found, attaching null parent_show", tv_id);
            None
        }
        Err(e) => {
            log::warn!("Show lookup {} failed, attaching null parent_show: {}", tv_id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SixDegreesError};
    use crate::graph::model::{Cast, Episode, Movie, Person, Relationship};
    use crate::graph::{RawPath, Record};
    use crate::query::TraversalRequest;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves shows 1, 2 and 100 upwards, fails on 3, and knows nothing else.
    struct ShowTable {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ShowTable {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl GraphExecutor for ShowTable {
        async fn execute_traversal(&self, _request: &TraversalRequest) -> Result<Option<RawPath>> {
            Ok(None)
        }

        async fn execute_lookup(&self, key: &LookupKey) -> Result<Option<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let LookupKey::Show(tv_id) = *key;
            match tv_id {
                1 | 2 | 100.. => Ok(json!({"tv_id": tv_id, "name": format!("Show {}", tv_id)})
                    .as_object()
                    .cloned()),
                3 => Err(SixDegreesError::LookupFailed("connection reset".to_string())),
                _ => Ok(None),
            }
        }
    }

    fn person(id: i64) -> Person {
        serde_json::from_value(json!({"person_id": id})).unwrap()
    }

    fn cast() -> Relationship {
        Relationship::Cast(Cast {
            credit_id: "c".to_string(),
            character: "Self".to_string(),
        })
    }

    fn episode_triple(episode_id: i64, show_id: Option<i64>) -> Triple {
        let episode: Episode = serde_json::from_value(json!({"episode_id": episode_id, "show_id": show_id})).unwrap();
        Triple {
            person: person(1),
            relationship: cast(),
            project: Project::Episode(episode),
        }
    }

    fn movie_triple() -> Triple {
        let movie: Movie = serde_json::from_value(json!({"movie_id": 99})).unwrap();
        Triple {
            person: person(1),
            relationship: cast(),
            project: Project::Movie(movie),
        }
    }

    fn parent_show_id(triple: &Triple) -> Option<i64> {
        match &triple.project {
            Project::Episode(e) => e.parent_show.as_ref().map(|s| s.tv_id),
            Project::Movie(_) => panic!("not an episode"),
        }
    }

    #[tokio::test]
    async fn test_attaches_found_shows_and_nulls_the_rest() {
        let executor = ShowTable::new();
        let mut triples = vec![
            episode_triple(10, Some(1)),
            movie_triple(),
            episode_triple(11, Some(2)),
            episode_triple(12, Some(404)),
            episode_triple(13, Some(3)),
            episode_triple(14, None),
        ];
        attach_parent_shows(&executor, &mut triples, 4).await;

        assert_eq!(parent_show_id(&triples[0]), Some(1));
        assert!(matches!(triples[1].project, Project::Movie(_)));
        assert_eq!(parent_show_id(&triples[2]), Some(2));
        assert_eq!(parent_show_id(&triples[3]), None);
        assert_eq!(parent_show_id(&triples[4]), None);
        assert_eq!(parent_show_id(&triples[5]), None);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let executor = ShowTable::new();
        let mut triples: Vec<Triple> = (0..12).map(|i| episode_triple(i, Some(100 + i))).collect();
        attach_parent_shows(&executor, &mut triples, 3).await;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 12);
        assert!(executor.peak.load(Ordering::SeqCst) <= 3);
        assert!(triples.iter().all(|t| parent_show_id(t).is_some()));
    }

    #[tokio::test]
    async fn test_each_show_is_fetched_once() {
        let executor = ShowTable::new();
        // Episode 10 sits on both sides of its hop; 11 is another episode of show 1
        let mut triples = vec![
            episode_triple(10, Some(1)),
            episode_triple(10, Some(1)),
            episode_triple(11, Some(1)),
            episode_triple(11, Some(1)),
            episode_triple(12, Some(404)),
            episode_triple(12, Some(404)),
            episode_triple(13, None),
        ];
        attach_parent_shows(&executor, &mut triples, 4).await;

        assert_eq!(executor.calls.load(Ordering::SeqCst), 2);
        let shows: Vec<Option<i64>> = triples.iter().map(parent_show_id).collect();
        assert_eq!(shows, vec![Some(1), Some(1), Some(1), Some(1), None, None, None]);
    }

    #[tokio::test]
    async fn test_no_episodes_is_a_no_op() {
        let executor = ShowTable::new();
        let mut triples = vec![movie_triple()];
        attach_parent_shows(&executor, &mut triples, 4).await;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);

        let mut triples = vec![episode_triple(13, None), movie_triple()];
        attach_parent_shows(&executor, &mut triples, 4).await;
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(parent_show_id(&triples[0]), None);
    }
}
