//! The `find_path` entry point: compile filters, traverse once, normalize the
//! path into triples and enrich episodes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::Config;
use crate::db::Db;
use crate::error::{Result, SixDegreesError};
use crate::filter::PathFilters;
use crate::graph::{attach_parent_shows, decompose_path, GraphExecutor, SqliteGraph, Triple};
use crate::query::{PathQueryBuilder, DEFAULT_MAX_DEPTH};

const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 8;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Finds the shortest chain of shared credits between two people.
///
/// Holds no per-request state, so one finder can serve concurrent requests.
#[derive(Clone)]
pub struct PathFinder {
    executor: Arc<dyn GraphExecutor>,
    max_depth: usize,
    enrichment_concurrency: usize,
    timeout: Duration,
}

impl PathFinder {
    pub fn new(executor: Arc<dyn GraphExecutor>) -> Self {
        Self {
            executor,
            max_depth: DEFAULT_MAX_DEPTH,
            enrichment_concurrency: DEFAULT_ENRICHMENT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A finder over the SQLite store named in `config`, with its traversal limits.
    pub fn from_config(config: &Config) -> Self {
        let executor = Arc::new(SqliteGraph::new(Db::new(config.db_path())));
        Self::new(executor)
            .with_max_depth(config.traversal.max_depth)
            .with_enrichment_concurrency(config.traversal.enrichment_concurrency)
            .with_timeout(config.traversal.timeout())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_enrichment_concurrency(mut self, concurrency: usize) -> Self {
        self.enrichment_concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executor(&self) -> &Arc<dyn GraphExecutor> {
        &self.executor
    }

    /// Find the shortest path between two people, optionally constrained by
    /// per-category filters on the intermediate nodes.
    ///
    /// Filters are compiled before the store is touched, so a bad filter
    /// never costs a traversal. Exactly one traversal runs per call.
    ///
    /// # Returns
    ///
    /// One [`Triple`] per path segment, in path order. An empty vector means
    /// no path exists under the given filters.
    ///
    /// # Errors
    ///
    /// - `UnknownField` / `InvalidFilterOperand` for a filter that does not compile
    /// - `TraversalFailed` when the store errors or exceeds the configured timeout
    /// - `EmptyPath` when both ids name the same person
    /// - `MalformedSegment` / `UnresolvedType` for records the decomposer cannot read
    ///
    /// Show lookups never fail the call; an episode whose show cannot be
    /// fetched keeps `parent_show = None`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sixdegrees::{Config, PathFinder, PathFilters};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = Config::load()?;
    /// let finder = PathFinder::from_config(&config);
    /// let filters: PathFilters = serde_json::from_str(r#"{"movie": {"budget_GT": 1000000}}"#)?;
    ///
    /// for triple in finder.find_path(4724, 31, Some(&filters)).await? {
    ///     println!("{:?} -> {:?}", triple.person.name, triple.project);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_path(
        &self,
        first_person_id: i64,
        second_person_id: i64,
        filters: Option<&PathFilters>,
    ) -> Result<Vec<Triple>> {
        let request_id = Uuid::new_v4().to_string();
        self.find_path_with_id(&request_id, first_person_id, second_person_id, filters)
            .await
    }

    /// [`find_path`](Self::find_path) under a caller-chosen request id, which
    /// tags every log line and is handed to the executor.
    ///
    /// The executor also receives a deadline `timeout` from now. Blocking
    /// executors stop at it, so an abandoned traversal does not keep holding
    /// its connection.
    pub async fn find_path_with_id(
        &self,
        request_id: &str,
        first_person_id: i64,
        second_person_id: i64,
        filters: Option<&PathFilters>,
    ) -> Result<Vec<Triple>> {
        let total_start = Instant::now();

        let request = PathQueryBuilder::new(first_person_id, second_person_id)
            .filters(filters)
            .max_depth(self.max_depth)
            .request_id(request_id)
            .deadline(total_start + self.timeout)
            .build()?;
        log::debug!(
            "[{}] path {} -> {}: {} person, {} movie, {} episode constraints",
            request_id,
            first_person_id,
            second_person_id,
            request.person.leaf_count(),
            request.movie.leaf_count(),
            request.episode.leaf_count()
        );

        let traversal_start = Instant::now();
        let traversal = tokio::time::timeout(self.timeout, self.executor.execute_traversal(&request)).await;
        let raw_path = match traversal {
            Ok(Ok(path)) => path,
            Ok(Err(e @ SixDegreesError::TraversalFailed(_))) => return Err(e),
            Ok(Err(e)) => return Err(SixDegreesError::TraversalFailed(e.to_string())),
            Err(_) => {
                log::warn!("[{}] traversal exceeded {:?}", request_id, self.timeout);
                return Err(SixDegreesError::TraversalFailed(format!(
                    "traversal timed out after {:?}",
                    self.timeout
                )));
            }
        };
        log::debug!("[{}] traversal took {:?}", request_id, traversal_start.elapsed());

        let Some(raw_path) = raw_path else {
            log::info!(
                "[{}] no path between {} and {} ({:?})",
                request_id,
                first_person_id,
                second_person_id,
                total_start.elapsed()
            );
            return Ok(Vec::new());
        };

        let mut triples = decompose_path(&raw_path, first_person_id, second_person_id)?;
        attach_parent_shows(self.executor.as_ref(), &mut triples, self.enrichment_concurrency).await;

        log::info!(
            "[{}] path {} -> {} found: {} triples in {:?}",
            request_id,
            first_person_id,
            second_person_id,
            triples.len(),
            total_start.elapsed()
        );
        Ok(triples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{LookupKey, RawPath, Record};
    use crate::query::TraversalRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Sleeps longer than any test timeout before answering.
    struct Stalled;

    #[async_trait]
    impl GraphExecutor for Stalled {
        async fn execute_traversal(&self, _request: &TraversalRequest) -> Result<Option<RawPath>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }

        async fn execute_lookup(&self, _key: &LookupKey) -> Result<Option<Record>> {
            Ok(None)
        }
    }

    /// Fails every traversal with a database error and records the depth it was asked for.
    struct Broken {
        calls: AtomicUsize,
        depth: AtomicUsize,
    }

    #[async_trait]
    impl GraphExecutor for Broken {
        async fn execute_traversal(&self, request: &TraversalRequest) -> Result<Option<RawPath>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.depth.store(request.max_depth, Ordering::SeqCst);
            Err(SixDegreesError::Database(rusqlite::Error::InvalidQuery))
        }

        async fn execute_lookup(&self, _key: &LookupKey) -> Result<Option<Record>> {
            Ok(None)
        }
    }

    /// Keeps the last request it was asked to run.
    struct Capturing {
        last: Mutex<Option<TraversalRequest>>,
    }

    #[async_trait]
    impl GraphExecutor for Capturing {
        async fn execute_traversal(&self, request: &TraversalRequest) -> Result<Option<RawPath>> {
            if let Ok(mut last) = self.last.lock() {
                *last = Some(request.clone());
            }
            Ok(None)
        }

        async fn execute_lookup(&self, _key: &LookupKey) -> Result<Option<Record>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_request_carries_id_and_deadline() {
        let executor = Arc::new(Capturing { last: Mutex::new(None) });
        let finder = PathFinder::new(executor.clone()).with_timeout(Duration::from_secs(30));

        let before = Instant::now();
        assert!(finder.find_path_with_id("req-7", 1, 2, None).await.unwrap().is_empty());
        let request = executor.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.request_id, "req-7");
        let deadline = request.deadline.unwrap();
        assert!(deadline >= before + Duration::from_secs(30));
        assert!(deadline <= Instant::now() + Duration::from_secs(30));

        finder.find_path(1, 2, None).await.unwrap();
        let request = executor.last.lock().unwrap().clone().unwrap();
        assert_ne!(request.request_id, "req-7");
        assert!(Uuid::parse_str(&request.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_traversal_failure() {
        let finder = PathFinder::new(Arc::new(Stalled)).with_timeout(Duration::from_millis(20));
        let err = finder.find_path(1, 2, None).await.unwrap_err();
        assert!(matches!(err, SixDegreesError::TraversalFailed(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_store_errors_become_traversal_failures() {
        let executor = Arc::new(Broken {
            calls: AtomicUsize::new(0),
            depth: AtomicUsize::new(0),
        });
        let finder = PathFinder::new(executor.clone()).with_max_depth(3);
        let err = finder.find_path(1, 2, None).await.unwrap_err();
        assert_eq!(err.kind(), "TraversalFailed");
        assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.depth.load(Ordering::SeqCst), 3);
    }
}
