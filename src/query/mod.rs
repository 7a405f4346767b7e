//! Path query builder: endpoints plus compiled category filters become one
//! shortest-path traversal request.

use std::time::Instant;

use uuid::Uuid;

use crate::error::Result;
use crate::filter::{compile_filter, Category, Operand, PathFilters, Predicate};
use crate::graph::Record;

/// Default maximum number of project hops a traversal explores.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// A constrained shortest-path request between two people.
///
/// Each predicate constrains the intermediate nodes of its category. The
/// person predicate already includes the endpoint allowance, so an executor
/// can apply it uniformly to every person it visits.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalRequest {
    /// Correlates executor logs with the caller's request.
    pub request_id: String,
    pub source: i64,
    pub target: i64,
    pub person: Predicate,
    pub movie: Predicate,
    pub episode: Predicate,
    pub max_depth: usize,
    /// Point after which the caller has stopped waiting. Executors doing
    /// blocking work check it between steps and abandon the traversal.
    pub deadline: Option<Instant>,
}

impl TraversalRequest {
    pub fn predicate(&self, category: Category) -> &Predicate {
        match category {
            Category::Person => &self.person,
            Category::Movie => &self.movie,
            Category::Episode => &self.episode,
        }
    }

    /// True when no category is constrained.
    pub fn is_unconstrained(&self) -> bool {
        self.person.is_always() && self.movie.is_always() && self.episode.is_always()
    }

    pub fn deadline_passed(&self) -> bool {
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }

    /// Whether a node of `category` may appear on the path, by the reference
    /// semantics of [`Predicate::evaluate`].
    pub fn admits(&self, category: Category, record: &Record) -> bool {
        self.predicate(category).evaluate(record)
    }
}

/// Builds a [`TraversalRequest`], compiling every filter before anything is
/// submitted.
#[derive(Debug, Clone)]
pub struct PathQueryBuilder<'a> {
    source: i64,
    target: i64,
    filters: Option<&'a PathFilters>,
    max_depth: usize,
    request_id: Option<String>,
    deadline: Option<Instant>,
}

impl<'a> PathQueryBuilder<'a> {
    pub fn new(source: i64, target: i64) -> Self {
        Self {
            source,
            target,
            filters: None,
            max_depth: DEFAULT_MAX_DEPTH,
            request_id: None,
            deadline: None,
        }
    }

    pub fn filters(mut self, filters: Option<&'a PathFilters>) -> Self {
        self.filters = filters;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Defaults to a fresh UUID.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn build(self) -> Result<TraversalRequest> {
        let compile = |category: Category| -> Result<Predicate> {
            match self.filters.and_then(|f| f.get(category)) {
                Some(filter) => compile_filter(category, filter),
                None => Ok(Predicate::Always),
            }
        };

        let person = compile(Category::Person)?;
        let movie = compile(Category::Movie)?;
        let episode = compile(Category::Episode)?;

        Ok(TraversalRequest {
            request_id: self.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
            source: self.source,
            target: self.target,
            person: self.allow_endpoints(person),
            movie,
            episode,
            max_depth: self.max_depth,
            deadline: self.deadline,
        })
    }

    /// The two query subjects always pass the person filter.
    fn allow_endpoints(&self, person: Predicate) -> Predicate {
        if person.is_always() {
            return person;
        }
        Predicate::Or(vec![
            Predicate::OneOf {
                field: Category::Person.id_field(),
                values: vec![Operand::Int(self.source), Operand::Int(self.target)],
            },
            person,
        ])
    }
}
