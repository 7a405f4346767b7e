pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod finder;
pub mod graph;
pub mod query;

pub use config::Config;
pub use error::{Result, SixDegreesError};
pub use filter::{Category, PathFilters};
pub use finder::PathFinder;
pub use graph::{GraphExecutor, SqliteGraph, Triple};
