use rusqlite::Connection;
use std::path::Path;
use tokio::task;
use crate::error::{Result, SixDegreesError};

/// Pragmas applied to every connection.
/// WAL lets the HTTP server read while a loader writes; foreign keys keep
/// credits pointing at real people and projects.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -65536; \
     PRAGMA busy_timeout = 5000;";

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct Db {
    path: std::path::PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute a closure with a fresh connection in a blocking task.
    ///
    /// The connection lives only for the closure and is closed when it
    /// returns, whether it succeeded or not.
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = Connection::open(&path)
                .map_err(SixDegreesError::Database)?;
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            SixDegreesError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("database task failed: {}", e),
            ))
        })?
    }
}

pub mod migrate;
