use anyhow::{Context, Result};
use sixdegrees::api::HttpServer;
use sixdegrees::db::{migrate, Db};
use sixdegrees::{Config, SixDegreesError};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // RUST_LOG wins; otherwise the configured level, falling back to info
    let default_level = config
        .as_ref()
        .map(|c| c.sixdegrees.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", default_level)).init();

    let config = config?;

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("verify");

    match command {
        "serve-http" => run_http_server(config).await?,
        "verify" => run_schema_verification(config).await?,
        other => anyhow::bail!("Unknown command '{}'. Expected 'serve-http' or 'verify'", other),
    }

    Ok(())
}

async fn prepare_database(config: &Config) -> Result<Db> {
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await
        .with_context(|| format!("Failed to migrate {}", config.db_path().display()))?;
    log::info!("Database initialized at {}", config.db_path().display());
    Ok(db)
}

/// Run the HTTP path-query server
async fn run_http_server(config: Config) -> Result<()> {
    log::info!("Starting SixDegrees HTTP Server v{}", env!("CARGO_PKG_VERSION"));
    prepare_database(&config).await?;

    let server = HttpServer::from_config(&config);
    server.run(config.http_server.port).await?;

    Ok(())
}

/// Apply migrations and check the graph schema
async fn run_schema_verification(config: Config) -> Result<()> {
    log::info!("Starting SixDegrees v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());
    log::info!(
        "Traversal: max_depth={}, enrichment_concurrency={}, timeout={}ms",
        config.traversal.max_depth,
        config.traversal.enrichment_concurrency,
        config.traversal.timeout_ms
    );

    let db = prepare_database(&config).await?;

    db.with_connection(|conn| {
        let missing = migrate::missing_graph_tables(conn)?;
        if !missing.is_empty() {
            for table in &missing {
                log::error!("Missing table: {}", table);
            }
            return Err(SixDegreesError::Config(format!(
                "Missing graph tables: {}",
                missing.join(", ")
            )));
        }

        let applied = migrate::get_applied_migrations(conn)?;
        log::debug!("✓ {} migrations applied", applied.len());

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(SixDegreesError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }

        let foreign_keys: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        if foreign_keys != 1 {
            return Err(SixDegreesError::Config("Foreign keys not enabled".to_string()));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(SixDegreesError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        let counts: Vec<(String, i64)> = migrate::GRAPH_TABLES
            .iter()
            .map(|table| -> rusqlite::Result<(String, i64)> {
                let count = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
                Ok((table.to_string(), count))
            })
            .collect::<rusqlite::Result<_>>()?;
        for (table, count) in counts {
            log::info!("  {}: {} rows", table, count);
        }

        Ok(())
    })
    .await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}
