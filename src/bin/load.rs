use anyhow::{Context, Result};
use clap::Parser;
use sixdegrees::db::{migrate, Db};
use sixdegrees::graph::store::{load_dataset, Dataset};
use sixdegrees::Config;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "load")]
#[command(about = "Load a JSON dataset of people, movies, shows, episodes and credits into the SixDegrees database")]
struct Args {
    /// Dataset file: {"persons": [...], "movies": [...], "shows": [...], "episodes": [...], "credits": [...]}
    dataset: PathBuf,

    /// Directory holding the SQL migrations
    #[arg(long, default_value = "migrations")]
    migrations: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "info")).init();

    let args = Args::parse();

    let config = Config::load()?;
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    let migrations_dir = args.migrations.clone();
    db.with_connection(move |conn| migrate::run_migrations(conn, &migrations_dir))
        .await?;

    let dataset = read_dataset(&args.dataset)?;

    let start = Instant::now();
    let stats = load_dataset(&db, dataset)
        .await
        .with_context(|| format!("Failed to load {}", args.dataset.display()))?;

    println!(
        "Loaded {} persons, {} movies, {} shows, {} episodes, {} credits in {:?}",
        stats.persons,
        stats.movies,
        stats.shows,
        stats.episodes,
        stats.credits,
        start.elapsed()
    );
    Ok(())
}

fn read_dataset(path: &Path) -> Result<Dataset> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
