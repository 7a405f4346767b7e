use anyhow::{Context, Result};
use clap::Parser;
use sixdegrees::graph::{Project, Relationship, Triple};
use sixdegrees::{Config, PathFilters, PathFinder};

#[derive(Parser, Debug)]
#[command(name = "findpath")]
#[command(about = "Find the shortest chain of shared credits between two people")]
struct Args {
    /// First person id
    first_person_id: i64,

    /// Second person id
    second_person_id: i64,

    /// Person filter as JSON, e.g. '{"popularity_GT": 5.0}'
    #[arg(long)]
    person: Option<String>,

    /// Movie filter as JSON, e.g. '{"budget_GT": 1000000}'
    #[arg(long)]
    movie: Option<String>,

    /// Episode filter as JSON, e.g. '{"air_date_IN": ["2000-01-01", "2009-12-31"]}'
    #[arg(long)]
    episode: Option<String>,

    /// Override traversal.max_depth from config
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the path as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", "warn")).init();

    let args = Args::parse();
    let config = Config::load()?;

    let filters = PathFilters {
        person: parse_filter("--person", args.person.as_deref())?,
        movie: parse_filter("--movie", args.movie.as_deref())?,
        episode: parse_filter("--episode", args.episode.as_deref())?,
    };

    let mut finder = PathFinder::from_config(&config);
    if let Some(depth) = args.max_depth {
        finder = finder.with_max_depth(depth);
    }

    let path = finder
        .find_path(args.first_person_id, args.second_person_id, Some(&filters))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&path)?);
        return Ok(());
    }

    if path.is_empty() {
        println!(
            "No path between {} and {} under the given filters.",
            args.first_person_id, args.second_person_id
        );
        return Ok(());
    }

    println!("\n=== Path ({} steps) ===\n", path.len());
    for (idx, triple) in path.iter().enumerate() {
        println!("{:>3}. {}", idx + 1, describe(triple));
    }
    Ok(())
}

fn parse_filter(flag: &str, raw: Option<&str>) -> Result<Option<sixdegrees::filter::FilterMap>> {
    raw.map(|s| serde_json::from_str(s).with_context(|| format!("{} must be a JSON object", flag)))
        .transpose()
}

fn describe(triple: &Triple) -> String {
    let person = triple
        .person
        .name
        .clone()
        .unwrap_or_else(|| format!("person #{}", triple.person.person_id));

    let role = match &triple.relationship {
        Relationship::Cast(cast) => format!("played {}", cast.character),
        Relationship::Crew(crew) => match &crew.job {
            Some(job) => format!("was {} ({})", job, crew.department),
            None => format!("worked in {}", crew.department),
        },
    };

    let project = match &triple.project {
        Project::Movie(movie) => {
            let title = movie.title.clone().unwrap_or_else(|| format!("movie #{}", movie.movie_id));
            match &movie.release_date {
                Some(date) => format!("{} ({})", title, date.get(..4).unwrap_or(date)),
                None => title,
            }
        }
        Project::Episode(episode) => {
            let name = episode.name.clone().unwrap_or_else(|| format!("episode #{}", episode.episode_id));
            match &episode.parent_show {
                Some(show) => format!("{} of {}", name, show.name.as_deref().unwrap_or("an unknown show")),
                None => name,
            }
        }
    };

    format!("{} {} in {}", person, role, project)
}
