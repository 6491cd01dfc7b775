mod config;
mod health;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use svckit::database::ConnectionManager;
use svckit::metrics;
use svckit::model::{NewPost, PostSchema};
use svckit::repository::{PostRepository, DEFAULT_PAGE_SIZE};

use health::{HealthChecker, HealthStatus};

#[derive(Parser, Debug)]
#[command(name = "post-service")]
#[command(about = "Post store data layer over ScyllaDB/Cassandra")]
struct Args {
    #[arg(short, long, default_value = "config/post-service.yaml", env = "POST_SERVICE_CONFIG")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the keyspace and tables if missing, then exit
    Bootstrap,
    /// Probe the store with a trivial read
    Health {
        /// Also print the prometheus exposition
        #[arg(long)]
        metrics: bool,
    },
    Create {
        #[arg(short, long)]
        user: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    Get {
        id: Uuid,
    },
    /// All posts, newest first
    List,
    ByUser {
        user: String,
    },
    Latest {
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
    },
    Popular {
        #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: usize,
    },
    /// Replace content, location and image of a post
    Update {
        id: Uuid,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        image: Option<String>,
    },
    Like {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load_config(&args.config)?;

    // Initialize tracing
    let level = &config.observability.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("post_service={},svckit={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting post-service ({} driver, keyspace {})",
        config.database.driver, config.database.keyspace
    );

    let schema = PostSchema::from(&config.database);
    let manager = ConnectionManager::connect(&config.database, schema.table_definitions()).await?;

    let result = run(&manager, schema, args.command).await;

    if let Err(e) = manager.shutdown().await {
        warn!("Error releasing session: {}", e);
    }
    result
}

async fn run(manager: &ConnectionManager, schema: PostSchema, command: Command) -> Result<()> {
    let session = manager.session()?;
    let posts = PostRepository::new(session.clone(), schema);

    match command {
        Command::Bootstrap => {
            info!("Keyspace {} is ready", manager.keyspace());
        }
        Command::Health { metrics: with_metrics } => {
            let report = HealthChecker::new(session).check().await;
            print_json(&report)?;
            if with_metrics {
                print!("{}", metrics::render());
            }
            if report.status == HealthStatus::Unhealthy {
                bail!("store unreachable");
            }
        }
        Command::Create { user, content, location, image } => {
            let post = posts
                .create(NewPost {
                    user_id: user,
                    content,
                    location,
                    image,
                })
                .await?;
            print_json(&post)?;
        }
        Command::Get { id } => match posts.get_by_id(id).await? {
            Some(post) => print_json(&post)?,
            None => bail!("post {} not found", id),
        },
        Command::List => print_json(&posts.get_all().await?)?,
        Command::ByUser { user } => print_json(&posts.get_by_user(&user).await?)?,
        Command::Latest { limit } => print_json(&posts.get_latest(limit).await?)?,
        Command::Popular { limit } => print_json(&posts.get_popular(limit).await?)?,
        Command::Update { id, content, location, image } => {
            let Some(mut changes) = posts.get_by_id(id).await? else {
                bail!("post {} not found", id);
            };
            if let Some(content) = content {
                changes.content = content;
            }
            if location.is_some() {
                changes.location = location;
            }
            if image.is_some() {
                changes.image = image;
            }
            match posts.update(changes).await? {
                Some(post) => print_json(&post)?,
                None => bail!("post {} not found", id),
            }
        }
        Command::Like { id } => {
            posts.increment_likes(id).await?;
            info!("Liked post {}", id);
        }
        Command::Delete { id } => {
            posts.delete(id).await?;
            info!("Deleted post {}", id);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
