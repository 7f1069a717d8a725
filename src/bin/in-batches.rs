//! # In Batches CLI
//!
//! Walks a PostgreSQL table in primary-key ordered batches: print the page
//! plan, or delete/update page by page with an optional pause between pages
//! to throttle load on the database.

use anyhow::Context;
use clap::{Parser, Subcommand};
use in_batches::{
    logging, Assignment, BatchConfig, BatchKey, BatchSettings, Batchable, Page, Relation,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::PgPool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "in-batches")]
#[command(about = "Process a PostgreSQL table in primary-key ordered batches")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Database connection string (falls back to the settings file)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Settings file (TOML); IN_BATCHES_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table to process
    #[arg(short, long)]
    table: String,

    /// Primary key column (single, orderable)
    #[arg(long, default_value = "id")]
    primary_key: String,

    /// Raw SQL predicate; repeat to AND several together
    #[arg(short = 'w', long = "where")]
    predicates: Vec<String>,

    /// Rows per batch
    #[arg(long)]
    of: Option<usize>,

    /// Inclusive lower primary key bound
    #[arg(long)]
    begin_at: Option<String>,

    /// Inclusive upper primary key bound
    #[arg(long)]
    end_at: Option<String>,

    /// Pause between pages, in milliseconds
    #[arg(long)]
    throttle_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print index, size and key range of every page without modifying rows
    Plan,

    /// Delete the matching rows one page per statement
    Delete,

    /// Update the matching rows one page per statement
    Update {
        /// SET fragment such as "money = money + 1"; repeatable
        #[arg(long = "set", required = true)]
        assignments: Vec<String>,
    },
}

impl Cli {
    fn relation(&self) -> Relation {
        self.predicates.iter().fold(
            Relation::new(&self.table).primary_key(&self.primary_key),
            |relation, predicate| relation.where_raw(predicate),
        )
    }

    fn batch_config(&self, settings: &BatchSettings) -> BatchConfig {
        let mut config = settings.batch_config();
        if let Some(of) = self.of {
            config = config.of(of);
        }
        if let Some(begin_at) = &self.begin_at {
            config = config.begin_at(BatchKey::parse(begin_at));
        }
        if let Some(end_at) = &self.end_at {
            config = config.end_at(BatchKey::parse(end_at));
        }
        config
    }
}

fn describe(page: &Page<PgRow>) -> String {
    let bound = |key: Option<&BatchKey>| key.map(ToString::to_string).unwrap_or_default();
    format!(
        "{}\t{}\t{}\t{}",
        page.index(),
        page.len(),
        bound(page.first_key()),
        bound(page.last_key())
    )
}

async fn pause(throttle: Option<Duration>) {
    if let Some(duration) = throttle {
        tokio::time::sleep(duration).await;
    }
}

async fn run(cli: Cli, settings: BatchSettings, pool: &PgPool) -> anyhow::Result<()> {
    let throttle = cli
        .throttle_ms
        .map(Duration::from_millis)
        .or_else(|| settings.throttle());
    let batches = cli.relation().in_batches(cli.batch_config(&settings))?;
    let mut cursor = batches.cursor(pool)?;

    match &cli.command {
        Commands::Plan => {
            println!("page\tsize\tfirst_key\tlast_key");
            while let Some(page) = cursor.next_page().await? {
                println!("{}", describe(&page));
            }
        }
        Commands::Delete => {
            let mut deleted = 0;
            while let Some(page) = cursor.next_page().await? {
                let affected = page.delete_all(pool).await?;
                deleted += affected;
                info!(page = page.index(), affected, "Deleted batch");
                pause(throttle).await;
            }
            println!("deleted {deleted} rows in {} pages", cursor.pages_fetched());
        }
        Commands::Update { assignments } => {
            let assignments: Vec<Assignment> =
                assignments.iter().map(|sql| Assignment::raw(sql)).collect();
            let mut updated = 0;
            while let Some(page) = cursor.next_page().await? {
                let affected = page.update_all(pool, &assignments).await?;
                updated += affected;
                info!(page = page.index(), affected, "Updated batch");
                pause(throttle).await;
            }
            println!("updated {updated} rows in {} pages", cursor.pages_fetched());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    let cli = Cli::parse();
    let settings = BatchSettings::load(cli.config.as_deref())
        .context("Failed to load batch settings")?;

    let database_url = cli
        .database_url
        .clone()
        .or_else(|| settings.database_url.clone())
        .context("DATABASE_URL is not set")?;
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .context("Failed to connect to the database")?;

    run(cli, settings, &pool).await
}
