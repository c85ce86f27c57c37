//! Seed data script - loads the named fixture sets into a database
//!
//! Run with: cargo run --bin seed-data -- --migrate
//!
//! Without `--set` every fixture set is loaded: users, locations, categories,
//! companies, parts, supplier parts, BOMs, stock items and build orders.

use anyhow::Context;
use clap::Parser;
use tracing::info;

use mrp_api::{
    db::{self, DbConfig},
    fixtures::{self, FixtureSet},
};

#[derive(Parser)]
#[command(name = "seed-data", about = "Load fixture sets into the MRP database", version)]
struct Args {
    /// Database URL; falls back to $DATABASE_URL, then a local SQLite file
    #[arg(long)]
    database_url: Option<String>,
    /// Fixture set to load (repeatable); dependencies are loaded too
    #[arg(long = "set", value_name = "SET")]
    sets: Vec<FixtureSet>,
    /// Run migrations before loading
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://mrp.db?mode=rwc".to_string());

    info!("=== MRP Seed Data ===");
    info!("Connecting to database: {}", database_url);
    let db = db::establish_connection_with_config(&DbConfig {
        url: database_url,
        max_connections: 5,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .context("failed to connect to database")?;

    if args.migrate {
        info!("Running migrations...");
        db::run_migrations(&db).await?;
    }

    let sets = if args.sets.is_empty() {
        FixtureSet::ALL.to_vec()
    } else {
        args.sets
    };

    let report = fixtures::load(&db, &sets)
        .await
        .context("failed to load fixtures")?;

    info!("=== Seed Complete ===");
    for set in &report.sets {
        info!("  loaded {}", set);
    }
    info!("  {} rows in total", report.rows);
    info!(
        "Log in as 'admin' or 'testuser' with password '{}'",
        fixtures::FIXTURE_PASSWORD
    );

    db::close_pool(db).await?;
    Ok(())
}
