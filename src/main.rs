use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, warn};

mod accumulate;
mod api;
mod category;
mod config;
mod db;
mod engine;
mod errors;
mod models;
mod query;
mod ranking;
mod report;
mod scoring;
mod store;
mod telemetry;
mod trends;

use crate::api::LeaderboardRequest;
use crate::config::{EngineArgs, EngineConfig};
use crate::engine::{LeaderboardEngine, RefreshOutcome};
use crate::store::{CsvIssueStore, IssueStore};

#[derive(Parser)]
#[command(name = "civic-leaderboard")]
#[command(about = "Community ranking engine for civic complaint tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct SourceArgs {
    /// Read issues from a CSV export instead of Postgres
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import issues from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Refresh once and print the leaderboard
    Leaderboard {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Case-insensitive match on name, location, level or email
        #[arg(long)]
        search: Option<String>,
        /// Category id, or "all"
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// Also report this contributor's rank, even outside the top list
        #[arg(long)]
        contributor: Option<String>,
        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long, default_value = "leaderboard.md")]
        out: PathBuf,
    },
    /// Keep refreshing on an interval until interrupted
    Watch {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Entries to print after each publish
        #[arg(long, default_value_t = 5)]
        show: usize,
    },
}

enum Action {
    Leaderboard {
        request: LeaderboardRequest,
        json: bool,
    },
    Report {
        out: PathBuf,
    },
    Watch {
        show: usize,
    },
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set unless --csv is given")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let (source, engine_args, action) = match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
            return Ok(());
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
            return Ok(());
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&connect().await?, &csv).await?;
            println!("Inserted {inserted} issues from {}.", csv.display());
            return Ok(());
        }
        Commands::Leaderboard {
            source,
            engine,
            search,
            category,
            limit,
            contributor,
            json,
        } => (
            source,
            engine,
            Action::Leaderboard {
                request: LeaderboardRequest {
                    search,
                    category,
                    limit,
                    contributor_id: contributor,
                },
                json,
            },
        ),
        Commands::Report {
            source,
            engine,
            out,
        } => (source, engine, Action::Report { out }),
        Commands::Watch {
            source,
            engine,
            show,
        } => (source, engine, Action::Watch { show }),
    };

    let config = EngineConfig::from(engine_args);
    match source.csv {
        Some(path) => run(CsvIssueStore::new(path), config, action).await,
        None => run(db::PgIssueStore::new(connect().await?), config, action).await,
    }
}

async fn refresh_once<S: IssueStore>(engine: &LeaderboardEngine<S>) -> anyhow::Result<()> {
    match engine.refresh().await {
        Ok(RefreshOutcome::Published {
            generated_at,
            records,
            contributors,
        }) => {
            debug!(%generated_at, records, contributors, "snapshot ready");
            Ok(())
        }
        Ok(RefreshOutcome::Coalesced) => Ok(()),
        Err(err) => {
            warn!(serving = %err.serving(), "no fresh snapshot available");
            Err(err).context("could not build leaderboard")
        }
    }
}

async fn run<S: IssueStore>(store: S, config: EngineConfig, action: Action) -> anyhow::Result<()> {
    let engine = Arc::new(LeaderboardEngine::new(store, config));

    match action {
        Action::Leaderboard { request, json } => {
            refresh_once(&engine).await?;
            let response = engine
                .respond(&request)
                .await
                .context("invalid leaderboard request")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
                return Ok(());
            }

            if response.contributors.is_empty() {
                println!("No contributors match this request.");
            } else {
                println!(
                    "Top contributors ({} of {} matching):",
                    response.contributors.len(),
                    response.total_matching
                );
                for c in &response.contributors {
                    println!(
                        "{:>4}. {} ({}) {} pts, impact {}, {}/{} resolved",
                        c.rank, c.name, c.level, c.points, c.impact_score, c.resolved, c.reported
                    );
                }
            }

            if let Some(id) = request.contributor_id.as_deref() {
                match &response.contributor_rank {
                    Some(hit) => println!(
                        "{} is ranked #{} with {} points.",
                        hit.contributor.name, hit.rank, hit.contributor.points
                    ),
                    None => println!("Contributor {id} has no reported issues."),
                }
            }
        }
        Action::Report { out } => {
            refresh_once(&engine).await?;
            let snapshot = engine.snapshot().await;
            let report = report::build_report(&snapshot, engine.config().top_n, engine.is_stale());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Action::Watch { show } => {
            let handle = engine.spawn_refresher();
            let mut last_seen = None;
            let mut ticker = tokio::time::interval(engine.config().refresh_interval);
            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    signal = &mut shutdown => {
                        if let Err(err) = signal {
                            warn!(error = %err, "failed to listen for ctrl-c");
                        }
                        break;
                    }
                    _ = ticker.tick() => {}
                }

                let snapshot = engine.snapshot().await;
                if last_seen == Some(snapshot.generated_at) || snapshot.record_count == 0 {
                    continue;
                }
                last_seen = Some(snapshot.generated_at);

                println!(
                    "[{}] {} contributors, {} points total{}",
                    snapshot.generated_at.format("%H:%M:%S"),
                    snapshot.summary.total_contributors,
                    snapshot.summary.total_points,
                    if engine.is_stale() { " (stale)" } else { "" }
                );
                for c in query::top_n(&snapshot, show) {
                    println!("  {:>3}. {} {} pts", c.rank, c.name, c.points);
                }
            }

            info!("shutting down refresher");
            handle.stop().await;
        }
    }

    Ok(())
}
