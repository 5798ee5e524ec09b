use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

mod dates;
mod db;
mod features;
mod matrix;
mod model;
mod models;
mod pipeline;
mod report;
mod risk;

#[derive(Parser)]
#[command(name = "attendance-dropout-warning")]
#[command(about = "Attendance-based dropout risk scoring for school districts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import attendance events from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score dropout risk and persist it to student records
    Score {
        /// Score a single school instead of every school in the feed
        #[arg(long)]
        school: Option<String>,
        #[arg(long, default_value = "model/dropout_forest.json")]
        model: PathBuf,
    },
    /// Generate a markdown report over scored students
    Report {
        #[arg(long)]
        school: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} attendance events from {}.", csv.display());
        }
        Commands::Score { school, model } => {
            let classifier = model::Forest::from_path(&model)
                .with_context(|| format!("failed to load classifier from {}", model.display()))?;

            let schools = match school {
                Some(id) => vec![id],
                None => db::fetch_school_ids(&pool).await?,
            };

            if schools.is_empty() {
                println!("No schools found in the attendance feed.");
                return Ok(());
            }

            let mut total = 0usize;
            for school_id in &schools {
                let updated = pipeline::run_school(&pool, &classifier, school_id).await?;
                println!("{school_id}: updated {updated} student records.");
                total += updated;
            }
            println!("Done. {total} student records updated across {} schools.", schools.len());
        }
        Commands::Report { school, out } => {
            let students = db::fetch_scored_students(&pool, school.as_deref()).await?;
            let report = report::build_report(school.as_deref(), &students);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
