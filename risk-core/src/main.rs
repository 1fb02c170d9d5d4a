//! HealthScore CLI - Main Entry Point
//!
//! Runs the NPPES pipeline stages and the dashboard views from the terminal.
//! Every command prints its result as JSON on stdout; logs go to stderr.

mod api;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use serde::Serialize;

use healthscore_core::constants;
use healthscore_core::logic::dashboard::{AlertConfig, ProviderQuery};
use healthscore_core::logic::model::BandConfig;
use healthscore_core::logic::pipeline::{self, PipelinePaths};
use healthscore_core::logic::scenario::{ScoringClient, ScoringConfig};

use api::scenario::ScorerSource;

#[derive(Parser, Debug)]
#[command(name = "healthscore")]
#[command(version, about = "Provider denial-risk dashboard and NPPES model pipeline")]
struct Cli {
    /// Raw NPPES file (default: $NPPES_DATA_PATH/$NPI_FILE)
    #[arg(long, global = true)]
    raw_file: Option<PathBuf>,

    /// Processed data directory (default: $DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Model artifact directory (default: $MODELS_DIR)
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    /// Train and score from this table instead of the feature file
    /// (e.g. the output of `claims`)
    #[arg(long, global = true)]
    training_table: Option<PathBuf>,

    /// Provider roster JSON (default: built-in mock roster)
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter the raw registry file down to organizations
    Process {
        /// Read at most this many rows
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Engineer model features from processed data
    Features {
        /// Reference date for day counts (YYYY-MM-DD, default today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Merge a claims CSV onto the features; observed denials become the target
    Claims {
        /// CSV with NPI and denial_status (claim_amount, claim_date, denial_reason optional)
        file: PathBuf,
    },
    /// Merge a local UHC in-network rate file (MRF JSON or CSV) onto the features
    Uhc { file: PathBuf },
    /// Write encoded splits and trainer parameters
    Prepare {
        #[arg(long)]
        no_class_weights: bool,
        #[arg(long)]
        no_smote: bool,
    },
    /// Evaluate the trained checkpoint and save artifacts
    Evaluate {
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,
    },
    /// Process, engineer, prepare and evaluate when a checkpoint exists
    Run {
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Score providers by NPI from the feature table
    Predict {
        #[arg(required = true)]
        npis: Vec<String>,
        /// Output CSV (default: $DATA_DIR/predictions.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// List providers matching a search
    Providers {
        #[arg(long, short)]
        query: Option<String>,
        #[arg(long)]
        high_risk_only: bool,
    },
    /// Dashboard aggregates
    Summary {
        #[arg(long, default_value_t = AlertConfig::default().trend_threshold)]
        trend_threshold: f64,
    },
    /// Risk alerts, most severe first
    Alerts {
        #[arg(long, default_value_t = AlertConfig::default().trend_threshold)]
        trend_threshold: f64,
    },
    /// Six-month denial-rate forecasts
    Forecast,
    /// Score a what-if scenario for one provider
    Simulate {
        provider: String,
        /// Feature edits as name=value
        #[arg(long = "set", short)]
        edits: Vec<String>,
        /// Score with a local checkpoint instead of the scoring service
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Check the scoring service
    Health,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Cli {
    fn paths(&self) -> PipelinePaths {
        let defaults = PipelinePaths::from_env();
        PipelinePaths::new(
            self.raw_file.clone().unwrap_or(defaults.raw_file),
            self.data_dir.clone().unwrap_or(defaults.data_dir),
            self.models_dir.clone().unwrap_or(defaults.models_dir),
        )
        .with_training_table(self.training_table.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    let paths = cli.paths();

    match &cli.command {
        Command::Process { sample_size } => {
            print_json(&pipeline::process(&paths, *sample_size)?)?;
        }
        Command::Features { today } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            let target = pipeline::engineer(&paths, today)?;
            print_json(&serde_json::json!({
                "features": paths.features(),
                "target": target.to_string(),
            }))?;
        }
        Command::Claims { file } => {
            print_json(&pipeline::merge_claims(&paths, file)?)?;
        }
        Command::Uhc { file } => {
            print_json(&pipeline::merge_uhc(&paths, file)?)?;
        }
        Command::Prepare {
            no_class_weights,
            no_smote,
        } => {
            print_json(&pipeline::prepare(&paths, !no_class_weights, !no_smote)?)?;
        }
        Command::Evaluate { threshold } => {
            print_json(&pipeline::evaluate(&paths, *threshold)?)?;
        }
        Command::Run { sample_size } => {
            print_json(&pipeline::run(&paths, *sample_size)?)?;
        }
        Command::Predict { npis, output } => {
            let predictions = pipeline::predict(&paths, npis, output.as_deref())?;
            print_json(&predictions)?;
        }
        Command::Providers {
            query,
            high_risk_only,
        } => {
            let providers = api::dashboard::roster(cli.roster.as_deref())?;
            let query = ProviderQuery {
                query: query.clone(),
                high_risk_only: *high_risk_only,
            };
            print_json(&api::dashboard::get_providers(&providers, &query))?;
        }
        Command::Summary { trend_threshold } => {
            let providers = api::dashboard::roster(cli.roster.as_deref())?;
            let config = AlertConfig {
                trend_threshold: *trend_threshold,
            };
            print_json(&api::dashboard::get_summary(&providers, &config))?;
        }
        Command::Alerts { trend_threshold } => {
            let providers = api::dashboard::roster(cli.roster.as_deref())?;
            let config = AlertConfig {
                trend_threshold: *trend_threshold,
            };
            print_json(&api::dashboard::get_alerts(&providers, &config))?;
        }
        Command::Forecast => {
            let providers = api::dashboard::roster(cli.roster.as_deref())?;
            print_json(&api::dashboard::get_forecasts(&providers))?;
        }
        Command::Simulate {
            provider,
            edits,
            model,
        } => {
            let providers = api::dashboard::roster(cli.roster.as_deref())?;
            let provider = providers
                .iter()
                .find(|p| &p.key == provider)
                .ok_or_else(|| anyhow!("unknown provider {}", provider))?;
            let edits = api::scenario::parse_edits(edits)?;
            let source = match model {
                Some(path) => ScorerSource::Local(path.clone()),
                None => ScorerSource::Remote(ScoringConfig::default()),
            };

            let outcome = api::scenario::simulate(provider, &edits, source).await?;
            let bands = BandConfig::default();
            print_json(&serde_json::json!({
                "outcome": outcome,
                "interpretation": bands.interpretation(outcome.probability),
            }))?;
        }
        Command::Health => {
            let client = ScoringClient::new(ScoringConfig::default())?;
            let health = client.health().await?;
            print_json(&serde_json::json!({
                "base_url": client.base_url(),
                "status": health.status,
                "version": health.version,
                "model_loaded": health.model_loaded,
            }))?;
        }
    }

    Ok(())
}
