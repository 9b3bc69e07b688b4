//! CLI entry point for the IndyCar rater.
//!
//! Provides subcommands for listing and downloading session results from the
//! IndyStats API, enriching saved records with derived metrics, and ranking
//! drivers by Race Performance Index.

mod infra;
mod services;

use crate::infra::indycar::IndyCarClient;
use crate::infra::tracks::TrackLookup;
use crate::services::results_api::{ResultsApi, collect_records};
use anyhow::{Result, bail};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use indycar_rater::analyzers::analyzer::{drivers_in_file, enrich_file, summarize_file};
use indycar_rater::analyzers::types::SessionFilter;
use indycar_rater::config::AnalysisConfig;
use indycar_rater::fetch::{BasicClient, Paced};
use indycar_rater::output::{output_path, print_json, print_pretty, write_raw};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "indycar_rater")]
#[command(about = "Rank IndyCar drivers from session results", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions available from IndyStats
    Sessions {
        /// First season to include
        #[arg(long, default_value_t = 1996)]
        from: i32,

        /// Last season to include (defaults to the current year)
        #[arg(long)]
        to: Option<i32>,

        /// Session type: R, P, Q, W or All
        #[arg(short, long, default_value = "All")]
        session_type: SessionFilter,
    },
    /// Download raw session records to CSV
    Fetch {
        /// First season to include
        #[arg(long, default_value_t = 1996)]
        from: i32,

        /// Last season to include (defaults to the current year)
        #[arg(long)]
        to: Option<i32>,

        /// Session type: R, P, Q, W or All
        #[arg(short, long, default_value = "R")]
        session_type: SessionFilter,

        /// Optional: `;`-separated EventName;TrackName lookup file
        #[arg(long)]
        tracks: Option<String>,

        /// Directory to write the CSV to
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Gzip compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Add derived metrics to saved records
    Enrich {
        /// Raw records (.csv, .csv.gz or .json)
        #[arg(value_name = "FILE")]
        input: String,

        /// Session type: R, P, Q, W or All
        #[arg(short, long, default_value = "All")]
        session_type: SessionFilter,

        /// Directory to write the CSV to
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Gzip compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Rank drivers by Race Performance Index
    Summary {
        /// Raw records (.csv, .csv.gz or .json)
        #[arg(value_name = "FILE")]
        input: String,

        /// Optional: JSON analysis config; flags below override it
        #[arg(short, long)]
        config: Option<String>,

        /// Session type: R, P, Q, W or All
        #[arg(short, long)]
        session_type: Option<SessionFilter>,

        /// Rank each season separately
        #[arg(long, default_value_t = false)]
        by_season: bool,

        /// Drop drivers with fewer races than this
        #[arg(short, long)]
        min_races: Option<u32>,

        /// Number of top drivers to log
        #[arg(short, long, default_value_t = 10)]
        top: usize,

        /// Log every summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Directory to write the CSV to
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Gzip compress the CSV
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List the distinct drivers in saved records
    Drivers {
        /// Raw records (.csv, .csv.gz or .json)
        #[arg(value_name = "FILE")]
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/indycar_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("indycar_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sessions {
            from,
            to,
            session_type,
        } => {
            let to = to.unwrap_or_else(current_season);
            let client = IndyCarClient::new(paced_client()?);

            let sessions = client.list_sessions(from, to).await?;
            let matching: Vec<_> = sessions.iter().filter(|s| s.matches(session_type)).collect();

            for session in &matching {
                info!(
                    year = session.year,
                    event_id = session.event_id,
                    event = %session.event_name,
                    session_id = session.session_id,
                    session = %session.session_name,
                    "Session"
                );
            }
            info!(
                total = sessions.len(),
                matching = matching.len(),
                %session_type,
                "Session list summary"
            );
        }
        Commands::Fetch {
            from,
            to,
            session_type,
            tracks,
            output_dir,
            gzip,
        } => {
            let to = to.unwrap_or_else(current_season);
            fetch(from, to, session_type, tracks.as_deref(), &output_dir, gzip).await?;
        }
        Commands::Enrich {
            input,
            session_type,
            output_dir,
            gzip,
        } => {
            enrich_file(&input, session_type, &output_dir, gzip)?;
        }
        Commands::Summary {
            input,
            config,
            session_type,
            by_season,
            min_races,
            top,
            json,
            output_dir,
            gzip,
        } => {
            let mut analysis = match config {
                Some(path) => AnalysisConfig::load(&path)?,
                None => AnalysisConfig::default(),
            };
            if let Some(session_type) = session_type {
                analysis.session_type = session_type;
            }
            if by_season {
                analysis.summary.by_season = true;
            }
            if let Some(min_races) = min_races {
                analysis.summary.min_races = min_races;
            }

            let (_, summaries) = summarize_file(&input, &analysis, &output_dir, gzip)?;

            for (rank, s) in summaries.iter().take(top).enumerate() {
                info!(
                    rank = rank + 1,
                    driver = %s.driver_name,
                    season = ?s.season,
                    races = s.races_completed,
                    rpi = ?s.race_performance_index,
                    finish_percentile_index = ?s.finish_percentile_index,
                    adj_finish_rate = s.adj_finish_rate,
                    points_per_race = s.points_per_race,
                    "Driver"
                );
            }
            if json {
                print_json(&summaries)?;
            } else {
                print_pretty(&summaries);
            }
        }
        Commands::Drivers { input } => {
            let drivers = drivers_in_file(&input, SessionFilter::All)?;
            for driver in &drivers {
                info!(driver = %driver.driver_name, drivers_id = ?driver.drivers_id, "Driver");
            }
            info!(total = drivers.len(), "Driver list summary");
        }
    }

    Ok(())
}

fn current_season() -> i32 {
    Utc::now().year()
}

/// Builds the HTTP transport, waiting `INDYCAR_REQUEST_DELAY_MS` (default 200)
/// before every request.
fn paced_client() -> Result<Paced<BasicClient>> {
    let delay = match std::env::var("INDYCAR_REQUEST_DELAY_MS") {
        Ok(ms) => match ms.parse() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(value = %ms, "Invalid INDYCAR_REQUEST_DELAY_MS, using default");
                Paced::<BasicClient>::DEFAULT_DELAY
            }
        },
        Err(_) => Paced::<BasicClient>::DEFAULT_DELAY,
    };
    Ok(Paced::new(BasicClient::new()?, delay))
}

/// Downloads every matching session's records and saves them as
/// `sessions_<from>[_<to>].csv` in `output_dir`.
#[tracing::instrument(skip(tracks), fields(session_type = %session_type))]
async fn fetch(
    from: i32,
    to: i32,
    session_type: SessionFilter,
    tracks: Option<&str>,
    output_dir: &str,
    gzip: bool,
) -> Result<()> {
    let lookup = match tracks {
        Some(path) => {
            let lookup = TrackLookup::load(path)?;
            info!(path, tracks = lookup.len(), "Track lookup loaded");
            lookup
        }
        None => TrackLookup::default(),
    };
    let client = IndyCarClient::new(paced_client()?).with_tracks(lookup);

    let collected = collect_records(&client, from, to, session_type).await?;

    let name = if from == to {
        format!("sessions_{from}")
    } else {
        format!("sessions_{from}_{to}")
    };
    let path = output_path(output_dir, &name, gzip)?;
    write_raw(&path, &collected.records, gzip)?;

    info!(path = %path.display(), records = collected.records.len(), "Raw records saved");
    if collected.failed > 0 {
        bail!(
            "{} session(s) failed to download; {} is incomplete",
            collected.failed,
            path.display()
        );
    }
    Ok(())
}
