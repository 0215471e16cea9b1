#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the address repair tool.
//!
//! Repairs missing human-readable addresses in a TeslaMate database:
//! resolves the coordinates of drives and charging processes through a
//! Nominatim-compatible reverse geocoder and fills in their null address
//! references. Useful where the geocoding done at record time returned
//! nothing (e.g. behind a firewall that required a proxy).
//!
//! Per-record failures never abort a pass; the exit status is non-zero
//! only for fatal errors such as an unreachable database.

use std::time::Duration;

use addrfix_cli_utils::{IndicatifProgress, MultiProgress};
use addrfix_database::db::{self, DbConfig};
use addrfix_database::queries;
use addrfix_geocoder::{DEFAULT_BASE_URL, NominatimGeocoder, build_client};
use addrfix_repair::{PgStore, RepairOptions, fix_missing_addresses};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "addrfix", about = "Repairs missing addresses in a TeslaMate database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection flags shared by every subcommand.
#[derive(Args)]
struct DbArgs {
    /// Database host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Database port
    #[arg(short = 'p', long, default_value_t = 5432)]
    port: u16,

    /// Database user
    #[arg(short = 'u', long, default_value = "teslamate")]
    user: String,

    /// Database password (prompted for when omitted)
    #[arg(short = 'w', long)]
    password: Option<String>,

    /// Database name
    #[arg(short = 'd', long, default_value = "teslamate")]
    database: String,

    /// Full connection URL; overrides the field-wise flags. Also read
    /// from the `DATABASE_URL` environment variable.
    #[arg(long)]
    database_url: Option<String>,
}

impl DbArgs {
    /// Opens the database connection described by these flags, prompting
    /// for the password when it was not supplied.
    async fn connect(
        self,
    ) -> Result<Box<dyn switchy_database::Database>, Box<dyn std::error::Error>> {
        if let Some(url) = self
            .database_url
            .or_else(|| std::env::var("DATABASE_URL").ok())
        {
            return db::connect_url(&url).await;
        }

        let password = match self.password {
            Some(password) => password,
            None => dialoguer::Password::new()
                .with_prompt(format!("Password for {}@{}", self.user, self.host))
                .allow_empty_password(true)
                .interact()?,
        };

        db::connect(&DbConfig {
            host: self.host,
            port: self.port,
            user: self.user,
            password,
            database: self.database,
        })
        .await
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve and fill in missing addresses for drives and charging processes
    Fix {
        #[command(flatten)]
        db: DbArgs,

        /// HTTP(S) proxy URL for geocoding requests (e.g. `http://127.0.0.1:8080`)
        #[arg(short = 'x', long)]
        proxy: Option<String>,

        /// Geocoding request timeout in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Base URL of the Nominatim endpoint
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        geocoder_url: String,

        /// Resolve and report, but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Repeat the pass every N minutes (daemon mode)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show how many rows still need address resolution
    Status {
        #[command(flatten)]
        db: DbArgs,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = addrfix_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Status { db } => {
            let db = db.connect().await?;
            let counts = queries::candidate_counts(db.as_ref()).await?;
            println!("Drives missing a start address:        {}", counts.drive_starts);
            println!("Drives missing an end address:         {}", counts.drive_ends);
            println!("Charging processes missing an address: {}", counts.charges);
            println!("Total references to fix:               {}", counts.total());
        }
        Commands::Fix {
            db,
            proxy,
            timeout,
            geocoder_url,
            dry_run,
            interval,
        } => {
            let db = db.connect().await?;
            let client = build_client(Duration::from_secs(timeout), proxy.as_deref())?;
            let geocoder = NominatimGeocoder::new(client, geocoder_url);
            let store = PgStore::new(db.as_ref());
            let options = RepairOptions {
                dry_run,
                ..RepairOptions::default()
            };

            match interval {
                Some(minutes) => {
                    log::info!("Running in daemon mode with a {minutes} minute interval");
                    loop {
                        run_pass(&store, &geocoder, &options, &multi).await?;
                        tokio::time::sleep(Duration::from_secs(minutes * 60)).await;
                    }
                }
                None => run_pass(&store, &geocoder, &options, &multi).await?,
            }
        }
    }

    Ok(())
}

/// Runs a single fix pass with a progress bar attached.
async fn run_pass(
    store: &PgStore<'_>,
    geocoder: &NominatimGeocoder,
    options: &RepairOptions,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::fix_bar(multi, "Resolving addresses");
    let summary = fix_missing_addresses(store, geocoder, options, Some(progress)).await?;

    if summary.failed > 0 {
        log::warn!(
            "{} reference(s) could not be resolved; they stay eligible for the next run",
            summary.failed
        );
    }

    Ok(())
}
