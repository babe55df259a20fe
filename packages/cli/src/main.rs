#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for case records.
//!
//! `serve` starts the HTTP API, `train` fits and saves the model bundle from
//! the case store, and `count` reports how many cases match a filter. Flags
//! override the `BIND_ADDR`, `PORT`, `CASES_STORE`, `CASES_DB_PATH`, and
//! `MODEL_PATH` environment variables.

mod train;

use std::path::PathBuf;

use case_records_classifier::ForestConfig;
use case_records_database::db::{StoreKind, open_store};
use case_records_database::queries;
use case_records_database_models::{CaseFilter, RawFilter};
use case_records_server::ServerConfig;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "case_records", about = "Case records API and classifier toolchain")]
struct Cli {
    /// Store implementation: `sqlite` or `memory` (overrides `CASES_STORE`)
    #[arg(long, global = true)]
    store: Option<String>,
    /// Path of the `SQLite` case store (overrides `CASES_DB_PATH`)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,
    /// Path of the model artifact (overrides `MODEL_PATH`)
    #[arg(long, global = true)]
    model_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Address to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind_addr: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Train the case type classifier from the store and save it
    Train {
        /// Number of trees in the forest
        #[arg(long, default_value = "100")]
        trees: usize,
        /// Maximum tree depth (unlimited if not set)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Random seed for bootstrap and feature sampling
        #[arg(long, default_value = "42")]
        seed: u64,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Count cases matching the given filters
    Count {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// The same filters the HTTP API accepts.
#[derive(Args)]
struct FilterArgs {
    /// Victim sex (`todos` for any)
    #[arg(long)]
    sexo: Option<String>,
    /// Victim ethnicity (`todos` for any)
    #[arg(long)]
    etnia: Option<String>,
    /// Inclusive minimum victim age
    #[arg(long)]
    idade_min: Option<String>,
    /// Inclusive maximum victim age
    #[arg(long)]
    idade_max: Option<String>,
    /// Inclusive start date (YYYY-MM-DD)
    #[arg(long)]
    data_inicio: Option<String>,
    /// Inclusive end date (YYYY-MM-DD)
    #[arg(long)]
    data_fim: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<CaseFilter, Box<dyn std::error::Error>> {
        Ok(CaseFilter::from_params(RawFilter {
            sex: self.sexo.as_deref(),
            ethnicity: self.etnia.as_deref(),
            age_min: self.idade_min.as_deref(),
            age_max: self.idade_max.as_deref(),
            date_from: self.data_inicio.as_deref(),
            date_to: self.data_fim.as_deref(),
        })?)
    }
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let mut config = ServerConfig::from_env();
        if let Some(store) = &self.store {
            config.store = store.parse::<StoreKind>()?;
        }
        if let Some(path) = &self.db_path {
            config.db_path.clone_from(path);
        }
        if let Some(path) = &self.model_path {
            config.model_path.clone_from(path);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();
    let mut config = cli.server_config()?;

    match cli.command {
        Commands::Serve { bind_addr, port } => {
            if let Some(bind_addr) = bind_addr {
                config.bind_addr = bind_addr;
            }
            if let Some(port) = port {
                config.port = port;
            }

            // actix-web drives its own system runtime; keep it off the tokio
            // worker threads.
            tokio::task::spawn_blocking(move || {
                actix_rt::System::new().block_on(case_records_server::run_server(config))
            })
            .await??;
        }
        Commands::Train {
            trees,
            max_depth,
            seed,
            filter,
        } => {
            let store = open_store(config.store, &config.db_path).await?;
            let forest = ForestConfig {
                n_trees: trees,
                max_depth,
                seed,
                ..ForestConfig::default()
            };
            train::run(
                store.as_ref(),
                &filter.to_filter()?,
                &forest,
                &config.model_path,
            )
            .await?;
        }
        Commands::Count { filter } => {
            let store = open_store(config.store, &config.db_path).await?;
            let count = queries::count_cases(store.as_ref(), &filter.to_filter()?).await?;
            println!("{count}");
        }
    }

    Ok(())
}
