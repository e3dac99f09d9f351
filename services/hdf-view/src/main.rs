//! Terminal browser for the HDF5 dataset service.
//!
//! Lists groups, prints attributes and snippets, and pages through dataset grids using the
//! same lazily fetched viewer model a GUI would use.

mod commands;
mod render;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dataset_viewer::ViewerConfig;
use hdf_client::{ClientConfig, HdfService, HttpHdfClient};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::commands::ShowOptions;

#[derive(Parser, Debug)]
#[command(name = "hdf-view")]
#[command(about = "Browse HDF5 files served by an HDF5 dataset service")]
struct Args {
    /// Base URL of the dataset service
    #[arg(long, global = true, env = "HDF_BASE_URL")]
    base_url: Option<String>,

    /// API token
    #[arg(long, global = true, env = "HDF_TOKEN")]
    token: Option<String>,

    /// Log level
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the contents of a group
    Ls {
        fpath: String,

        #[arg(long, default_value = "/")]
        uri: String,
    },

    /// Show the attributes of an object
    Attrs {
        fpath: String,

        #[arg(long)]
        uri: String,
    },

    /// Print h5py code that opens an object
    Snippet {
        fpath: String,

        #[arg(long)]
        uri: String,
    },

    /// Print a window of a dataset
    Show {
        fpath: String,

        #[arg(long)]
        uri: String,

        /// NumPy-style index expression selecting at most two axes
        #[arg(long)]
        ixstr: Option<String>,

        /// First row of the window
        #[arg(long, default_value = "0")]
        row: u64,

        /// First column of the window
        #[arg(long, default_value = "0")]
        col: u64,

        /// Number of rows to print
        #[arg(long, default_value = "20")]
        rows: u64,

        /// Number of columns to print
        #[arg(long, default_value = "10")]
        cols: u64,

        /// Seconds to wait for data blocks
        #[arg(long, default_value = "30")]
        timeout: u64,
    },
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logs go to stderr so tables on stdout stay clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&args.log_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let mut client_config = ClientConfig::from_env();
    if let Some(base_url) = args.base_url {
        client_config.base_url = base_url;
    }
    if let Some(token) = args.token.filter(|t| !t.is_empty()) {
        client_config.token = Some(token);
    }
    client_config.validate().map_err(|e| anyhow!(e))?;

    info!(base_url = %client_config.base_url, "Connecting to dataset service");
    let service: Arc<dyn HdfService> = Arc::new(HttpHdfClient::new(client_config)?);

    let output = match args.command {
        Command::Ls { fpath, uri } => commands::ls(service.as_ref(), &fpath, &uri).await?,
        Command::Attrs { fpath, uri } => commands::attrs(service.as_ref(), &fpath, &uri).await?,
        Command::Snippet { fpath, uri } => {
            commands::snippet(service.as_ref(), &fpath, &uri).await?
        }
        Command::Show {
            fpath,
            uri,
            ixstr,
            row,
            col,
            rows,
            cols,
            timeout,
        } => {
            let opts = ShowOptions {
                ixstr,
                row,
                col,
                rows,
                cols,
                timeout: Duration::from_secs(timeout),
            };
            let window =
                commands::show(service, &fpath, &uri, ViewerConfig::from_env(), &opts).await?;
            render::window_table(&window)
        }
    };

    println!("{output}");
    Ok(())
}
