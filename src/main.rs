mod commands;
mod telemetry;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::commands::{
    clone_folder::CloneFolderArgs, download::DownloadArgs, overwrite::OverwriteArgs,
};

/// Move feature data to and from ArcGIS Online.
///
/// Connection settings come from `AGOL_*` environment variables, optionally
/// loaded from a `.env` file in the working directory.
#[derive(Debug, Parser)]
#[command(name = "agol-tools", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Truncate a hosted feature layer and reload it from a local feature set.
    Overwrite(OverwriteArgs),
    /// Download a hosted feature layer into a geospatial table.
    Download(DownloadArgs),
    /// Copy every item of one folder into another (created if missing).
    CloneFolder(CloneFolderArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; everything can come from the real environment.
    let dotenv = dotenvy::dotenv();

    telemetry::init()?;

    match dotenv {
        Ok(path) => debug!(path = %path.display(), ".env loaded"),
        Err(e) if e.not_found() => debug!("no .env file"),
        Err(e) => warn!(error = %e, ".env could not be read"),
    }

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

    match cli.command {
        Command::Overwrite(args) => commands::overwrite::run(args, &cancel).await,
        Command::Download(args) => commands::download::run(args).await,
        Command::CloneFolder(args) => commands::clone_folder::run(args, &cancel).await,
    }
}

/// Cancels `token` on the first Ctrl+C; long runs stop at their next checkpoint.
async fn cancel_on_ctrl_c(token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("interrupt received, finishing current record");
            token.cancel();
        }
        Err(e) => warn!(error = %e, "cannot listen for Ctrl+C"),
    }
}
