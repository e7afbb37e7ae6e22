//! binpkg - install a package's prebuilt binary, verified

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use binpkg_cli::ops::InstallError;
use binpkg_cli::{Cli, Commands, cmd, ui};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging (stderr, so stdout carries only command output)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        }
    });

    let result = match cli.command {
        Commands::Install(args) => cmd::install::install(&args, cli.quiet, cancel).await,
        Commands::Check { manifest } => cmd::check::check(&manifest),
        Commands::Hash { files } => cmd::hash::hash(&files).map_err(InstallError::from),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::print_error(&err);
            ExitCode::from(err.exit_code())
        }
    }
}
