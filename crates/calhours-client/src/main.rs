//! calhours CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use calhours_client::cli::{Cli, Command, ConfigAction};
use calhours_client::commands;
use calhours_client::commands::auth::CredentialArgs;
use calhours_client::config::ClientConfig;
use calhours_client::error::ClientResult;
use calhours_core::tracing::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    let config = if cli.config.is_some() {
        ClientConfig::load_from(&config_path)
    } else {
        ClientConfig::load()
    };

    let debug = cli.debug || config.as_ref().is_ok_and(|c| c.debug);
    let logging = config.as_ref().map(|c| c.logging.clone()).unwrap_or_default();
    if let Err(e) = init_tracing(logging.tracing_config(debug, cli.log_format)) {
        eprintln!("warning: {}", e);
    }

    let result = match config {
        Ok(config) => run(cli, config_path, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config_path: PathBuf, config: ClientConfig) -> ClientResult<()> {
    let credentials_file = cli.credentials_file.as_deref();
    let token_path = cli.token_path.as_deref();

    match cli.command {
        Some(Command::Auth {
            ref client_id,
            ref client_secret,
            force,
        }) => {
            let args = CredentialArgs {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                credentials_file: cli.credentials_file.clone(),
            };
            commands::auth::google(args, force, token_path, &config_path, &config).await
        }
        Some(Command::Calendars) => {
            let provider = commands::google_provider(credentials_file, token_path, &config)?;
            let client = provider.connect().await?;
            commands::calendars::print(&client).await
        }
        Some(Command::Config { ref action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config, &config_path),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(&config_path),
        },
        Some(Command::Report(_)) | None => {
            let options = config.report.resolve(cli.report_args())?;
            let provider = commands::google_provider(credentials_file, token_path, &config)?;
            let client = provider.connect().await?;
            commands::report::print(&client, &options).await
        }
    }
}
