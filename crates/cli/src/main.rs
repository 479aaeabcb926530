use crate::{
    commands::{Commands, Target},
    conn::{ConnectionPinger, MssqlConnectionPinger, MySqlConnectionPinger},
    env::EnvManager,
    error::CliError,
    shutdown::ExitCode,
};
use clap::Parser;
use connectors::sql::{mssql::destination::MssqlBulkSink, mysql::source::MySqlRowSource};
use engine_config::transfer::{RECOGNIZED_VARS, TransferConfig, mssql_params, mysql_params};
use engine_processing::pipeline::{BulkTransferPipeline, TransferSettings};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{error, info, warn};

mod commands;
mod conn;
mod env;
mod error;
mod logging;
mod output;
mod shutdown;

const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Parser)]
#[command(
    name = "wb-sync",
    version,
    about = "One-shot initial load of weighbridge data from MySQL into SQL Server"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        help = "Environment file to load (defaults to ./.env when present)"
    )]
    env_file: Option<PathBuf>,

    #[arg(long, global = true, default_value = "logs", help = "Directory for run log files")]
    log_dir: PathBuf,

    #[arg(long, global = true, help = "Only log to the console")]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Only a real run leaves a log file behind.
    let log_dir = match cli.command {
        Commands::Run { .. } if !cli.no_log_file => Some(cli.log_dir.as_path()),
        _ => None,
    };
    match logging::init(log_dir) {
        Ok(Some(path)) => info!("Logging to {}", path.display()),
        Ok(None) => {}
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(ExitCode::GeneralError.as_i32());
        }
    }

    let code = match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            ExitCode::GeneralError
        }
    };
    std::process::exit(code.as_i32());
}

async fn execute(cli: Cli) -> Result<ExitCode, CliError> {
    let env = load_env(cli.env_file.as_deref())?;

    match cli.command {
        Commands::Run { report, json } => {
            let config = TransferConfig::from_vars(env.all())?;
            run_transfer(&config, report.as_deref(), json).await
        }
        Commands::TestConn { target } => {
            match target {
                Target::Mysql => {
                    MySqlConnectionPinger {
                        params: mysql_params(env.all())?,
                    }
                    .ping()
                    .await?
                }
                Target::Mssql => {
                    MssqlConnectionPinger {
                        params: mssql_params(env.all())?,
                    }
                    .ping()
                    .await?
                }
            }
            Ok(ExitCode::Success)
        }
        Commands::Config => {
            let variables: BTreeMap<&str, Option<String>> = RECOGNIZED_VARS
                .iter()
                .map(|name| (*name, env.masked(name)))
                .collect();
            let resolved = TransferConfig::from_vars(env.all());
            output::print_json(&serde_json::json!({
                "variables": variables,
                "resolved": resolved.as_ref().ok().map(TransferConfig::summary),
            }))?;
            resolved?;
            Ok(ExitCode::Success)
        }
    }
}

fn load_env(env_file: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::new();
    match env_file {
        Some(path) => env.load_from_file(path)?,
        None if Path::new(DEFAULT_ENV_FILE).is_file() => env.load_from_file(DEFAULT_ENV_FILE)?,
        None => {}
    }
    Ok(env)
}

async fn run_transfer(
    config: &TransferConfig,
    report_path: Option<&Path>,
    json: bool,
) -> Result<ExitCode, CliError> {
    let mut sink = MssqlBulkSink::connect(&config.mssql, config.destination_table.clone())
        .await
        .map_err(|e| CliError::Connect {
            target: "SQL Server",
            source: e,
        })?;
    let mut source = MySqlRowSource::connect(&config.mysql, config.source_table.clone())
        .await
        .map_err(|e| CliError::Connect {
            target: "MySQL",
            source: e,
        })?;

    let pipeline = BulkTransferPipeline::new(TransferSettings::new(config.wb_tag.clone()));
    let result = tokio::select! {
        result = pipeline.run(&mut source, &mut sink) => result,
        signal = shutdown::interrupted() => {
            warn!(
                "Received {}, abandoning the load. The server discards the open transaction.",
                signal
            );
            return Ok(ExitCode::Interrupted);
        }
    };

    if let Err(err) = source.disconnect().await {
        warn!("Failed to close MySQL connection: {}", err);
    }
    if let Err(err) = sink.close().await {
        warn!("Failed to close SQL Server connection: {}", err);
    }

    let report = result?;
    info!("{}", output::summary_line(&report));
    if let Some(path) = report_path {
        output::write_report(&report, path).await?;
    }
    if json {
        output::print_json(&report)?;
    }
    Ok(ExitCode::Success)
}
