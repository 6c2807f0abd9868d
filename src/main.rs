use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ports_service::config::{DatabaseConfig, ImportConfig};
use ports_service::error::PortError;
use ports_service::import::ImportOutcome;
use ports_service::repository::PostgresPortRepository;
use ports_service::service::PortService;
use ports_service::{db, init_logger, shutdown};

#[derive(Parser, Debug)]
#[command(name = "ports-service", about = "Store and query port records")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Server,
    /// Stream a JSON document of ports into the database.
    Import {
        /// Path to a JSON object keyed by port id.
        #[arg(short, long)]
        file: PathBuf,

        /// Ports per bulk upsert; overrides IMPORT_BATCH_SIZE.
        #[arg(long)]
        batch_size: Option<usize>,
    },
}

#[rocket::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger();

    match cli.command.unwrap_or(Command::Server) {
        Command::Server => {
            log::info!("starting ports service");
            match ports_service::rocket().launch().await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    log::error!("server failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
        Command::Import { file, batch_size } => {
            let import_config = match batch_size {
                Some(size) => ImportConfig::with_batch_size(size),
                None => ImportConfig::from_env(),
            };

            match run_import(file, import_config).await {
                Ok(ImportOutcome::Completed(stats)) => {
                    log::info!("import finished: {}", stats);
                    ExitCode::SUCCESS
                }
                Ok(ImportOutcome::Cancelled(stats)) => {
                    log::info!("import stopped gracefully after {}", stats);
                    ExitCode::SUCCESS
                }
                Err(e) if e.is_invalid_json() => {
                    log::error!("import input rejected: {}", e);
                    ExitCode::from(2)
                }
                Err(e) => {
                    log::error!("import failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn run_import(file: PathBuf, import_config: ImportConfig) -> Result<ImportOutcome, PortError> {
    let database = DatabaseConfig::from_env();
    let pool = db::connect(&database).await?;
    db::run_migrations(&pool).await?;

    let reader = File::open(&file)?;
    log::info!("importing ports from {}", file.display());

    let service = PortService::new(Arc::new(PostgresPortRepository::new(pool)), import_config);
    service.import_ports(reader, shutdown::cancel_on_signal()).await
}
