//! `mcubed`: binary entry point.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`Config`] from environment variables and flags.
//! 3. Initialise the telemetry pipeline (tracing + optional OTLP).
//! 4. Decrypt and load the database file.
//! 5. Run the administrative command, or start the HTTP server.

mod access;
mod admin;
mod cli;
mod codec;
mod config;
mod crypto;
mod server;
mod store;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use access::AccessController;
use cli::{Cli, Command};
use codec::{Codec, CodecError, EncryptedFile};
use config::{Config, Overrides};

fn invalid_password(db_path: &str) -> String {
    format!(
        "An invalid password has been specified. You must enter the same password for every \
         command issued to this module. The password cannot be recovered. If you do not remember \
         the password, you may manually delete the {db_path} file. This means you will lose all \
         of your data stored by this module."
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::load(&Overrides::from(&cli.global)).map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        db_path = %cfg.db_path,
        "mcubed starting"
    );

    // -----------------------------------------------------------------------
    // 4. Database
    // -----------------------------------------------------------------------
    let codec: Box<dyn Codec> = Box::new(EncryptedFile::new(&cfg.db_path, cfg.password.clone()));
    let mut controller = match AccessController::open(codec) {
        Ok(controller) => controller,
        Err(CodecError::Unreadable { .. }) => anyhow::bail!(invalid_password(&cfg.db_path)),
        Err(e) => return Err(e.into()),
    };

    // -----------------------------------------------------------------------
    // 5. Command
    // -----------------------------------------------------------------------
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::serve(controller, cfg.port, cfg.request_timeout()).await,
        command => admin::run(&mut controller, &command, &mut std::io::stdout()),
    };

    telemetry::shutdown_telemetry();
    result
}
