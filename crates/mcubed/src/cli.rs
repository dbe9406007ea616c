//! CLI struct definitions.
//!
//! All clap-derived types live here. Dispatch of administrative commands lives
//! in `admin`.

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[clap(
    name = "mcubed",
    version = env!("CARGO_PKG_VERSION"),
    about = "Passphrase-encrypted document store with per-application table access control."
)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalArgs,

    /// Action to perform. Starts the HTTP server when omitted.
    #[clap(subcommand)]
    pub command: Option<Command>,
}

/// Options accepted by every command; each overrides its `MCUBED_*` variable.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path of the encrypted database file.
    #[clap(long, global = true)]
    pub db_path: Option<String>,

    /// Passphrase the database is encrypted with.
    #[clap(long, global = true)]
    pub password: Option<String>,

    /// Port for the HTTP server.
    #[clap(long, global = true)]
    pub port: Option<u16>,

    /// Tracing log level.
    #[clap(long, global = true)]
    pub log_level: Option<String>,
}

impl From<&GlobalArgs> for Overrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            db_path: args.db_path.clone(),
            password: args.password.clone(),
            port: args.port,
            log_level: args.log_level.clone(),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct AppArgs {
    /// Application name.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub app_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct AppTableArgs {
    /// Application name.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub app_name: String,
    /// Table name.
    #[clap(long, value_parser = NonEmptyStringValueParser::new())]
    pub table_name: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create an application key, or print the existing one
    ProvisionKey(AppArgs),
    /// Print the key of a registered application
    GetKey(AppArgs),
    /// Allow an application to access a table
    AllowTable(AppTableArgs),
    /// Deny an application access to a table
    DenyTable(AppTableArgs),
    /// Allow an application to access every non-restricted table
    AllowAll(AppArgs),
    /// Remove every grant held by an application
    DenyAll(AppArgs),
    /// Check whether an application key may access a table
    HasAccess {
        /// Application name.
        #[clap(long, value_parser = NonEmptyStringValueParser::new())]
        app_name: String,
        /// Application key.
        #[clap(long, value_parser = NonEmptyStringValueParser::new())]
        app_key: String,
        /// Table name.
        #[clap(long, value_parser = NonEmptyStringValueParser::new())]
        table_name: String,
    },
    /// Remove an application and all of its grants
    RevokeApp(AppArgs),
    /// Delete a table, its records, and every grant on it
    DropTable {
        /// Table name.
        #[clap(long, value_parser = NonEmptyStringValueParser::new())]
        table_name: String,
    },
    /// List the data tables in the database
    ListTables,
    /// Start the HTTP server
    Serve,
}
