//! Administrative commands run from the command line.
//!
//! Each command acts on an already-loaded [`AccessController`] (which saves
//! after every mutation) and prints one operator-facing message. Domain
//! failures such as an unknown application are reported as messages; only
//! persistence failures surface as errors.

use std::io::Write;

use anyhow::{Context, Result};

use crate::access::{normalize_table_name, AccessController, AccessError, DroppedTable};
use crate::cli::Command;
use crate::codec::Codec;

fn app_not_found(app_name: &str) -> String {
    format!(
        "The application {app_name} could not be found. Be sure you have created an application key for it."
    )
}

fn key_message(app_name: &str, app_key: &str, created: bool) -> String {
    if created {
        format!(
            "An application key has been created for {app_name}. Use this value to authenticate the application: {app_key}"
        )
    } else {
        format!(
            "The application {app_name} has been found. Use this value to authenticate the application: {app_key}"
        )
    }
}

/// Render a domain failure as a message, passing persistence errors through.
fn describe(err: AccessError, app_name: &str, restricted: &str) -> Result<String> {
    match err {
        AccessError::AppNotFound(_) => Ok(app_not_found(app_name)),
        AccessError::Restricted(_) => Ok(restricted.into()),
        AccessError::EmptyAppName => Ok("An application name must be specified.".into()),
        AccessError::EmptyTableName => Ok("A table name must be specified.".into()),
        AccessError::Codec(e) => Err(e).context("failed to save database"),
    }
}

/// Render the outcome of a grant operation.
fn grant_outcome(result: Result<(), AccessError>, app_name: &str, success: String) -> Result<String> {
    match result {
        Ok(()) => Ok(success),
        Err(e) => describe(e, app_name, "Cannot grant access to restricted tables."),
    }
}

fn dropped_message(table: &str, dropped: DroppedTable) -> String {
    match dropped {
        DroppedTable { existed: true, .. } => format!("Successfully removed the table {table}."),
        DroppedTable {
            existed: false,
            grants_removed: 0,
        } => format!("The table {table} does not exist."),
        DroppedTable {
            existed: false,
            grants_removed,
        } => format!("The table {table} does not exist. Removed {grants_removed} access grant(s) for it."),
    }
}

/// Execute one administrative command and return the message to print.
///
/// # Errors
///
/// Returns an error if the database cannot be saved, or if `command` is not
/// an administrative command.
pub fn execute<C: Codec>(controller: &mut AccessController<C>, command: &Command) -> Result<String> {
    match command {
        Command::ProvisionKey(args) => match controller.provision_key(&args.app_name) {
            Ok(key) => Ok(key_message(&args.app_name, &key.app_key, key.created)),
            Err(e) => describe(e, &args.app_name, ""),
        },
        Command::GetKey(args) => Ok(match controller.lookup_key(&args.app_name) {
            Some(key) => key_message(&args.app_name, &key, false),
            None => app_not_found(&args.app_name),
        }),
        Command::AllowTable(args) => grant_outcome(
            controller.grant_table(&args.app_name, &args.table_name, true),
            &args.app_name,
            format!(
                "Successfully allowed table {} to application {}.",
                normalize_table_name(&args.table_name),
                args.app_name
            ),
        ),
        Command::DenyTable(args) => grant_outcome(
            controller.grant_table(&args.app_name, &args.table_name, false),
            &args.app_name,
            format!(
                "Successfully denied table {} to application {}.",
                normalize_table_name(&args.table_name),
                args.app_name
            ),
        ),
        Command::AllowAll(args) => grant_outcome(
            controller.grant_all_tables(&args.app_name),
            &args.app_name,
            format!("Successfully allowed all tables to application {}.", args.app_name),
        ),
        Command::DenyAll(args) => grant_outcome(
            controller.deny_all_tables(&args.app_name),
            &args.app_name,
            format!("Successfully denied all tables to application {}.", args.app_name),
        ),
        Command::HasAccess {
            app_name,
            app_key,
            table_name,
        } => {
            let verb = if controller.authorize(app_name, app_key, table_name) {
                "has"
            } else {
                "does not have"
            };
            Ok(format!(
                "The application {app_name} {verb} access to {}.",
                normalize_table_name(table_name)
            ))
        }
        Command::RevokeApp(args) => match controller.revoke_app(&args.app_name) {
            Ok(true) => Ok(format!("Successfully removed the application {}.", args.app_name)),
            Ok(false) => Ok(app_not_found(&args.app_name)),
            Err(e) => describe(e, &args.app_name, ""),
        },
        Command::DropTable { table_name } => match controller.drop_table(table_name) {
            Ok(dropped) => Ok(dropped_message(&normalize_table_name(table_name), dropped)),
            Err(e) => describe(e, "", "Cannot remove restricted tables."),
        },
        Command::ListTables => {
            let tables = controller.list_tables();
            Ok(if tables.is_empty() {
                "There are no tables.".into()
            } else {
                tables.join("\n")
            })
        }
        Command::Serve => anyhow::bail!("serve is not an administrative command"),
    }
}

/// Execute `command` and print its message to `out`.
///
/// # Errors
///
/// See [`execute`]; also fails if `out` cannot be written.
pub fn run<C: Codec>(
    controller: &mut AccessController<C>,
    command: &Command,
    out: &mut impl Write,
) -> Result<()> {
    let message = execute(controller, command)?;
    writeln!(out, "{message}").context("failed to write command output")?;
    Ok(())
}
