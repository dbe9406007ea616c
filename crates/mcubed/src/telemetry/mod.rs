//! Structured logging, with optional span export over OTLP.
//!
//! # Telemetry invariants
//!
//! - **No secrets** (passphrase, derived key, app keys) in any span attribute
//!   or log field.
//! - Log level is configurable via `MCUBED_LOG_LEVEL` / `--log-level`
//!   (default: `info`); `RUST_LOG` takes precedence when set.

pub mod init;

pub use init::{init_telemetry, shutdown_telemetry};
