//! Tracing setup.
//!
//! The terminal belongs to the UI, so log output goes to a file when one is
//! given and is discarded otherwise.  `RUST_LOG` overrides the default
//! `info` filter, e.g. `RUST_LOG=livescroll_social=debug`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber.  Call once, before anything logs.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(path) => {
            let file = open_log(path)?;
            registry
                .with(fmt::layer().compact().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
                .context("installing tracing subscriber")?;
        }
        None => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::sink))
                .try_init()
                .context("installing tracing subscriber")?;
        }
    }
    Ok(())
}

fn open_log(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
