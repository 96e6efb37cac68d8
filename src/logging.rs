//! Logging infrastructure for rustlink.
//!
//! This module provides structured logging using the `log` facade and the
//! `env_logger` backend. Log levels are determined by (in priority order):
//!
//! 1. `RUSTLINK_LOG` environment variable (if set)
//! 2. `RUST_LOG` environment variable (if set)
//! 3. CLI flags: `--quiet` (error only) or `-v`/`-vv`/`-vvv`
//! 4. Default: warn level, since the run report is printed separately
//!
//! Logs always go to stderr.
//!
//! # Example
//!
//! ```rust,no_run
//! use rustlink::logging::init_logging;
//!
//! // -vv: debug level
//! init_logging(2, false);
//! log::debug!("Logging ready");
//! ```

use std::env;
use std::io::Write;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Environment variable that overrides the CLI verbosity.
pub const LOG_ENV: &str = "RUSTLINK_LOG";

/// Initialize the logging subsystem based on CLI verbosity flags.
///
/// Safe to call more than once; later calls are ignored.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=warn, 1=info, 2=debug, 3+=trace)
/// * `quiet` - If true, only show errors (overridden by the environment)
pub fn init_logging(verbose: u8, quiet: bool) {
    let mut builder = Builder::new();
    builder.target(Target::Stderr);

    let from_env = [LOG_ENV, "RUST_LOG"]
        .into_iter()
        .find_map(|name| env::var(name).ok().map(|value| (name, value)));

    match from_env {
        Some((_, ref filters)) => {
            builder.parse_filters(filters);
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
        }
    }

    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    match from_env {
        Some((name, filters)) => log::debug!("Logging initialized from {}={}", name, filters),
        None => log::debug!(
            "Logging initialized at level: {:?}",
            determine_level(verbose, quiet)
        ),
    }
}

/// Determine the log level from CLI flags.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Configure the log format.
///
/// Debug and trace output include the module path.
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let level_style = buf.default_level_style(level);

        if verbose >= 2 {
            writeln!(
                buf,
                "{} {level_style}{:<5}{level_style:#} [{}] {}",
                buf.timestamp_seconds(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{level_style}{:<5}{level_style:#} {}",
                level,
                record.args()
            )
        }
    });
}
