//! Triage CLI library
//!
//! Command-line front end for the `triage` scenario runner: flag and
//! config-file handling, logging setup, progress output and reports.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;

pub use commands::{Cli, ColorArg, Commands, ListArgs, ReportFormat, RunArgs};
pub use config::{ColorChoice, RunConfig, Verbosity, BASE_URL_ENV, DEFAULT_CONFIG_FILE};
pub use error::{CliError, CliResult};
pub use output::{render_listing, render_listing_json, ProgressReporter};
pub use runner::{init_tracing, list_scenarios, resolve_config, run_scenarios, write_report};

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
