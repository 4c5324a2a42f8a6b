//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Triage: run the OpenMRS end-to-end scenarios against a live browser
#[derive(Parser, Debug)]
#[command(name = "triage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios and report results
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Config file (defaults to ./triage.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Filter scenarios by regex or substring of "module › name"
    ///
    /// Modules are Authentication, Navigation, Service Queues and
    /// Registration; there is no "Module N:" prefix.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Application root URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Number of scenarios run in parallel
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Per-scenario timeout in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Whole-run timeout in milliseconds
    #[arg(long)]
    pub run_timeout: Option<u64>,

    /// Output directory for screenshots and reports
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Location picked on the location screen
    #[arg(long)]
    pub location: Option<String>,

    /// Chromium binary
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,

    /// Run against the in-memory clinic instead of a browser
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Filter scenarios by regex or substring of "module › name"
    ///
    /// Modules are Authentication, Navigation, Service Queues and
    /// Registration; there is no "Module N:" prefix.
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Report output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable summary on stdout
    #[default]
    Text,
    /// `report.json` in the output directory
    Json,
    /// `junit.xml` in the output directory
    Junit,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("triage").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["run"]);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(!args.headed);
        assert!(!args.mock);
        assert!(args.workers.is_none());
        assert!(args.format.is_none());
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.color, ColorArg::Auto);
    }

    #[test]
    fn test_run_flags() {
        let cli = parse(&[
            "-vv",
            "run",
            "--base-url",
            "http://localhost:8080/openmrs/spa",
            "--headed",
            "-j",
            "4",
            "--timeout",
            "60000",
            "--format",
            "junit",
            "--filter",
            "TC00[1-3]",
            "--location",
            "Outpatient Clinic",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert!(args.headed);
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.timeout, Some(60_000));
        assert_eq!(args.format, Some(ReportFormat::Junit));
        assert_eq!(args.filter.as_deref(), Some("TC00[1-3]"));
        assert_eq!(args.location.as_deref(), Some("Outpatient Clinic"));
    }

    #[test]
    fn test_list_json() {
        let cli = parse(&["list", "--json", "-f", "Navigation"]);
        let Commands::List(args) = cli.command else {
            panic!("expected list");
        };
        assert!(args.json);
        assert_eq!(args.filter.as_deref(), Some("Navigation"));
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = Cli::try_parse_from(["triage", "run", "--format", "html"]);
        assert!(result.is_err());
    }
}
