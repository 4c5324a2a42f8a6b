//! Triage CLI: run the OpenMRS end-to-end scenarios
//!
//! ## Usage
//!
//! ```bash
//! triage list                           # Show the scenario catalog
//! triage run                            # Run everything headless
//! triage run --filter TC00 --headed     # Watch a subset in a window
//! triage run --format junit -o out/     # Write out/junit.xml
//! ```

use clap::Parser;
use std::process::ExitCode;
use triage_cli::{
    init_tracing, list_scenarios, run_scenarios, Cli, CliResult, ColorChoice, Commands,
    ProgressReporter, Verbosity,
};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> CliResult<u8> {
    let cli = Cli::parse();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    init_tracing(verbosity);

    match cli.command {
        Commands::Run(args) => {
            let color = ColorChoice::from(cli.color).should_color();
            let reporter = ProgressReporter::new(color, verbosity.is_quiet());
            run_scenarios(&args, reporter)
        }
        Commands::List(args) => {
            list_scenarios(&args)?;
            Ok(0)
        }
    }
}
