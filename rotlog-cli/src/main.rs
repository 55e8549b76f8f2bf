//! rotlog CLI binary.
//!
//! Entry point for the `rotlog` command-line tool.

use std::process::ExitCode;

use clap::Parser;
use rotlog_cli::exit::{codes, exit_code, parse_exit_code};
use rotlog_cli::{
    execute_pipe, execute_rotate, init_tracing, Cli, Command, CommandError, RotateArgs,
    ShutdownFlag, Verbosity,
};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors go to stderr, --help and --version to stdout
            let _ = e.print();
            return ExitCode::from(parse_exit_code(&e) as u8);
        }
    };
    init_tracing(Verbosity::from_count(cli.verbose));

    let result = match &cli.command {
        Some(Command::Rotate(args)) => run_rotate(&cli, args),
        None => run_pipe(&cli),
    };

    match result {
        Ok(()) => ExitCode::from(codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Copy standard input into the log file until it ends or Ctrl+C.
fn run_pipe(cli: &Cli) -> Result<(), CommandError> {
    let logfile = cli.pipe_target()?;

    // Set up shutdown handler for graceful termination on Ctrl+C
    let shutdown = ShutdownFlag::new();

    execute_pipe(logfile, &cli.policy, std::io::stdin(), &shutdown)?;
    Ok(())
}

/// Run the rotate command. The outcome is logged, not printed.
fn run_rotate(cli: &Cli, args: &RotateArgs) -> Result<(), CommandError> {
    execute_rotate(args, &cli.policy)?;
    Ok(())
}
