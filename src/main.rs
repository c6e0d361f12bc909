//! CLI entry point for the collage builder

use anncollage::io::cli::{Cli, CommandRunner};
use anncollage::io::logging;
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.quiet);

    let mut runner = CommandRunner::new(cli);
    match runner.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{error}");
            ExitCode::FAILURE
        }
    }
}
