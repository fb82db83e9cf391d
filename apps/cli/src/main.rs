//! CoursePath CLI: degree-audit checking from the command line.
//!
//! Parses an audit export, matches it against a program's requirements, and
//! lists the courses still needed with their upcoming offerings.

mod commands;
mod output;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
