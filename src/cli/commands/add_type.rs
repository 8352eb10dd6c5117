//! `connector add-type` command - reserved, not implemented

use clap::CommandFactory;
use miette::Result;

use crate::cli::Cli;

pub fn run() -> Result<()> {
    eprintln!("{}", Cli::command().render_usage());
    Err(miette::miette!(
        code = "connector::cli::not_implemented",
        "`add-type` is not implemented yet"
    ))
}
