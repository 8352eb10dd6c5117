//! `connector init` command - Create an empty manifest

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::GlobalOpts;
use crate::core::connector::{Connector, ConnectorError};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing manifest.json
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs, global: &GlobalOpts) -> Result<()> {
    let path = &global.connector_dir;

    if !path.exists() {
        std::fs::create_dir_all(path).into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Created directory {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    }

    let connector = if args.force {
        Connector::init_force(path)
    } else {
        Connector::init(path)
    };

    match connector {
        Ok(connector) => {
            if !global.quiet {
                println!(
                    "{} Initialized connector manifest at {}",
                    style("✓").green(),
                    style(connector.manifest_path().display()).cyan()
                );
                println!();
                println!("Next steps:");
                println!(
                    "  {} Add templates/system.json and datatype templates to the manifest",
                    style("→").blue()
                );
                println!(
                    "  {} Render the connector",
                    style("connector expand").yellow()
                );
            }
            Ok(())
        }
        Err(ConnectorError::AlreadyExists(path)) => {
            println!(
                "{} Manifest already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!(
                "Use {} to overwrite it",
                style("connector init --force").yellow()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
