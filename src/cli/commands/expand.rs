//! `connector expand` command - Render templates into a concrete tree

use console::style;
use miette::Result;

use crate::cli::commands::open_connector;
use crate::cli::GlobalOpts;
use crate::core::expander::{expand, materialize};

pub fn run(global: &GlobalOpts) -> Result<()> {
    let (connector, config) = open_connector(global)?;
    let placeholder = config.system_placeholder()?;
    let expanded_dir = connector.expanded_dir(&config.expanded_dir());

    let expansion = expand(connector.root(), &placeholder)?;
    let stats = materialize(&expansion, &expanded_dir)?;

    if !global.quiet {
        println!(
            "{} Expanded {} into {}",
            style("✓").green(),
            style(connector.root().display()).cyan(),
            style(expanded_dir.display()).cyan()
        );
        println!(
            "  {} system(s), {} pipe(s) across {} datatype(s)",
            stats.systems,
            stats.pipes,
            expansion.manifest.datatypes.len()
        );
        let parameters = expansion.parameters();
        println!(
            "  {} parameter(s): {}",
            parameters.len(),
            style(parameters.join(", ")).dim()
        );
        if stats.skipped > 0 {
            println!(
                "{} Skipped {} component(s) that are neither pipes nor systems",
                style("!").yellow(),
                stats.skipped
            );
        }
    }

    Ok(())
}
