//! `connector collapse` command - Rebuild templates from a concrete tree

use console::style;
use miette::Result;

use crate::cli::commands::open_connector;
use crate::cli::GlobalOpts;
use crate::core::collapser::collapse;

pub fn run(global: &GlobalOpts) -> Result<()> {
    let (connector, config) = open_connector(global)?;
    let placeholder = config.system_placeholder()?;

    let report = collapse(connector.root(), &placeholder)?;

    if !global.quiet {
        println!(
            "{} Collapsed {} into {}",
            style("✓").green(),
            style(connector.root().display()).cyan(),
            style(connector.templates_dir().display()).cyan()
        );
        for (group, count) in &report.groups {
            println!("  {} {} ({} component(s))", style("→").blue(), group, count);
        }
        if !report.skipped_shims.is_empty() {
            println!(
                "  {} shim pipe(s) left out: {}",
                report.skipped_shims.len(),
                style(report.skipped_shims.join(", ")).dim()
            );
        }
        let parameters: Vec<&str> = report.parameters.iter().map(String::as_str).collect();
        println!(
            "  {} parameter(s): {}",
            parameters.len(),
            style(parameters.join(", ")).dim()
        );
        println!(
            "{} Wrote {}",
            style("✓").green(),
            style(report.manifest_path.display()).cyan()
        );
    }

    Ok(())
}
