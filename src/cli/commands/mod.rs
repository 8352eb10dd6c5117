//! CLI command implementations

pub mod add_type;
pub mod collapse;
pub mod completions;
pub mod expand;
pub mod init;

use miette::Result;

use crate::cli::GlobalOpts;
use crate::core::{Config, Connector};

/// Open the connector directory and resolve configuration for it
pub(crate) fn open_connector(global: &GlobalOpts) -> Result<(Connector, Config)> {
    let connector = Connector::open(&global.connector_dir)?;
    let config = Config::load(&connector)
        .with_overrides(global.system_placeholder.clone(), global.expanded_dir.clone());
    Ok((connector, config))
}
