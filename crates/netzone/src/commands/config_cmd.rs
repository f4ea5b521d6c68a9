//! Config subcommand handlers.

use netzone_config::{Config, ConfigError};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// `loaded` is the result of loading the configuration for this run. `init`
/// and `path` work even when it failed.
pub fn handle(
    args: ConfigArgs,
    global: &GlobalOpts,
    loaded: Result<Config, ConfigError>,
) -> Result<(), CliError> {
    let path = global
        .config
        .clone()
        .unwrap_or_else(netzone_config::config_path);

    match args.command {
        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                return Err(CliError::Conflict {
                    resource_type: "config file".into(),
                    identifier: path.display().to_string(),
                });
            }
            let written = netzone_config::save_config(&Config::default(), Some(&path))?;
            output::status(global, &format!("Wrote {}", written.display()));
            Ok(())
        }

        ConfigCommand::Show => {
            let config = loaded?;
            let out = output::render_single(
                &global.output,
                &config,
                |c| toml::to_string_pretty(c).unwrap_or_default(),
                |c| c.store.path.display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}
