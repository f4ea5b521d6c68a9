//! Command dispatch: routes parsed CLI commands to handlers.

pub mod config_cmd;
pub mod mappings;
pub mod policy;
pub mod serve;
pub mod util;

use netzone_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command that needs a loaded configuration.
pub async fn dispatch(cmd: Command, config: Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Serve(args) => serve::handle(args, config).await,
        Command::Mappings(args) => mappings::handle(args, &config, global).await,
        Command::Policy(args) => policy::handle(args, &config, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before loading the configuration".into(),
        )),
    }
}
