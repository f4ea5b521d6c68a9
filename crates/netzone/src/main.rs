mod api;
mod cli;
mod commands;
mod error;
mod output;
mod state;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test_helpers;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use netzone_config::{Config, ConfigError, LoggingConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Loaded once; `config init` and `config path` must work even when the
    // current file does not parse.
    let loaded = netzone_config::load_config(cli.global.config.as_deref());
    let logging = loaded
        .as_ref()
        .map_or_else(|_| LoggingConfig::default(), |c| c.logging.clone());
    let serving = matches!(cli.command, Command::Serve(_));
    init_tracing(cli.global.verbose, serving, &logging);

    if let Err(err) = run(cli, loaded).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` flags, otherwise the configured level
/// for the server and `warn` for one-shot commands.
fn init_tracing(verbosity: u8, serving: bool, logging: &LoggingConfig) {
    let level = match verbosity {
        0 if serving => logging.level.as_str(),
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli, loaded: Result<Config, ConfigError>) -> Result<(), CliError> {
    match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global, loaded),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "netzone", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let config = loaded?;
            tracing::debug!(command = ?cmd, "dispatching command");
            commands::dispatch(cmd, config, &cli.global).await
        }
    }
}
