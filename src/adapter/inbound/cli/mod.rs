//! CLI module graph and command dispatch.

pub mod command;
pub mod config;
pub mod dashboard;
pub mod output;

use std::io::IsTerminal;

use self::command::{Cli, ColorChoice, Commands, ConfigCommand};
use crate::error::Result;

/// Apply the global flags and run the selected command.
pub async fn run(cli: Cli) -> Result<()> {
    let color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
        }
    };
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, color));

    match cli.command {
        Commands::Dashboard(args) => dashboard::execute(&args).await,
        Commands::Config(ConfigCommand::Show(args)) => config::execute_show(&args.config),
        Commands::Config(ConfigCommand::Validate(args)) => config::execute_validate(&args.config),
    }
}
