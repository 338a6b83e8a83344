//! Command-line parsing and command routing.

use crate::commands;
use crate::logging;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::process;

/// A terminal voice message recorder with live waveform, playback and scrubbing
#[derive(Parser)]
#[command(name = "vmemo")]
#[command(version)]
#[command(
    long_about = "A terminal voice message recorder with live waveform, playback and scrubbing.\n\nDEFAULT COMMAND:\n    If no command is specified, 'record' is used.\n\nKEYS:\n    r            start a new recording\n    s / Enter    stop recording\n    Space        play / pause\n    0-9, ←/→     seek\n    Enter        send\n    d            delete the recording\n    q / Esc      quit\n\nSIGNALS:\n    SIGUSR1      toggle recording (e.g. pkill -USR1 vmemo)"
)]
#[command(
    after_help = "CONFIGURATION:\n    Config file:        ~/.config/vmemo/vmemo.toml\n    Logs:               ~/.local/state/vmemo/vmemo.log.*"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Record, review and send a voice message (default)
    #[command(visible_alias = "r")]
    Record,

    /// Open the configuration file in your preferred editor
    ///
    /// Uses $EDITOR or falls back to nano/vi.
    #[command(visible_alias = "c")]
    Config,

    /// List available audio input and output devices
    #[command(name = "list-devices")]
    ListDevices,

    /// Show recent log entries
    Logs,

    /// Generate shell completion script
    ///
    /// Examples:
    ///   vmemo completions bash > vmemo.bash
    ///   vmemo completions zsh > _vmemo
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Runs the command selected on the command line.
///
/// `list-devices`, `logs` and `completions` run without logging so they never
/// touch the state directory.
///
/// # Errors
/// - If logging initialization fails
/// - If the selected command fails
pub async fn run() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            generate(shell, &mut Cli::command(), "vmemo", &mut io::stdout());
            Ok(())
        }
        Some(Commands::ListDevices) => exit_on_error(commands::handle_list_devices()),
        Some(Commands::Logs) => exit_on_error(commands::handle_logs()),
        Some(Commands::Config) => {
            logging::init_logging()?;
            commands::handle_config()
        }
        None | Some(Commands::Record) => {
            logging::init_logging()?;
            commands::handle_record().await
        }
    }
}

fn exit_on_error(result: anyhow::Result<()>) -> anyhow::Result<()> {
    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_record_is_default_and_aliased() {
        assert_eq!(Cli::try_parse_from(["vmemo"]).unwrap().command, None);
        assert_eq!(
            Cli::try_parse_from(["vmemo", "r"]).unwrap().command,
            Some(Commands::Record)
        );
        assert_eq!(
            Cli::try_parse_from(["vmemo", "list-devices"]).unwrap().command,
            Some(Commands::ListDevices)
        );
    }
}
