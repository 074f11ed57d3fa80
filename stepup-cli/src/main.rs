//! Step-up CLI - two-factor verification and trusted-device tool.

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_codes;
mod utils;

const AFTER_HELP: &str = "\
Environment:
  STEPUP_API_URL        Backend base URL (required)
  STEPUP_PRIMARY_TOKEN  Primary identity token (required)
  STEPUP_TRUST_FILE     Trust grant location (default: ~/.config/stepup/trusted_device.json)

Exit codes:
  0   success
  65  verification rejected
  69  backend unreachable
  74  local storage error
  77  primary credential not accepted
  78  configuration error";

#[derive(Parser)]
#[command(name = "stepup")]
#[command(author, version, about = "Two-factor step-up verification client", long_about = None)]
#[command(after_help = AFTER_HELP)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive step-up challenge for an identity
    Verify {
        /// Identity to challenge
        #[arg(long, value_name = "USER_ID")]
        user_id: String,

        /// Ask the backend to remember this device
        #[arg(long)]
        remember: bool,
    },

    /// List and revoke trusted-device grants
    Devices {
        #[command(subcommand)]
        command: DeviceCommands,
    },

    /// Clear the locally persisted trust grant
    Logout,
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// List this identity's trusted devices
    List,

    /// Revoke one trusted-device grant
    Revoke {
        #[arg(value_name = "DEVICE_ID")]
        device_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Verify { user_id, remember } => commands::verify::execute(user_id, remember).await,
        Commands::Devices { command } => match command {
            DeviceCommands::List => commands::devices::list().await,
            DeviceCommands::Revoke { device_id } => commands::devices::revoke(device_id).await,
        },
        Commands::Logout => commands::logout::execute(),
    };

    if let Err(err) = result {
        let exit = exit_codes::ExitCode::from_anyhow(&err);
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(exit.code);
    }
}
