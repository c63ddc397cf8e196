use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;

mod cli;
mod config;
mod demo;
mod session;

use crate::config::ClientConfig;
use crate::demo::DemoOptions;

#[derive(Parser)]
#[command(name = "room")]
#[command(about = "Agent command channel and presence tracking for a tutoring room")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./room.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a loopback room with a scripted tutor agent
    Demo(DemoArgs),

    /// Print the wire frame for a command
    Encode(EncodeArgs),

    /// Decode a wire frame, or report why it would be dropped
    Decode(DecodeArgs),
}

#[derive(Parser)]
struct DemoArgs {
    /// Seconds before the agent joins
    #[arg(long, default_value = "3")]
    agent_joins_after: u64,

    /// Seconds to run before exiting
    #[arg(long, default_value = "20")]
    run_for: u64,

    /// Treat the agent as present regardless of the participant list
    #[arg(long)]
    simulate_agent: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Parser)]
struct EncodeArgs {
    action: String,

    /// Payload field as key=value (JSON values are parsed, anything else is a string)
    #[arg(short, long = "field")]
    fields: Vec<String>,
}

#[derive(Parser)]
struct DecodeArgs {
    frame: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo(args) => {
            init_tracing(args.debug);
            let mut config = ClientConfig::load(cli.config.as_deref())?;
            config.presence.simulate_agent |= args.simulate_agent;
            info!(
                identity = %config.identity,
                absence_timeout = ?config.presence.absence_timeout,
                simulate_agent = config.presence.simulate_agent,
                "starting room demo"
            );
            demo::run(
                config,
                DemoOptions {
                    agent_joins_after: Duration::from_secs(args.agent_joins_after),
                    run_for: Duration::from_secs(args.run_for),
                },
            )
            .await
        }
        Commands::Encode(args) => {
            println!("{}", cli::encode_frame(&args.action, &args.fields)?);
            Ok(())
        }
        Commands::Decode(args) => match cli::decode_frame(&args.frame) {
            Ok(payload) => {
                println!("{}", serde_json::to_string_pretty(&payload)?);
                Ok(())
            }
            Err(code) => bail!("frame would be dropped: {code}"),
        },
    }
}

fn init_tracing(debug: bool) {
    let default_directive = if debug {
        "room_client=debug,command_channel=debug,agent_presence=debug,room_transport=debug"
    } else {
        "room_client=info,command_channel=info,agent_presence=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}
