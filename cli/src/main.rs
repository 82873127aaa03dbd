//! ChainPretty CLI: turn EVM event logs into human-readable messages.
//!
//! # Commands
//! ```text
//! chainpretty load-events   <abi-path>...
//! chainpretty render-events --abi-paths <dir> --template-paths <dir> --rules <file> <input>
//! chainpretty serve         --abi-paths <dir> --template-paths <dir> --rules <file> [--bind <addr>]
//! ```
//!
//! `<input>` is a `.json` file (webhook payload or receipt), a transaction
//! hash, or a block number.

use anyhow::Result;
use chainpretty_observability::{init_tracing, LogConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd_load;
mod cmd_render;
mod cmd_serve;
mod pipeline;
mod rpc;
mod settings;

use settings::{RenderEnv, RenderSettings};

#[derive(Parser)]
#[command(
    name = "chainpretty",
    about = "Decode EVM event logs and render them with templates",
    long_about = "
ChainPretty CLI: decode EVM event logs, pick a template per event with
filter rules, and print the result or deliver it to a Discord webhook.

Every render option can also be given as a CHAINPRETTY_* environment
variable, e.g. CHAINPRETTY_ABI_PATHS or CHAINPRETTY_DISCORD_URL.
",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "CHAINPRETTY_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load ABIs and report how many event declarations were found
    #[command(name = "load-events")]
    LoadEvents {
        /// ABI files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Decode and render the events of a payload file, transaction or block
    #[command(name = "render-events")]
    RenderEvents {
        #[command(flatten)]
        settings: RenderSettings,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// `.json` file, transaction hash or block number
        input: String,
    },

    /// Receive webhook payloads over HTTP
    Serve {
        #[command(flatten)]
        settings: RenderSettings,

        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8000", env = "CHAINPRETTY_BIND")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut log = LogConfig::from_verbosity(cli.verbose);
    log.json = cli.log_json;
    init_tracing(&log);

    match cli.command {
        Commands::LoadEvents { paths } => {
            let count = cmd_load::run(&paths)?;
            println!("{count} events found");
            Ok(())
        }

        Commands::RenderEvents { settings, output, input } => {
            let env = RenderEnv::setup(&settings).await?;
            cmd_render::run(&env, &input, output.as_deref()).await
        }

        Commands::Serve { settings, bind } => {
            let env = RenderEnv::setup(&settings).await?;
            cmd_serve::run(env, &bind).await
        }
    }
}
