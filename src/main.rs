//! Rollcall - A Matrix bot running initiative calls for tabletop games.
//!
//! A moderator opens a roll call in a room, participants and NPCs are added to
//! it, dice rolls accumulate against it, and the call is closed to print every
//! roll ranked from highest to lowest.
//!
//! # Features
//!
//! - **One Call per Room**: Each room has at most one active call
//! - **Mentions**: Mentioned users are called, a room-wide mention calls every member
//! - **NPCs**: `+Name` tokens add non-player participants
//! - **Live Display**: The call message is edited as the roster and the rolls change
//! - **Dice**: `[N]d<M>[+K]` rolls, recorded in the active call
//! - **Persistence**: Calls and the Matrix session survive restarts
//! - **YAML Configuration**: Simple configuration file format with environment variable support
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings:
//!
//! ```yaml
//! matrix:
//!   user_id: "@rollcall:matrix.org"
//!   password: "your-password"
//!   passphrase: "your-recovery-passphrase"
//!
//! calls:
//!   prefix: "!"
//! ```
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `ROLLCALL_` prefix:
//!
//! ```bash
//! export ROLLCALL_MATRIX__USER_ID="@rollcall:matrix.org"
//! export ROLLCALL_MATRIX__PASSWORD="your-password"
//! export ROLLCALL_MATRIX__PASSPHRASE="your-passphrase"
//! export ROLLCALL_CALLS__CLEANUP_DELAY_MS=1000
//! ```
//!
//! # Usage
//!
//! ```bash
//! rollcall --config config.yaml --data ./data
//! ```
//!
//! The data directory holds the Matrix session, the SQLite store of the
//! Matrix SDK and `calls.json`.
//!
//! # Bot Commands
//!
//! - `!call <title> [text...] [+NPC...]` - Start a roll call (moderators)
//! - `!calladd [+NPC...]` - Add mentioned users and NPCs (moderators)
//! - `!callrefresh` - Post the call again (moderators)
//! - `!calldone` - End the call and print the results (moderators)
//! - `!calllog` - Print the roll history
//! - `!roll <dice> [+NPC]` - Roll dice
//! - `!callhelp` - Display help information
//!
//! # Architecture
//!
//! - [`bot`] - Wiring of Matrix messages, commands and message effects
//! - [`calls`] - Calls, the per-room active call store and its persistence
//! - [`commands`] - Command parsing and execution with validation
//! - [`config`] - YAML configuration loading with environment variable support
//! - [`dice`] - Dice notation parsing and rolling
//! - [`matrix`] - Matrix client integration and session management
//! - [`messaging`] - Messaging and authorization traits
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod calls;
mod commands;
mod config;
mod dice;
mod matrix;
mod messaging;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path of the YAML configuration file
    #[arg(short, long)]
    config: String,

    /// Directory holding the Matrix session and the calls
    #[arg(short, long)]
    data: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting rollcall {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&args.data).await {
        error!("Failed to create data directory {}: {}", args.data, e);
        return;
    }

    let bot = match Bot::new(config, args).await {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };
    bot.start().await;
}
