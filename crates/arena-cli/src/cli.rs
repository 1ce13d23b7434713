use clap::{Parser, Subcommand};

/// Arena: presence, inbox, quiz rooms and direct messages from a terminal.
#[derive(Parser, Debug)]
#[command(name = "arena", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Bearer token issued by the auth provider.
    #[arg(long, env = "ARENA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Id of the signed-in user.
    #[arg(long, env = "ARENA_USER_ID")]
    pub user_id: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stay signed in: heartbeat, inbox toasts and presence changes.
    Watch,
    /// Create a room, print its code and start on Enter.
    Host,
    /// Join a room by code and wait for the host to start.
    Join {
        /// Room code, case-insensitive.
        code: String,
    },
    /// Print the community with online flags.
    Community,
    /// Open a conversation; each stdin line is sent.
    Chat {
        friend_id: String,
    },
}

pub fn parse() -> Args {
    Args::parse()
}
