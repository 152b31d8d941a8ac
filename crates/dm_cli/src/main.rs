use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use dm_client::{
    params::{
        ChatTarget, CreateChat, GetMessages, GetPermissions, InviteToChat, Permit, React,
        SendMessage, Unfurl, UserTarget,
    },
    ChatsApi, ClientConfig,
};
use dm_crypto::{LocalKeyAuthority, SigningAuthority};
use dm_proto::{api::Page, rpc::ChatPermission};

#[derive(Parser)]
#[command(name = "dm")]
#[command(about = "End-to-end encrypted direct messages over a comms relay", long_about = None)]
struct Cli {
    /// Relay base URL (overrides DM_RELAY_URL)
    #[arg(long, global = true)]
    relay_url: Option<String>,

    /// Act on behalf of this user id (overrides DM_CURRENT_USER_ID)
    #[arg(long, global = true)]
    user_id: Option<String>,

    /// Hex secp256k1 private key (defaults to DM_PRIVATE_KEY)
    #[arg(long, global = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new private key
    Keygen,

    #[command(flatten)]
    Relay(ChatCommands),
}

/// Commands that need a private key and talk to the relay.
#[derive(Subcommand)]
enum ChatCommands {
    /// Print the public key and wallet address for the configured key
    Whoami,

    /// List conversations
    Chats {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one conversation
    Chat { chat_id: String },

    /// List messages in a conversation
    Messages {
        chat_id: String,
        #[command(flatten)]
        page: PageArgs,
    },

    /// Start a conversation
    Create {
        /// Users to invite
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Invite users into an existing conversation
    Invite {
        chat_id: String,
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Send a message
    Send {
        chat_id: String,
        message: String,
        /// Message being replied to
        #[arg(long)]
        reply_to: Option<String>,
    },

    /// React to a message
    React {
        chat_id: String,
        message_id: String,
        reaction: String,
    },

    /// Mark a conversation as read
    Read { chat_id: String },

    /// Leave and delete a conversation
    Delete { chat_id: String },

    Block { user: String },

    Unblock { user: String },

    /// Set who may message you: all, tippers, followees or none
    Permit { permission: ChatPermission },

    /// Number of conversations with unread messages
    Unread,

    /// Check whether you may message these users
    Permissions {
        #[arg(required = true)]
        users: Vec<String>,
    },

    /// Users who blocked you
    Blockers,

    /// Users you blocked
    Blockees,

    /// Print a signed websocket URL for live events
    ListenUrl,

    /// Fetch link previews
    Unfurl {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[derive(Args)]
struct PageArgs {
    #[arg(short, long)]
    limit: Option<u32>,
    #[arg(long)]
    before: Option<String>,
    #[arg(long)]
    after: Option<String>,
}

impl From<PageArgs> for Page {
    fn from(args: PageArgs) -> Self {
        Page { limit: args.limit, before: args.before, after: args.after }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn keygen() -> Result<()> {
    let authority = LocalKeyAuthority::generate();
    let public_key = authority.public_key();
    print_json(&serde_json::json!({
        "private_key": authority.secret_hex().as_str(),
        "public_key": public_key.to_b64(),
        "address": public_key.address(),
    }))
}

fn load_authority(flag: Option<String>) -> Result<LocalKeyAuthority> {
    let hex_key = flag
        .or_else(|| std::env::var("DM_PRIVATE_KEY").ok())
        .ok_or_else(|| anyhow!("no private key: pass --private-key or set DM_PRIVATE_KEY"))?;
    LocalKeyAuthority::from_hex(&hex_key).context("invalid private key")
}

fn build_config(relay_url: Option<String>, user_id: Option<String>) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = relay_url {
        config.relay_url = url;
    }
    if let Some(user_id) = user_id {
        config = config.with_current_user(user_id);
    }
    config
}

fn current_user(config: &ClientConfig) -> Result<String> {
    config
        .current_user_id
        .clone()
        .ok_or_else(|| anyhow!("this command needs --user-id or DM_CURRENT_USER_ID"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dm_cli=info,dm_client=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Key generation needs neither a key nor a relay.
    let command = match cli.command {
        Commands::Keygen => return keygen(),
        Commands::Relay(command) => command,
    };

    let authority = Arc::new(load_authority(cli.private_key)?);
    let config = build_config(cli.relay_url, cli.user_id);
    tracing::debug!(target: "dm_cli", relay_url = %config.relay_url, "using relay");
    let api = ChatsApi::over_http(config, authority)?;

    match command {
        ChatCommands::Whoami => {
            let public_key = api.public_key();
            print_json(&serde_json::json!({
                "user_id": api.config().current_user_id,
                "public_key": public_key.to_b64(),
                "address": public_key.address(),
            }))?;
        }

        ChatCommands::Chats { page } => print_json(&api.get_all(page.into()).await?)?,

        ChatCommands::Chat { chat_id } => print_json(&api.get(ChatTarget::new(chat_id)).await?)?,

        ChatCommands::Messages { chat_id, page } => {
            let resp = api
                .get_messages(GetMessages { chat_id, page: page.into() })
                .await?;
            print_json(&resp)?;
        }

        ChatCommands::Create { users } => {
            let resp = api
                .create(CreateChat { user_id: current_user(api.config())?, invited_user_ids: users })
                .await?;
            print_json(&resp)?;
        }

        ChatCommands::Invite { chat_id, users } => {
            let resp = api
                .invite(InviteToChat {
                    chat_id,
                    user_id: current_user(api.config())?,
                    invited_user_ids: users,
                })
                .await?;
            print_json(&resp)?;
        }

        ChatCommands::Send { chat_id, message, reply_to } => {
            let resp = api
                .message(SendMessage {
                    chat_id,
                    message,
                    message_id: None,
                    parent_message_id: reply_to,
                })
                .await?;
            print_json(&resp)?;
        }

        ChatCommands::React { chat_id, message_id, reaction } => {
            print_json(&api.react(React { chat_id, message_id, reaction }).await?)?
        }

        ChatCommands::Read { chat_id } => print_json(&api.read(ChatTarget::new(chat_id)).await?)?,

        ChatCommands::Delete { chat_id } => print_json(&api.delete(ChatTarget::new(chat_id)).await?)?,

        ChatCommands::Block { user } => print_json(&api.block(UserTarget::new(user)).await?)?,

        ChatCommands::Unblock { user } => print_json(&api.unblock(UserTarget::new(user)).await?)?,

        ChatCommands::Permit { permission } => {
            print_json(&api.permit(Permit { permit: permission }).await?)?
        }

        ChatCommands::Unread => print_json(&api.get_unread_count().await?)?,

        ChatCommands::Permissions { users } => {
            print_json(&api.get_permissions(GetPermissions { user_ids: users }).await?)?
        }

        ChatCommands::Blockers => print_json(&api.get_blockers().await?)?,

        ChatCommands::Blockees => print_json(&api.get_blockees().await?)?,

        ChatCommands::ListenUrl => println!("{}", api.listen_url().await?),

        ChatCommands::Unfurl { urls } => print_json(&api.unfurl(Unfurl { urls }).await?)?,
    }

    Ok(())
}
