use clap::{Parser, Subcommand};
use lib::directline::DirectLineClient;
use lib::relay::{HuggingFaceRelay, InferenceRelay};

#[derive(Parser)]
#[command(name = "botline")]
#[command(about = "Direct Line bot conversation client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file. Secrets
    /// (DIRECT_LINE_SECRET, HUGGINGFACE_API_TOKEN, BotIdentifier, USER_TOKEN)
    /// stay in the environment and override config values.
    Init {
        /// Config file path (default: BOTLINE_CONFIG_PATH or ~/.botline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Send one message to the bot and print its reply.
    Ask {
        /// Message text to send.
        text: String,

        /// Expand the text through the hosted-model relay before sending.
        #[arg(long)]
        relay: bool,

        /// Config file path (default: BOTLINE_CONFIG_PATH or ~/.botline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Call the hosted-model relay directly and print the generated text.
    Relay {
        /// Prompt to send to the model.
        prompt: String,

        /// Config file path (default: BOTLINE_CONFIG_PATH or ~/.botline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Chat with the bot interactively, reusing one conversation.
    Chat {
        /// Config file path (default: BOTLINE_CONFIG_PATH or ~/.botline/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("botline {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Ask { text, relay, config }) => {
            if let Err(e) = run_ask(config, &text, relay).await {
                log::error!("ask failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Relay { prompt, config }) => {
            if let Err(e) = run_relay(config, &prompt).await {
                log::error!("relay failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat { config }) => {
            if let Err(e) = run_chat(config).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
        // No arguments: behavior is fully driven by environment configuration.
        None => {
            if let Err(e) = run_chat(None).await {
                log::error!("chat failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

/// Start a conversation and, when a user token is configured, forward it so
/// bots behind OAuth sign-in can answer.
async fn open_conversation(
    client: &DirectLineClient,
    config: &lib::config::Config,
) -> anyhow::Result<lib::directline::Conversation> {
    let conversation = client.start_conversation().await?;
    if let Some(user_token) = lib::config::resolve_user_token(config) {
        client.send_user_token(&conversation, &user_token).await?;
        log::info!("forwarded user token to conversation {}", conversation.id);
    }
    Ok(conversation)
}

async fn run_ask(
    config_path: Option<std::path::PathBuf>,
    text: &str,
    relay: bool,
) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let client = DirectLineClient::new(&config)?;

    let text = if relay {
        let relay_client = HuggingFaceRelay::new(&config)?;
        relay_client.generate(text).await?
    } else {
        text.to_string()
    };

    let mut conversation = open_conversation(&client, &config).await?;
    let reply =
        lib::exchange::send_and_await_reply(&client, &mut conversation, &text, &config.exchange)
            .await?;
    println!("{}", lib::exchange::reply_text(&reply).unwrap_or_default());
    Ok(())
}

async fn run_relay(config_path: Option<std::path::PathBuf>, prompt: &str) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let relay_client = HuggingFaceRelay::new(&config)?;
    let text = relay_client.generate(prompt).await?;
    println!("{}", text);
    Ok(())
}

async fn run_chat(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let (config, _path) = lib::config::load_config(config_path)?;
    let client = DirectLineClient::new(&config)?;
    let mut conversation = open_conversation(&client, &config).await?;
    println!("connected to conversation {} (empty line to exit)", conversation.id);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            break;
        }
        match lib::exchange::send_and_await_reply(
            &client,
            &mut conversation,
            text,
            &config.exchange,
        )
        .await
        {
            Ok(reply) => {
                println!("{}", lib::exchange::reply_text(&reply).unwrap_or_default());
            }
            Err(e) => {
                // A timed-out or failed turn aborts only that exchange.
                log::warn!("exchange failed: {}", e);
            }
        }
    }
    Ok(())
}
