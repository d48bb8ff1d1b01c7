use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use waifu_chat::{config, gateway, llm};

#[derive(Parser)]
#[command(name = "waifu-chat")]
#[command(about = "Chat gateway for an AI companion")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Auth token (required for non-loopback)
        #[arg(long, env = "WAIFU_TOKEN")]
        token: Option<String>,
    },

    /// Load and validate the configuration, then print the effective values
    CheckConfig,

    /// Show runtime status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind, token } => {
            let mut config = config::load()?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            if let Some(bind) = bind {
                config.gateway.bind = bind;
            }
            gateway::run(config, token).await
        }
        Commands::CheckConfig => {
            let config = config::load()?;
            println!("gateway: {}:{}", config.gateway.bind, config.gateway.port);
            println!("provider: {}", config.ai.provider);
            println!("personality: {}", config.ai.personality);
            println!(
                "context window: {} turns, ttl {}s",
                config.cache.max_window_turns, config.cache.context_ttl_secs
            );
            println!(
                "response cache: {} (ttl {}s)",
                if config.cache.response_cache_enabled {
                    "on"
                } else {
                    "off"
                },
                config.cache.response_ttl_secs
            );
            Ok(())
        }
        Commands::Status => {
            let config = config::load()?;
            println!("waifu-chat v{}", env!("CARGO_PKG_VERSION"));
            if config.ai.is_local() {
                let provider = llm::OllamaProvider::new(
                    config.ai.ollama_url.clone(),
                    config.ai.ollama_model.clone(),
                );
                let reachable = provider.is_available().await;
                println!(
                    "ollama at {}: {}",
                    config.ai.ollama_url,
                    if reachable { "reachable" } else { "unreachable" }
                );
            } else {
                println!(
                    "gemini api key: {}",
                    if config.ai.api_key.is_some() {
                        "set"
                    } else {
                        "missing"
                    }
                );
            }
            Ok(())
        }
    }
}
