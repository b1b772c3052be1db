use anyhow::Result;
use clap::{Parser, Subcommand};

mod app;
mod client;
mod config;
mod conversation;
mod events;
mod exchange;
mod logging;
mod relay;
mod tui;
mod ui;

use config::Config;

#[derive(Parser)]
#[command(name = "madai")]
#[command(version)]
#[command(about = "Chat with the MadAI assistant from your terminal", long_about = None)]
struct Cli {
    /// Chat endpoint to post messages to (overrides config and MADAI_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Send one message and print the reply
    Send {
        /// Message text
        message: String,
    },
    /// Run the relay endpoint that forwards messages to the upstream model
    Serve {
        /// Port to listen on (keeps the configured host)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the config file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

fn with_port(bind: &str, port: u16) -> String {
    let host = bind.rsplit_once(':').map(|(host, _)| host).unwrap_or(bind);
    format!("{}:{}", host, port)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            logging::init_file(&Config::log_path()?)?;
            app::run_chat(&config).await?;
        }
        Commands::Send { message } => {
            logging::init_stderr();
            if !app::send_once(&config, &message).await? {
                std::process::exit(1);
            }
        }
        Commands::Serve { port } => {
            logging::init_stderr();
            if let Some(port) = port {
                config.relay.bind = with_port(&config.relay.bind, port);
            }
            relay::serve(&config.relay).await?;
        }
        Commands::Config { init } => {
            let path = Config::config_path()?;
            if init && !path.exists() {
                let written = Config::default().save()?;
                println!("Wrote default configuration to {}", written.display());
            }
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&config.redacted())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_port() {
        assert_eq!(with_port("127.0.0.1:8787", 9000), "127.0.0.1:9000");
        assert_eq!(with_port("0.0.0.0:1", 80), "0.0.0.0:80");
        assert_eq!(with_port("localhost", 80), "localhost:80");
    }

    #[test]
    fn test_cli_parses() {
        let cli =
            Cli::try_parse_from(["madai", "send", "hello", "--endpoint", "http://x"]).unwrap();
        assert_eq!(cli.endpoint.as_deref(), Some("http://x"));
        assert!(matches!(cli.command, Some(Commands::Send { ref message }) if message == "hello"));

        let cli = Cli::try_parse_from(["madai"]).unwrap();
        assert!(cli.command.is_none());
    }
}
