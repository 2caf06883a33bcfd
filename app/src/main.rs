#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    AskInput, AskStrategy, CommandStrategy, InfoStrategy, InitStrategy, ServeInput, ServeStrategy,
    VersionStrategy,
};

#[derive(Parser)]
#[command(name = "gemchat")]
#[command(about = "Web chat front-end for the Gemini API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web chat server
    Serve {
        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Model to use (overrides config)
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Send a single message and print the answer
    Ask {
        /// Message to send
        #[arg(short = 'm', long)]
        message: String,

        /// Model to use (overrides config)
        #[arg(short = 'M', long)]
        model: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show configuration
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) => debug!("No .env file loaded: {e}"),
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, model } => {
            ServeStrategy.execute(ServeInput { bind, model }).await
        }
        Commands::Ask { message, model } => AskStrategy.execute(AskInput { message, model }).await,
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
