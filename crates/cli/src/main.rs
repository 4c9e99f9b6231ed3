//! fincrew CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config file
//! - `agents`: List the agent library, or show one agent
//! - `chat`: Talk to one agent (plain, RAG, or shadow-planned)
//! - `group`: Run a round-bounded group chat
//! - `lead`: Run a leader with a delegation team

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "fincrew",
    about = "fincrew — multi-agent LLM orchestration for financial analysis",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the configuration file
    Onboard,

    /// List available agents, or show one agent's persona
    Agents {
        /// Agent to show
        name: Option<String>,
    },

    /// Chat with a single agent
    Chat {
        /// Agent to talk to
        #[arg(short, long, default_value = "Market_Analyst")]
        agent: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Augment each message with passages from these documents
        #[arg(long, value_name = "DOCS", conflicts_with = "shadow")]
        rag: Option<PathBuf>,

        /// Have a planning agent draft a plan before each reply
        #[arg(long)]
        shadow: bool,

        /// Print the reply as it arrives
        #[arg(long)]
        stream: bool,
    },

    /// Run a group chat over several agents
    Group {
        /// Roster, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        agents: Vec<String>,

        /// Upper bound on rounds (defaults to the configured value)
        #[arg(long)]
        max_rounds: Option<u32>,

        /// The task
        #[arg(short, long)]
        message: String,
    },

    /// Run a leader that may delegate one sub-task to its team
    Lead {
        #[arg(long, default_value = "Financial_Analyst")]
        leader: String,

        /// Team members, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        team: Vec<String>,

        /// The task
        #[arg(short, long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Agents { name } => commands::agents::run(name).await?,
        Commands::Chat {
            agent,
            message,
            rag,
            shadow,
            stream,
        } => {
            let mode = match (rag, shadow) {
                (Some(docs), _) => commands::chat::Mode::Rag(docs),
                (None, true) => commands::chat::Mode::Shadow,
                (None, false) => commands::chat::Mode::Single,
            };
            commands::chat::run(agent, message, mode, stream).await?
        }
        Commands::Group {
            agents,
            max_rounds,
            message,
        } => commands::group::run(agents, max_rounds, message).await?,
        Commands::Lead { leader, team, message } => commands::lead::run(leader, team, message).await?,
    }

    Ok(())
}
