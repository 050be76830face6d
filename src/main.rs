use anyhow::Result;
use clap::{Parser, Subcommand};
use suisound::config::Config;
use suisound::SessionContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "suisound")]
#[command(version)]
#[command(about = "Chat with SuiSound agents from the terminal", long_about = None)]
struct Cli {
    /// Operator id sent with messages (defaults to the configured user)
    #[arg(long, global = true)]
    user: Option<String>,

    /// Agent backend base URL
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat with an agent
    Chat { agent: Option<String> },
    /// Send a single message and print the reply
    Send {
        text: String,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Show the stored conversation with an agent
    History { agent: Option<String> },
    /// List agents on the backend
    Agents {
        /// Only agents registered by the current user
        #[arg(long)]
        mine: bool,
    },
    /// Register a new agent
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Generate agent details from a description
    Generate { description: String },
    /// Forget the conversation room for an agent
    Reset { agent: Option<String> },
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "suisound=info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(url) = cli.backend {
        config.backend_url = url;
    }
    let user_id = cli.user.or_else(|| config.user_id.clone());

    let client = commands::build_client(&config)?;

    match cli.command.unwrap_or(Commands::Chat { agent: None }) {
        Commands::Chat { agent } => {
            let agent_id = commands::resolve_agent(&client, agent).await?;
            commands::chat(&client, SessionContext::new(user_id, Some(agent_id))).await
        }
        Commands::Send { text, agent } => {
            let agent_id = commands::resolve_agent(&client, agent).await?;
            commands::send_once(&client, SessionContext::new(user_id, Some(agent_id)), &text).await
        }
        Commands::History { agent } => {
            let agent_id = commands::resolve_agent(&client, agent).await?;
            commands::show_history(&client, &agent_id).await
        }
        Commands::Agents { mine } => {
            let owner = if mine { user_id.as_deref() } else { None };
            commands::list_agents(&client, owner).await
        }
        Commands::Register { name, description } => {
            let owner = user_id.as_deref().unwrap_or("default-user");
            commands::register(&client, name, description, owner).await
        }
        Commands::Generate { description } => commands::generate(&client, &description).await,
        Commands::Reset { agent } => {
            let agent_id = commands::resolve_agent(&client, agent).await?;
            commands::reset(&client, &agent_id)
        }
    }
}
