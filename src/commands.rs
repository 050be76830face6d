use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;
use suisound::config::Config;
use suisound::models::AgentConfig;
use suisound::storage::FileStore;
use suisound::{ChatMessage, Conversation, ElizaClient, SessionContext, SessionManager};
use tokio::io::{AsyncBufReadExt, BufReader};

pub fn build_client(config: &Config) -> Result<ElizaClient> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("Failed to open state in {}", config.data_dir.display()))?;
    let sessions = SessionManager::new(Arc::new(store));
    ElizaClient::new(config, sessions).context("Failed to create HTTP client")
}

/// Explicit agent, else the last one used, else whatever the backend offers.
pub async fn resolve_agent(client: &ElizaClient, explicit: Option<String>) -> Result<String> {
    if let Some(agent_id) = explicit {
        client.sessions().remember_agent(&agent_id)?;
        return Ok(agent_id);
    }
    if let Some(agent_id) = client.sessions().last_agent_id() {
        return Ok(agent_id);
    }
    let agent = client
        .ensure_agent()
        .await
        .context("No agent available on the backend")?;
    Ok(agent.id)
}

fn print_message(message: &ChatMessage) {
    let who = if message.is_user { "👤 You" } else { "🤖 Agent" };
    println!("{} [{}]: {}", who, message.timestamp, message.text);
}

pub async fn chat(client: &ElizaClient, ctx: SessionContext) -> Result<()> {
    let agent_id = ctx.agent_id.clone().context("Agent ID is required")?;

    if !client.sessions().has_seen_onboarding() {
        println!("👋 Welcome to SuiSound chat!");
        println!("Type a message and press Enter. /reset starts a new room, /quit exits.");
        println!();
        client.sessions().mark_onboarding_seen()?;
    }

    let mut conversation = Conversation::new();
    conversation.replace_history(client.load_history(&agent_id).await);
    if let Some(notice) = conversation.notice() {
        println!("⚠️ {}", notice);
    }
    for message in conversation.messages() {
        print_message(message);
    }

    println!("💬 Chatting with agent {}", agent_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                client.sessions().invalidate(&agent_id)?;
                conversation = Conversation::new();
                println!("🧹 Started a fresh conversation room.");
                continue;
            }
            _ => {}
        }

        let Some(user_message) = conversation.push_user(&line) else {
            continue;
        };
        let text = user_message.text.clone();
        conversation.begin_reply();

        let result = client
            .send_message(&ctx, &text, |partial| {
                conversation.apply_partial(partial);
                print!("\r🤖 {}", partial);
                let _ = io::stdout().flush();
            })
            .await;

        match result {
            Ok(replies) => {
                conversation.complete_reply(replies);
                if let Some(reply) = conversation.messages().last() {
                    println!("\r🤖 {}", reply.text);
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "send failed");
                conversation.fail_reply();
                if let Some(reply) = conversation.messages().last() {
                    println!("\r❌ {}", reply.text);
                }
            }
        }
    }

    Ok(())
}

pub async fn send_once(client: &ElizaClient, ctx: SessionContext, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        println!("Nothing to send.");
        return Ok(());
    }

    let replies = client
        .send_message(&ctx, text, |partial| tracing::debug!(partial, "partial reply"))
        .await
        .context("Failed to send message")?;

    match replies.first() {
        Some(reply) => println!("{}", reply.text),
        None => println!("No response"),
    }
    Ok(())
}

pub async fn show_history(client: &ElizaClient, agent_id: &str) -> Result<()> {
    let mut conversation = Conversation::new();
    conversation.replace_history(client.load_history(agent_id).await);

    if let Some(notice) = conversation.notice() {
        println!("⚠️ {}", notice);
    }
    if conversation.messages().is_empty() {
        println!("📭 No messages yet for agent {}", agent_id);
        return Ok(());
    }
    for message in conversation.messages() {
        print_message(message);
    }
    Ok(())
}

pub async fn list_agents(client: &ElizaClient, owner: Option<&str>) -> Result<()> {
    let agents = match owner {
        Some(user_id) => client.user_agents(user_id).await?,
        None => client.list_agents().await?,
    };

    if agents.is_empty() {
        println!("📭 No agents registered.");
        return Ok(());
    }

    let last = client.sessions().last_agent_id();
    println!("🤖 Agents:");
    println!("{}", "=".repeat(50));
    for agent in agents {
        let marker = if last.as_deref() == Some(agent.id.as_str()) { "*" } else { " " };
        println!(
            "{} {}  {}",
            marker,
            agent.id,
            agent.name.as_deref().unwrap_or("(unnamed)")
        );
    }
    Ok(())
}

pub async fn register(
    client: &ElizaClient,
    name: String,
    description: Option<String>,
    user_id: &str,
) -> Result<()> {
    let config = AgentConfig {
        name,
        description,
        ..Default::default()
    };
    let agent = client
        .register_agent(config, user_id)
        .await
        .context("Failed to register agent")?;

    println!("✅ Registered agent {}", agent.id);
    Ok(())
}

pub async fn generate(client: &ElizaClient, description: &str) -> Result<()> {
    let details = client
        .generate_agent_details(description)
        .await
        .context("Failed to generate agent details")?;
    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}

pub fn reset(client: &ElizaClient, agent_id: &str) -> Result<()> {
    client.sessions().invalidate(agent_id)?;
    println!("🧹 Cleared conversation room for agent {}", agent_id);
    Ok(())
}
