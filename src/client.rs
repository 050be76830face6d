use crate::config::Config;
use crate::error::{ElizaError, Result};
use crate::ids::string_to_uuid;
use crate::models::{
    AgentConfig, AgentInfo, AgentList, ChatMessage, MemoriesResponse, MessageRequest,
    MessageSource,
};
use crate::session::{SessionContext, SessionManager};
use crate::streaming::{Batch, ResponseDecoder};
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for an Eliza agent backend.
#[derive(Clone)]
pub struct ElizaClient {
    http: reqwest::Client,
    base_url: String,
    sessions: SessionManager,
}

impl ElizaClient {
    pub fn new(config: &Config, sessions: SessionManager) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self::with_http(http, &config.backend_url, sessions))
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, sessions: SessionManager) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `text` to the context's agent and consume the streamed reply.
    ///
    /// `on_partial` receives the resolved text of every batch as it arrives.
    /// Resolves to the final agent message, or an empty vec when the backend
    /// produced nothing usable.
    pub async fn send_message<F>(
        &self,
        ctx: &SessionContext,
        text: &str,
        mut on_partial: F,
    ) -> Result<Vec<ChatMessage>>
    where
        F: FnMut(&str),
    {
        let agent_id = ctx.agent_id.as_deref().ok_or(ElizaError::MissingAgent)?;
        let room_id = self.sessions.get_or_create_room_id(agent_id)?;
        let user_id = ctx
            .user_id
            .clone()
            .unwrap_or_else(|| string_to_uuid(&format!("user-{}", Utc::now().timestamp_millis())));

        let url = format!("{}/{}/message", self.base_url, agent_id);
        let payload = MessageRequest {
            text,
            room_id: &room_id,
            user_id: &user_id,
            source: MessageSource::Direct,
            stream: true,
        };

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            warn!(agent_id, %status, "message endpoint rejected request");
            return Err(ElizaError::SendFailed(error_text));
        }

        let mut decoder = ResponseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ElizaError::SendFailed(e.to_string()))?;
            debug!(bytes = chunk.len(), "raw chunk received");

            report(&decoder.feed(&chunk), &mut on_partial);
            if decoder.is_complete() {
                break;
            }
        }
        report(&decoder.finish(), &mut on_partial);

        Ok(decoder
            .final_text()
            .map(|text| vec![ChatMessage::agent(text)])
            .unwrap_or_default())
    }

    /// Prior messages of the stored room for `agent_id`.
    ///
    /// Without a stored room this returns an empty history and makes no
    /// request. A 404 clears the stored room before failing.
    pub async fn load_history(&self, agent_id: &str) -> Result<Vec<ChatMessage>> {
        let Some(room_id) = self.sessions.room_id(agent_id) else {
            debug!(agent_id, "no room on record, history is empty");
            return Ok(Vec::new());
        };

        let url = format!("{}/agents/{}/{}/memories", self.base_url, agent_id, room_id);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(agent_id, %status, "history request failed");
            if status == StatusCode::NOT_FOUND {
                self.sessions.invalidate(agent_id)?;
            }
            return Err(ElizaError::HistoryUnavailable(error_text));
        }

        let body: MemoriesResponse = response
            .json()
            .await
            .map_err(|e| ElizaError::HistoryUnavailable(e.to_string()))?;

        Ok(body.memories.into_iter().map(ChatMessage::from).collect())
    }

    pub async fn list_agents(&self) -> Result<Vec<AgentInfo>> {
        let url = format!("{}/agents", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ElizaError::RequestFailed("Failed to get agents".to_string()));
        }

        let list: AgentList = response.json().await?;
        Ok(list.agents)
    }

    /// Agents registered by `user_id`.
    pub async fn user_agents(&self, user_id: &str) -> Result<Vec<AgentInfo>> {
        let agents = self.list_agents().await?;
        Ok(agents
            .into_iter()
            .filter(|agent| agent.owner() == Some(user_id))
            .collect())
    }

    /// Fetch one agent; an unknown id falls back to [`Self::ensure_agent`].
    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentInfo> {
        let url = format!("{}/agents/{}", self.base_url, agent_id);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => {
                info!(agent_id, "agent not found, ensuring one exists");
                self.ensure_agent().await
            }
            _ => Err(ElizaError::RequestFailed("Failed to get agent".to_string())),
        }
    }

    /// First available agent, registering a default one on an empty backend.
    pub async fn ensure_agent(&self) -> Result<AgentInfo> {
        let agents = self.list_agents().await?;

        if let Some(agent) = agents.into_iter().next() {
            debug!(agent_id = %agent.id, "using existing agent");
            self.sessions.remember_agent(&agent.id)?;
            return Ok(agent);
        }

        info!("no agents found, registering default agent");
        self.register_agent(AgentConfig::default_assistant(), "default-user")
            .await
    }

    /// Register a character for `user_id` and remember it as the last agent.
    pub async fn register_agent(&self, config: AgentConfig, user_id: &str) -> Result<AgentInfo> {
        let character = config.with_defaults();
        let url = format!("{}/agents/start", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "characterJson": character,
                "userId": user_id,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(user_id, "agent registration failed");
            return Err(ElizaError::RequestFailed(format!(
                "Failed to register agent: {error_text}"
            )));
        }

        let result: Value = response.json().await?;
        if result.get("id").and_then(Value::as_str).is_none() {
            return Err(ElizaError::RequestFailed(
                "No agent ID returned from registration".to_string(),
            ));
        }
        let agent: AgentInfo = serde_json::from_value(result)?;

        info!(agent_id = %agent.id, "registered agent");
        self.sessions.remember_agent(&agent.id)?;
        Ok(agent)
    }

    /// Ask the backend to flesh out a character from a free-form description.
    pub async fn generate_agent_details(&self, description: &str) -> Result<AgentInfo> {
        let url = format!("{}/agent/start", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "characterJson": AgentConfig::generation_template(description),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ElizaError::RequestFailed(
                "Failed to generate agent details".to_string(),
            ));
        }

        let result: Value = response.json().await?;
        let id = result
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| ElizaError::RequestFailed("No agent ID returned".to_string()))?
            .to_string();

        let mut details = match result.get("character") {
            Some(Value::Object(character)) => character.clone(),
            _ => serde_json::Map::new(),
        };
        details.insert("id".to_string(), Value::String(id));

        Ok(serde_json::from_value(Value::Object(details))?)
    }
}

fn report<F: FnMut(&str)>(batches: &[Batch], on_partial: &mut F) {
    for text in batches.iter().filter_map(Batch::final_text) {
        on_partial(text);
    }
}
