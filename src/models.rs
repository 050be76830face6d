use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Action tag that marks a fragment as provisional.
pub const CONTINUE_ACTION: &str = "CONTINUE";

/// A single chat line as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub text: String,
    pub is_user: bool,
    pub timestamp: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            timestamp: iso_now(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            timestamp: iso_now(),
        }
    }
}

/// One element of a streamed response batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

impl Fragment {
    pub fn is_provisional(&self) -> bool {
        self.action.as_deref() == Some(CONTINUE_ACTION)
    }

    /// Text of the fragment when it is present and non-empty.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Pick the authoritative fragment of a batch: the first one not tagged
/// `CONTINUE`, otherwise the last one.
pub fn resolve_final(batch: &[Fragment]) -> Option<&Fragment> {
    batch
        .iter()
        .find(|fragment| !fragment.is_provisional())
        .or_else(|| batch.last())
}

/// Where an outbound message originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageSource {
    Direct,
}

/// Body of `POST /{agentId}/message`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest<'a> {
    pub text: &'a str,
    pub room_id: &'a str,
    pub user_id: &'a str,
    pub source: MessageSource,
    pub stream: bool,
}

/// Response of `GET /agents/{agentId}/{roomId}/memories`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoriesResponse {
    #[serde(default)]
    pub memories: Vec<MemoryRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    #[serde(default)]
    pub content: MemoryContent,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<CreatedAt>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryContent {
    #[serde(default)]
    pub text: String,
}

/// Backends report `createdAt` either as epoch milliseconds or as a date string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    Millis(i64),
    Text(String),
}

impl CreatedAt {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            CreatedAt::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            CreatedAt::Text(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| raw.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)),
        }
    }
}

impl From<MemoryRecord> for ChatMessage {
    fn from(record: MemoryRecord) -> Self {
        let timestamp = record
            .created_at
            .as_ref()
            .and_then(CreatedAt::to_datetime)
            .unwrap_or_else(Utc::now);

        ChatMessage {
            text: record.content.text,
            is_user: record.user_id != record.agent_id,
            timestamp: iso_string(timestamp),
        }
    }
}

/// Agent as listed by the backend. Fields beyond `id` and `name` are kept
/// verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentInfo {
    /// Owner recorded in `config.userId`, if any.
    pub fn owner(&self) -> Option<&str> {
        self.extra
            .get("config")
            .and_then(|config| config.get("userId"))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentList {
    #[serde(default)]
    pub agents: Vec<AgentInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStyle {
    #[serde(default)]
    pub all: Vec<String>,
    #[serde(default)]
    pub chat: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleContent {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageExample {
    pub user: String,
    pub content: ExampleContent,
}

/// Character definition sent when registering an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub bio: Vec<String>,
    #[serde(default)]
    pub lore: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clients: Option<Vec<String>>,
    #[serde(default)]
    pub message_examples: Vec<Vec<MessageExample>>,
    #[serde(default)]
    pub post_examples: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub style: AgentStyle,
}

impl AgentConfig {
    /// Fill the fields the backend requires but callers usually leave empty.
    pub fn with_defaults(mut self) -> Self {
        if self.username.is_none() {
            self.username = Some(self.name.clone());
        }
        if self.model_provider.is_none() {
            self.model_provider = Some("openai".to_string());
        }
        self.plugins.get_or_insert_with(Vec::new);
        self.clients.get_or_insert_with(Vec::new);
        if self.bio.is_empty() {
            self.bio = vec![self.description.clone().unwrap_or_default()];
        }
        if self.message_examples.is_empty() {
            self.message_examples = vec![vec![MessageExample {
                user: "user".to_string(),
                content: ExampleContent {
                    text: "Hello!".to_string(),
                },
            }]];
        }
        self
    }

    /// Default character used when the backend has no agents yet.
    pub fn default_assistant() -> Self {
        AgentConfig {
            name: "SuiSound Assistant".to_string(),
            description: Some(
                "A helpful AI assistant for music production and promotion.".to_string(),
            ),
            bio: vec!["Your AI companion for music creation and promotion".to_string()],
            system: Some(
                "You are a helpful AI assistant for music production and promotion.".to_string(),
            ),
            ..Default::default()
        }
    }

    /// Character template used by `generate_agent_details`.
    pub fn generation_template(description: &str) -> Self {
        AgentConfig {
            name: "SuiSound".to_string(),
            description: Some(description.to_string()),
            model_provider: Some("openai".to_string()),
            system: Some(
                "You are a helpful AI assistant for music production and promotion.".to_string(),
            ),
            ..Default::default()
        }
    }
}

pub fn iso_string(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso_now() -> String {
    iso_string(Utc::now())
}
