use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{parse_instant, TransportError};

/// One prior turn in the shape the agent protocol expects. Agent turns
/// travel as `assistant`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
    history: &'a [HistoryEntry],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    text: String,
    #[serde(default)]
    data: Option<ReplyData>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplyData {
    Slots {
        #[serde(default)]
        slots: Vec<SlotEntry>,
    },
    Confirmation,
    // The backend also tags replies we don't render specially; treat any
    // unknown tag as plain text.
    #[serde(other)]
    Unknown,
}

/// The two shapes slot entries arrive in: a bare timestamp, or an object
/// exposing a start field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SlotEntry {
    Plain(RawInstant),
    Object { start: RawInstant },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Millis(i64),
    Text(String),
}

impl SlotEntry {
    fn resolve(self) -> Option<DateTime<Utc>> {
        let raw = match self {
            SlotEntry::Plain(raw) => raw,
            SlotEntry::Object { start } => start,
        };
        match raw {
            RawInstant::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
            RawInstant::Text(s) => parse_instant(&s),
        }
    }
}

/// A decoded agent reply, already normalized: slot entries are a flat list
/// of instants regardless of how the wire spelled them.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub text: String,
    pub kind: ReplyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplyKind {
    Plain,
    Slots(Vec<DateTime<Utc>>),
    Confirmation,
}

#[derive(Clone)]
pub struct DialogueClient {
    client: Client,
    base_url: String,
}

impl DialogueClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Send one conversational turn and decode the structured reply.
    pub async fn send(
        &self,
        session_id: &str,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<AgentReply, TransportError> {
        let request = ChatRequest {
            session_id,
            message,
            history,
        };

        let response = self
            .client
            .post(format!("{}/chat", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status { status, body });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        Ok(decode_reply(parsed))
    }
}

fn decode_reply(response: ChatResponse) -> AgentReply {
    let kind = match response.data {
        Some(ReplyData::Slots { slots }) => {
            let total = slots.len();
            let resolved: Vec<DateTime<Utc>> =
                slots.into_iter().filter_map(SlotEntry::resolve).collect();
            if resolved.len() < total {
                log::warn!("Dropped {} unparseable slot entries", total - resolved.len());
            }
            ReplyKind::Slots(resolved)
        }
        Some(ReplyData::Confirmation) => ReplyKind::Confirmation,
        Some(ReplyData::Unknown) | None => ReplyKind::Plain,
    };

    AgentReply {
        text: response.text,
        kind,
    }
}
