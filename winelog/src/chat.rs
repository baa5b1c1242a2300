//! # Chat assist
//!
//! A rolling conversation with a remote text-generation endpoint. Each
//! request carries a fixed system instruction and the most recent turns of
//! the transcript.
//!
//! [`ChatSession`] holds the transcript and the send state. It is split into
//! [`begin`](ChatSession::begin) and [`finish`](ChatSession::finish) so a UI
//! can show the pending state while the request is in flight;
//! [`ask`](ChatSession::ask) does both around one call.
//!
//! Remote failures never surface as errors from the session. They are
//! recorded in the transcript as a fallback reply.
//!
//! ```rust,no_run
//! use winelog::prelude::*;
//! # async fn example() -> Result<(), WinelogError> {
//! let config = ChatConfig::default();
//! let client = ChatClient::new(config.clone())?;
//! let mut session = ChatSession::new(config.history_turns);
//! let reply = session.ask(&client, "What pairs with a young Barolo?").await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::{
    Result,
    config::ChatConfig,
    error::{ChatBusySnafu, OtherSnafu, ValidationSnafu},
    http_client::HttpClient,
};

/// Instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str = "You are a friendly wine tasting assistant. \
Help the user describe what they taste and smell, suggest descriptors for \
appearance, nose, palate and structure, and give short food pairing ideas. \
Keep answers brief and practical.";

/// Reply recorded when the endpoint cannot be reached or returns nothing
pub const FALLBACK_REPLY: &str =
    "Sorry, I couldn't reach the assistant right now. Please try again in a moment.";

/// Speaker of a turn
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

/// One message in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// Whether a request is in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChatState {
    #[default]
    Idle,
    Sending,
}

/// What is sent to the endpoint: the system instruction and recent turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system_instruction: String,
    pub turns: Vec<ChatTurn>,
}

/// Transcript and send state
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    state: ChatState,
    transcript: Vec<ChatTurn>,
    history_turns: usize,
}

impl ChatSession {
    pub fn new(history_turns: usize) -> Self {
        Self {
            state: ChatState::Idle,
            transcript: Vec::new(),
            history_turns,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Records the user's message and builds the request.
    ///
    /// Refused while a request is in flight, or for blank input. Neither
    /// refusal changes the transcript.
    pub fn begin(&mut self, text: &str) -> Result<ChatRequest> {
        ensure!(self.state == ChatState::Idle, ChatBusySnafu);
        let text = text.trim();
        ensure!(
            !text.is_empty(),
            ValidationSnafu {
                message: "message is empty",
            }
        );
        self.transcript.push(ChatTurn::user(text));
        self.state = ChatState::Sending;

        let skip = self.transcript.len().saturating_sub(self.history_turns);
        Ok(ChatRequest {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            turns: self.transcript[skip..].to_vec(),
        })
    }

    /// Records the reply, or the fallback on failure, and returns to idle.
    pub fn finish(&mut self, result: Result<String>) -> &ChatTurn {
        let text = match result {
            Ok(text) => text,
            Err(err) => {
                warn!("chat request failed: {err}");
                FALLBACK_REPLY.to_string()
            }
        };
        self.state = ChatState::Idle;
        self.transcript.push(ChatTurn::model(text));
        let idx = self.transcript.len() - 1;
        &self.transcript[idx]
    }

    /// Sends `text` and returns the reply text. Errors only when the message
    /// is refused by [`begin`](Self::begin).
    pub async fn ask(&mut self, client: &ChatClient, text: &str) -> Result<String> {
        let request = self.begin(text)?;
        let result = client.generate(&request).await;
        Ok(self.finish(result).text.clone())
    }

    pub fn clear(&mut self) {
        self.transcript.clear();
        self.state = ChatState::Idle;
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<ChatRole>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

fn body_for<'a>(request: &'a ChatRequest, config: &ChatConfig) -> GenerateBody<'a> {
    GenerateBody {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: &request.system_instruction,
            }],
        },
        contents: request
            .turns
            .iter()
            .map(|turn| Content {
                role: Some(turn.role),
                parts: vec![Part { text: &turn.text }],
            })
            .collect(),
        generation_config: GenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        },
    }
}

/// Client for the text-generation endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: HttpClient,
    config: ChatConfig,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            config,
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Sends one generate request and returns the reply text.
    /// Non-success status, a malformed body or an empty reply are errors.
    pub async fn generate(&self, request: &ChatRequest) -> Result<String> {
        let body = body_for(request, &self.config);
        let query = self
            .config
            .api_key
            .iter()
            .map(|key| ("key".to_string(), key.clone()))
            .collect();
        let response: GenerateResponse = self.http.post_json(&self.config.url, &body, query).await?;
        let text = response.text();
        ensure!(
            !text.trim().is_empty(),
            OtherSnafu {
                message: "chat reply was empty",
            }
        );
        debug!(chars = text.len(), "chat reply");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WinelogError;
    use serde_json::json;

    #[test]
    fn begin_is_refused_while_sending() {
        let mut session = ChatSession::new(12);
        session.begin("hello").expect("first");
        assert_eq!(session.state(), ChatState::Sending);
        assert!(matches!(session.begin("again"), Err(WinelogError::ChatBusy)));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn blank_message_is_refused() {
        let mut session = ChatSession::new(12);
        assert!(matches!(
            session.begin("   "),
            Err(WinelogError::Validation { .. })
        ));
        assert!(session.transcript().is_empty());
        assert_eq!(session.state(), ChatState::Idle);
    }

    #[test]
    fn failure_appends_fallback() {
        let mut session = ChatSession::new(12);
        session.begin("hi").expect("begin");
        let turn = session.finish(Err(WinelogError::Other {
            message: "offline".into(),
        }));
        assert_eq!(turn.role, ChatRole::Model);
        assert_eq!(turn.text, FALLBACK_REPLY);
        assert_eq!(session.state(), ChatState::Idle);
    }

    #[test]
    fn request_keeps_recent_turns() {
        let mut session = ChatSession::new(3);
        for i in 0..3 {
            session.begin(&format!("q{i}")).expect("begin");
            session.finish(Ok(format!("a{i}")));
        }
        let request = session.begin("q3").expect("begin");
        let texts: Vec<_> = request.turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q2", "a2", "q3"]);
        assert_eq!(request.system_instruction, SYSTEM_INSTRUCTION);
    }

    #[test]
    fn body_shape() {
        let request = ChatRequest {
            system_instruction: "sys".into(),
            turns: vec![ChatTurn::user("q"), ChatTurn::model("a")],
        };
        let config = ChatConfig::default();
        let value = serde_json::to_value(body_for(&request, &config)).expect("json");
        assert_eq!(value["systemInstruction"], json!({"parts": [{"text": "sys"}]}));
        assert_eq!(
            value["contents"],
            json!([
                {"role": "user", "parts": [{"text": "q"}]},
                {"role": "model", "parts": [{"text": "a"}]}
            ])
        );
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 512);
    }

    #[test]
    fn response_text_joins_first_candidate_parts() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "Try "}, {"text": "duck."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .expect("decode");
        assert_eq!(response.text(), "Try duck.");

        let empty: GenerateResponse = serde_json::from_value(json!({})).expect("decode");
        assert_eq!(empty.text(), "");
    }
}
