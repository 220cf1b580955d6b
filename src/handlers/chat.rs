//! Chat relay endpoints
//!
//! `POST /ollama/chat` replays caller-supplied history into a conversation,
//! appends the new message and forwards it to the completion provider.
//! `GET /ollama/generate` does the same for a single history-free prompt.

use crate::conversation::{ChatTurn, Conversation, Role};
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::handlers::extractor::RelayJson;
use crate::metrics::{Outcome, Route};
use crate::middleware::RequestId;
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize, de};
use std::fmt;
use std::time::Instant;

/// Body returned when the chat message is missing or blank
pub const EMPTY_MESSAGE: &str = "Message cannot be empty.";

/// Body returned when the generate prompt is missing or blank
pub const EMPTY_PROMPT: &str = "Prompt cannot be empty.";

/// Implement `Deserialize` for a request struct whose JSON keys match its
/// field names ignoring ASCII case
///
/// A repeated key keeps the last value and unknown keys are skipped, so
/// `{"message": ..}`, `{"Message": ..}` and `{"MESSAGE": ..}` all bind.
macro_rules! deserialize_ignoring_case {
    ($ty:ident, $expecting:literal, [$($field:ident),+ $(,)?]) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                struct FieldsVisitor;

                impl<'de> de::Visitor<'de> for FieldsVisitor {
                    type Value = $ty;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        f.write_str($expecting)
                    }

                    fn visit_map<A>(self, mut map: A) -> Result<$ty, A::Error>
                    where
                        A: de::MapAccess<'de>,
                    {
                        let mut value = $ty::default();
                        while let Some(key) = map.next_key::<String>()? {
                            $(
                                if key.eq_ignore_ascii_case(stringify!($field)) {
                                    value.$field = map.next_value()?;
                                    continue;
                                }
                            )+
                            map.next_value::<de::IgnoredAny>()?;
                        }
                        Ok(value)
                    }
                }

                deserializer.deserialize_map(FieldsVisitor)
            }
        }
    };
}

/// One prior turn as sent by the client
///
/// Both fields are optional on the wire: a missing role becomes a user turn
/// and a missing content becomes an empty string.
#[derive(Debug, Clone, Default)]
pub struct HistoryMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

deserialize_ignoring_case!(HistoryMessage, "a history message object", [role, content]);

impl From<HistoryMessage> for ChatTurn {
    fn from(message: HistoryMessage) -> Self {
        ChatTurn::new(
            Role::from_tag(message.role.as_deref()),
            message.content.unwrap_or_default(),
        )
    }
}

/// Chat request from client
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub history: Option<Vec<HistoryMessage>>,
}

deserialize_ignoring_case!(ChatRequest, "a chat request object", [message, history]);

impl ChatRequest {
    /// Validate the message and build the conversation to send upstream
    ///
    /// # Errors
    ///
    /// [`AppError::Validation`] if the message is missing, empty or whitespace-only.
    pub fn into_conversation(self) -> AppResult<Conversation> {
        let message = non_blank(self.message, EMPTY_MESSAGE)?;
        let history = self.history.unwrap_or_default();
        Ok(Conversation::assemble(
            history.into_iter().map(ChatTurn::from),
            message,
        ))
    }
}

/// Query parameters for `GET /ollama/generate`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateParams {
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Chat response to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

fn non_blank(value: Option<String>, message: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Validation(message.to_string())),
    }
}

/// POST /ollama/chat handler
pub async fn handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    RelayJson(request): RelayJson<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    tracing::debug!(
        request_id = %request_id,
        history_length = request.history.as_ref().map_or(0, Vec::len),
        "Received chat request"
    );

    let conversation = request
        .into_conversation()
        .inspect_err(|_| record(&state, request_id, Route::Chat, Outcome::ValidationError))?;

    relay(&state, request_id, Route::Chat, &conversation).await
}

/// GET /ollama/generate handler
pub async fn generate_handler(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<GenerateParams>,
) -> AppResult<Json<ChatResponse>> {
    let prompt = non_blank(params.prompt, EMPTY_PROMPT)
        .inspect_err(|_| record(&state, request_id, Route::Generate, Outcome::ValidationError))?;

    let conversation = Conversation::assemble(Vec::<ChatTurn>::new(), prompt);
    relay(&state, request_id, Route::Generate, &conversation).await
}

/// Make the single provider call for a request and map its result
async fn relay(
    state: &AppState,
    request_id: RequestId,
    route: Route,
    conversation: &Conversation,
) -> AppResult<Json<ChatResponse>> {
    let started = Instant::now();
    let result = state.provider().complete(conversation).await;
    let elapsed = started.elapsed().as_secs_f64();

    let outcome = if result.is_ok() {
        Outcome::Success
    } else {
        Outcome::ProviderError
    };
    if let Err(e) = state.metrics().record_provider_duration(outcome, elapsed) {
        tracing::error!(request_id = %request_id, error = %e, "Metrics recording failed (non-fatal)");
    }
    record(state, request_id, route, outcome);

    match result {
        Ok(reply) => {
            tracing::info!(
                request_id = %request_id,
                route = route.as_str(),
                turns = conversation.len(),
                reply_length = reply.len(),
                duration_seconds = elapsed,
                "Chat completed"
            );
            Ok(Json(ChatResponse { reply }))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                route = route.as_str(),
                model_id = %state.provider().model_id(),
                error = %e,
                "Error communicating with Ollama"
            );
            Err(AppError::Provider(e))
        }
    }
}

fn record(state: &AppState, request_id: RequestId, route: Route, outcome: Outcome) {
    if let Err(e) = state.metrics().record_request(route, outcome) {
        tracing::error!(request_id = %request_id, error = %e, "Metrics recording failed (non-fatal)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::conversation::SYSTEM_PROMPT;
    use crate::handlers::test_support::EchoProvider;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::sync::Arc;

    fn state_with(provider: Arc<EchoProvider>) -> AppState {
        AppState::new(Arc::new(Config::default()), provider).unwrap()
    }

    #[test]
    fn test_chat_request_deserializes_without_history() {
        let req: ChatRequest = serde_json::from_str(r#"{"message": "Hi"}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("Hi"));
        assert!(req.history.is_none());
    }

    #[test]
    fn test_chat_request_accepts_pascal_case_names() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"Message": "Hi", "History": [{"Role": "assistant", "Content": "Hello"}]}"#,
        )
        .unwrap();
        let history = req.history.as_ref().unwrap();
        assert_eq!(req.message.as_deref(), Some("Hi"));
        assert_eq!(history[0].role.as_deref(), Some("assistant"));
        assert_eq!(history[0].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_chat_request_field_names_ignore_case() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"MESSAGE": "Hi", "hIsToRy": [{"ROLE": "assistant", "content": "Hello"}]}"#,
        )
        .unwrap();
        let history = req.history.as_ref().unwrap();
        assert_eq!(req.message.as_deref(), Some("Hi"));
        assert_eq!(history[0].role.as_deref(), Some("assistant"));
        assert_eq!(history[0].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_chat_request_repeated_key_keeps_last_value() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"message": "first", "Message": "second"}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("second"));
    }

    #[test]
    fn test_chat_request_ignores_unknown_fields() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": "Hi", "model": "llama3", "history": [{"content": "x", "name": "bob"}]}"#,
        )
        .unwrap();
        assert_eq!(req.message.as_deref(), Some("Hi"));
        assert_eq!(req.history.unwrap()[0].content.as_deref(), Some("x"));
    }

    #[test]
    fn test_chat_request_rejects_non_object() {
        assert!(serde_json::from_str::<ChatRequest>(r#"["Hi"]"#).is_err());
        assert!(serde_json::from_str::<ChatRequest>(r#"{"history": "nope"}"#).is_err());
    }

    #[test]
    fn test_chat_request_accepts_null_fields() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"message": null, "history": [{"role": null, "content": null}]}"#,
        )
        .unwrap();
        assert!(req.message.is_none());
        assert_eq!(req.history.unwrap().len(), 1);
    }

    #[test]
    fn test_into_conversation_rejects_blank_messages() {
        for message in [None, Some(""), Some("   "), Some("\n\t")] {
            let req = ChatRequest {
                message: message.map(str::to_string),
                history: None,
            };
            let err = req.into_conversation().unwrap_err();
            assert!(matches!(err, AppError::Validation(ref m) if m == EMPTY_MESSAGE));
        }
    }

    #[test]
    fn test_history_message_null_fields_become_user_and_empty() {
        let turn = ChatTurn::from(HistoryMessage::default());
        assert_eq!(turn, ChatTurn::new(Role::User, ""));
    }

    #[test]
    fn test_into_conversation_maps_roles() {
        let req = ChatRequest {
            message: Some("How are you?".to_string()),
            history: Some(vec![
                HistoryMessage {
                    role: Some("USER".to_string()),
                    content: Some("Hi".to_string()),
                },
                HistoryMessage {
                    role: Some("Assistant".to_string()),
                    content: Some("Hello!".to_string()),
                },
                HistoryMessage {
                    role: Some("narrator".to_string()),
                    content: Some("...".to_string()),
                },
            ]),
        };
        let conversation = req.into_conversation().unwrap();
        let roles: Vec<Role> = conversation.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::User]
        );
    }

    #[tokio::test]
    async fn test_handler_returns_reply() {
        let provider = Arc::new(EchoProvider::replying("Hello!"));
        let state = state_with(provider.clone());

        let Json(response) = handler(
            State(state.clone()),
            Extension(RequestId::new()),
            RelayJson(ChatRequest {
                message: Some("Hi".to_string()),
                history: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.reply, "Hello!");
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].turns()[0].content, SYSTEM_PROMPT);
        assert_eq!(seen[0].len(), 2);
        assert_eq!(
            state.metrics().request_count(Route::Chat, Outcome::Success),
            1
        );
    }

    #[tokio::test]
    async fn test_handler_blank_message_skips_provider() {
        let provider = Arc::new(EchoProvider::replying("unused"));
        let state = state_with(provider.clone());

        let err = handler(
            State(state.clone()),
            Extension(RequestId::new()),
            RelayJson(ChatRequest {
                message: Some("  ".to_string()),
                history: None,
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(provider.seen.lock().unwrap().is_empty());
        assert_eq!(
            state
                .metrics()
                .request_count(Route::Chat, Outcome::ValidationError),
            1
        );
    }

    #[tokio::test]
    async fn test_handler_provider_failure_is_server_error() {
        let provider = Arc::new(EchoProvider::failing("connection refused"));
        let state = state_with(provider);

        let err = handler(
            State(state.clone()),
            Extension(RequestId::new()),
            RelayJson(ChatRequest {
                message: Some("Hi".to_string()),
                history: None,
            }),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            state
                .metrics()
                .request_count(Route::Chat, Outcome::ProviderError),
            1
        );
    }

    #[tokio::test]
    async fn test_generate_handler_builds_two_turn_conversation() {
        let provider = Arc::new(EchoProvider::replying("42"));
        let state = state_with(provider.clone());

        let Json(response) = generate_handler(
            State(state),
            Extension(RequestId::new()),
            Query(GenerateParams {
                prompt: Some("What is the answer?".to_string()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.reply, "42");
        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen[0].len(), 2);
        assert_eq!(
            seen[0].last(),
            Some(&ChatTurn::new(Role::User, "What is the answer?"))
        );
    }

    #[tokio::test]
    async fn test_generate_handler_rejects_missing_prompt() {
        let provider = Arc::new(EchoProvider::replying("unused"));
        let state = state_with(provider.clone());

        let err = generate_handler(
            State(state),
            Extension(RequestId::new()),
            Query(GenerateParams { prompt: None }),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m == EMPTY_PROMPT));
        assert!(provider.seen.lock().unwrap().is_empty());
    }
}
