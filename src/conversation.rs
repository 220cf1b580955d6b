//! Conversation model shared by the handlers and the completion provider
//!
//! A [`Conversation`] always opens with exactly one system instruction turn,
//! followed by whatever history the caller replayed, followed by the new
//! user message.

/// System instruction that opens every conversation
pub const SYSTEM_PROMPT: &str =
    "You are a helpful and concise AI assistant. Respond briefly and factually.";

/// Speaker of a conversational turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Map a caller-supplied role tag onto a [`Role`]
    ///
    /// Matching is case-insensitive. Unrecognized or missing tags map to
    /// [`Role::User`].
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.eq_ignore_ascii_case("user") => Role::User,
            Some(t) if t.eq_ignore_ascii_case("assistant") => Role::Assistant,
            Some(t) if t.eq_ignore_ascii_case("system") => Role::System,
            _ => Role::User,
        }
    }

    /// Wire name used by Ollama
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Ordered sequence of turns handed to a completion provider
///
/// Turns are only appended; the opening system turn cannot be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<ChatTurn>,
}

impl Conversation {
    /// Start a conversation with the given system instruction
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatTurn::new(Role::System, system_prompt)],
        }
    }

    /// Build `[system, history..., user:message]` using [`SYSTEM_PROMPT`]
    pub fn assemble<I>(history: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = ChatTurn>,
    {
        let mut conversation = Self::new(SYSTEM_PROMPT);
        conversation.extend(history);
        conversation.push_user(message);
        conversation
    }

    /// Append a turn
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Append a user turn
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatTurn::new(Role::User, content));
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Always false: the system turn is present from construction
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Last turn, which is the message being answered once assembled
    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }
}

impl Extend<ChatTurn> for Conversation {
    fn extend<T: IntoIterator<Item = ChatTurn>>(&mut self, iter: T) {
        self.turns.extend(iter);
    }
}
