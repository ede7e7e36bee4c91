use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use sqlgate_agent::{ChatMessage, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl From<MessageRole> for Role {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => Role::User,
            MessageRole::Assistant => Role::Assistant,
            MessageRole::System => Role::System,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessageBody {
    pub role: MessageRole,
    pub content: String,
}

impl From<ChatMessageBody> for ChatMessage {
    fn from(message: ChatMessageBody) -> Self {
        ChatMessage::new(message.role.into(), message.content)
    }
}

/// Body of `POST /api/chat`. Fields other than `messages` are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Conversation so far, oldest first. The last entry is classified.
    pub messages: Vec<ChatMessageBody>,
}

impl ChatRequest {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        self.messages.into_iter().map(ChatMessage::from).collect()
    }
}
