pub mod openai;
pub mod types;

pub use types::{ChatMessage, ReviewVerdict, Role};

use async_trait::async_trait;
use thiserror::Error;

use crate::pr::ChangedFiles;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Model API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Model response has no review tool call")]
    MissingToolCall,

    #[error("Could not decode review arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("Model API key not found in config or environment")]
    MissingApiKey,
}

/// Language model that turns a conversation into a review verdict.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    async fn review(&self, conversation: &[ChatMessage]) -> Result<ReviewVerdict, ReviewError>;
}

/// System prompt, then the assignment, then one message per file.
pub fn build_conversation(
    system_prompt: &str,
    assignment: Option<&str>,
    files: &ChangedFiles,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(files.len() + 2);
    messages.push(ChatMessage::system(system_prompt));
    if let Some(assignment) = assignment.filter(|a| !a.trim().is_empty()) {
        messages.push(ChatMessage::user(format!("Assignment: {assignment}")));
    }
    messages.extend(
        files
            .iter()
            .map(|(path, content)| ChatMessage::user(format!("File: {path}\n{content}"))),
    );
    messages
}
