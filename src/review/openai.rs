use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::{ChatMessage, ReviewError, ReviewModel, ReviewVerdict};
use crate::config::ModelConfig;

const REVIEW_TOOL: &str = "ReviewCodeTool";

/// Chat-completions client that forces a single structured review tool call.
pub struct OpenAiReviewer {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl OpenAiReviewer {
    pub fn new(config: &ModelConfig) -> Result<Self, ReviewError> {
        let api_key = config.api_key.clone().ok_or(ReviewError::MissingApiKey)?;
        Ok(Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", config.api_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    fn request_body(&self, conversation: &[ChatMessage]) -> Value {
        json!({
            "model": self.model,
            "messages": conversation,
            "tools": [review_tool()],
            "tool_choice": { "type": "function", "function": { "name": REVIEW_TOOL } },
        })
    }
}

/// Function-tool definition describing the verdict schema.
fn review_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": REVIEW_TOOL,
            "description": "Review of a student's submission.",
            "parameters": {
                "type": "object",
                "properties": {
                    "comment": { "type": "string", "description": "Comment to student code" },
                    "suggestions": { "type": "string", "description": "Suggestions for improving the code" },
                    "rating": { "type": "number", "description": "Rating for the code on a scale from 1 to 5" },
                },
                "required": ["comment", "suggestions", "rating"],
            },
        },
    })
}

/// Pull the review verdict out of a chat-completions response body.
fn parse_verdict(response: CompletionResponse) -> Result<ReviewVerdict, ReviewError> {
    let call = response
        .choices
        .into_iter()
        .flat_map(|choice| choice.message.tool_calls)
        .find(|call| call.function.name == REVIEW_TOOL)
        .ok_or(ReviewError::MissingToolCall)?;
    serde_json::from_str(&call.function.arguments).map_err(|e| {
        warn!(error = %e, "review arguments are not valid JSON");
        debug!(raw = %call.function.arguments, "raw tool arguments");
        ReviewError::InvalidArguments(e)
    })
}

#[async_trait]
impl ReviewModel for OpenAiReviewer {
    #[instrument(skip(self, conversation), fields(model = %self.model, messages = conversation.len()))]
    async fn review(&self, conversation: &[ChatMessage]) -> Result<ReviewVerdict, ReviewError> {
        debug!("requesting review from model");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(conversation))
            .send()
            .await?
            .error_for_status()?
            .json::<CompletionResponse>()
            .await?;
        let verdict = parse_verdict(response)?;
        debug!(rating = verdict.rating, "received review verdict");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: Value) -> CompletionResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_parse_verdict_from_tool_call() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "ReviewCodeTool",
                            "arguments": "{\"comment\":\"Good\",\"suggestions\":\"Add tests\",\"rating\":4}"
                        }
                    }]
                }
            }]
        });
        let verdict = parse_verdict(response(body)).unwrap();
        assert_eq!(verdict.comment, "Good");
        assert_eq!(verdict.suggestions, "Add tests");
        assert_eq!(verdict.rating, 4.0);
    }

    #[test]
    fn test_parse_verdict_without_tool_call() {
        let body = json!({ "choices": [{ "message": { "content": "plain text" } }] });
        assert!(matches!(
            parse_verdict(response(body)),
            Err(ReviewError::MissingToolCall)
        ));
        assert!(matches!(
            parse_verdict(response(json!({}))),
            Err(ReviewError::MissingToolCall)
        ));
    }

    #[test]
    fn test_parse_verdict_bad_arguments() {
        let body = json!({
            "choices": [{ "message": { "tool_calls": [{
                "function": { "name": "ReviewCodeTool", "arguments": "{not json" }
            }]}}]
        });
        assert!(matches!(
            parse_verdict(response(body)),
            Err(ReviewError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_request_body_forces_review_tool() {
        let reviewer = OpenAiReviewer::new(&ModelConfig {
            api_key: Some("sk-test".to_string()),
            ..ModelConfig::default()
        })
        .unwrap();
        assert_eq!(reviewer.endpoint, "https://api.openai.com/v1/chat/completions");

        let body = reviewer.request_body(&[ChatMessage::system("Be kind")]);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["tools"][0]["function"]["name"], REVIEW_TOOL);
        assert_eq!(body["tool_choice"]["function"]["name"], REVIEW_TOOL);
    }

    #[test]
    fn test_new_requires_api_key() {
        assert!(matches!(
            OpenAiReviewer::new(&ModelConfig::default()),
            Err(ReviewError::MissingApiKey)
        ));
    }
}
