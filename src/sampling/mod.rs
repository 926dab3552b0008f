//! Host sampling capability: request/response shapes for `sampling/createMessage`
//! and the [`Sampler`] seam the step executor calls through.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One content block, tagged by `type`. Kinds this crate never inspects still
/// deserialize so that a response mixing them with text stays usable.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        #[serde(rename = "toolUseId")]
        tool_use_id: String,
        #[serde(default)]
        content: Value,
    },
    #[serde(other)]
    Unknown,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// Hosts may answer with a single block or an ordered list of blocks.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items.as_slice(),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(item) => vec![item],
            Self::Many(items) => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SamplingMessage {
    pub role: Role,
    pub content: ContentBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelHint {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelPreferences {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<ModelHint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_priority: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub messages: Vec<SamplingMessage>,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_preferences: Option<ModelPreferences>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageResult {
    pub role: Role,
    pub content: OneOrMany<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl CreateMessageResult {
    pub fn content_blocks(&self) -> &[ContentBlock] {
        self.content.as_slice()
    }
}

/// Capability that turns a sampling request into a model response. The
/// implementation owns transport concerns such as timeouts; callers issue one
/// request per call and never retry through this trait.
pub trait Sampler: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn create_message(
        &self,
        request: &CreateMessageRequest,
    ) -> Result<CreateMessageResult, Self::Error>;
}

impl<S: Sampler + ?Sized> Sampler for std::sync::Arc<S> {
    type Error = S::Error;

    fn create_message(
        &self,
        request: &CreateMessageRequest,
    ) -> Result<CreateMessageResult, Self::Error> {
        (**self).create_message(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_and_list_content_normalize_to_slices() {
        let single: CreateMessageResult = serde_json::from_value(json!({
            "role": "assistant",
            "model": "test",
            "content": { "type": "text", "text": "hello" }
        }))
        .expect("single");
        let many: CreateMessageResult = serde_json::from_value(json!({
            "role": "assistant",
            "model": "test",
            "content": [
                { "type": "image", "data": "AA==", "mimeType": "image/png" },
                { "type": "text", "text": "hello" }
            ]
        }))
        .expect("many");

        assert_eq!(single.content_blocks().len(), 1);
        assert_eq!(single.content_blocks()[0].as_text(), Some("hello"));
        assert_eq!(many.content_blocks().len(), 2);
        assert_eq!(many.content_blocks()[0].as_text(), None);
    }

    #[test]
    fn unknown_block_kinds_deserialize_as_unknown() {
        let block: ContentBlock =
            serde_json::from_value(json!({ "type": "resource_link", "uri": "file:///x" }))
                .expect("unknown kind");
        assert_eq!(block, ContentBlock::Unknown);
    }

    #[test]
    fn request_serializes_with_protocol_field_names() {
        let request = CreateMessageRequest {
            messages: vec![SamplingMessage {
                role: Role::User,
                content: ContentBlock::text("prompt"),
            }],
            max_tokens: 900,
            temperature: Some(0.2),
            system_prompt: Some("system".to_string()),
            model_preferences: Some(ModelPreferences {
                hints: vec![ModelHint {
                    name: "claude".to_string(),
                }],
                intelligence_priority: Some(0.9),
            }),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["maxTokens"], 900);
        assert_eq!(value["systemPrompt"], "system");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"]["type"], "text");
        assert_eq!(value["modelPreferences"]["intelligencePriority"], 0.9);
        assert_eq!(value["modelPreferences"]["hints"][0]["name"], "claude");
    }
}
