//! Backend-native content shapes and the backend client contract.
//!
//! Nothing outside the connector and the backend adapter touches these
//! types; the rest of the crate speaks [`ChatMessage`](crate::types::ChatMessage).

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Result;
use crate::tools::FunctionContract;

/// Role tag understood by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AuthorRole {
    System,
    User,
    Assistant,
}

/// One item of native message content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Text { text: String },
    Image { url: Option<String> },
    /// A native content kind the protocol does not model.
    Unknown { kind: String },
}

/// A native chat message: a role plus an ordered item collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatContent {
    pub role: AuthorRole,
    pub items: Vec<ContentItem>,
}

impl ChatContent {
    pub fn new(role: AuthorRole, items: Vec<ContentItem>) -> Self {
        Self { role, items }
    }

    pub fn text(role: AuthorRole, text: impl Into<String>) -> Self {
        Self {
            role,
            items: vec![ContentItem::Text { text: text.into() }],
        }
    }
}

/// A native streaming fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingChatContent {
    #[serde(default)]
    pub choice_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl StreamingChatContent {
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            choice_index: 0,
            content: Some(content.into()),
        }
    }
}

/// Function definition in the backend's native tool-schema format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON-schema object describing the parameters.
    pub parameters: serde_json::Value,
}

impl FunctionDefinition {
    /// Render a backend-independent contract as a native definition.
    pub fn from_contract(contract: &FunctionContract) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();
        for parameter in &contract.parameters {
            let mut property = serde_json::Map::new();
            property.insert("type".into(), serde_json::Value::String(parameter.param_type.clone()));
            if !parameter.description.is_empty() {
                property.insert(
                    "description".into(),
                    serde_json::Value::String(parameter.description.clone()),
                );
            }
            if let Some(default) = &parameter.default {
                property.insert("default".into(), default.clone());
            }
            properties.insert(parameter.name.clone(), serde_json::Value::Object(property));
            if parameter.required {
                required.push(serde_json::Value::String(parameter.name.clone()));
            }
        }
        Self {
            name: contract.name.clone(),
            description: contract.description.clone(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

/// A request sent to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub contents: Vec<ChatContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default)]
    pub functions: Vec<FunctionDefinition>,
}

/// Native fragment stream produced by a backend.
pub type NativeStream = BoxStream<'static, Result<StreamingChatContent>>;

/// External collaborator: the client for one generation backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// One-shot completion.
    async fn complete(&self, request: ChatRequest) -> Result<ChatContent>;

    /// Streaming completion.
    async fn stream(&self, request: ChatRequest) -> Result<NativeStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ContractParameter;

    #[test]
    fn contract_renders_json_schema() {
        let contract = FunctionContract::new("echo", "echo the message")
            .with_parameter(ContractParameter::required("message", "message to echo", "string"))
            .with_parameter(ContractParameter::optional(
                "loud",
                "uppercase the reply",
                "boolean",
                serde_json::json!(false),
            ));

        let definition = FunctionDefinition::from_contract(&contract);

        assert_eq!(definition.name, "echo");
        assert_eq!(definition.parameters["type"], "object");
        assert_eq!(definition.parameters["properties"]["message"]["type"], "string");
        assert_eq!(definition.parameters["properties"]["loud"]["default"], false);
        assert_eq!(definition.parameters["required"], serde_json::json!(["message"]));
    }
}
