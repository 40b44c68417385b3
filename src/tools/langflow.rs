//! Langflow chat tool
//!
//! Flow endpoints answer in several different shapes depending on how the flow
//! was built, so the reply is pulled out with an ordered list of candidate
//! paths. The first non-empty candidate wins.

use async_trait::async_trait;
use serde_json::Value;

use crate::core::Result;
use crate::tools::http::RemoteClient;
use crate::tools::traits::Tool;

/// Reply used when no candidate path yields anything
pub const FALLBACK_REPLY: &str = "Sorry, I could not understand the question.";

/// Sends a chat message to a Langflow flow
pub struct LangflowTool {
    name: String,
    remote: RemoteClient,
}

impl LangflowTool {
    /// Create a tool for a resolved flow endpoint
    pub fn new(remote: RemoteClient) -> Self {
        Self {
            name: "langflow_chat".to_string(),
            remote,
        }
    }

    /// Override the registered name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Request body for a single chat message
    pub fn request_body(message: &str) -> Value {
        serde_json::json!({
            "question": message,
            "chat_history": [],
            "input_value": message,
            "output_type": "chat",
            "input_type": "chat"
        })
    }
}

/// Pull the reply text out of a flow response
pub fn extract_reply(data: &Value) -> String {
    let first_output = &data["outputs"][0];
    let candidates = [
        &data["result"]["output"],
        &data["result"]["response"],
        &first_output["output"],
        &first_output["outputs"][0]["artifacts"]["message"],
        &first_output["messages"][0]["message"],
    ];

    let Some(reply) = candidates.into_iter().find(|v| is_present(v)) else {
        return FALLBACK_REPLY.to_string();
    };

    match reply {
        Value::String(text) => text.clone(),
        Value::Object(fields) => ["text", "content", "message"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find(|v| is_present(v))
            .map(|v| match v {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| reply.to_string()),
        other => other.to_string(),
    }
}

/// Null, false, zero and empty values count as absent
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[async_trait]
impl Tool for LangflowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Send a message to the Langflow chat flow and return its reply"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "The message to send"
                }
            },
            "required": ["message"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<String> {
        let message = arguments["message"].as_str().unwrap_or_default();
        let text = self.remote.post_json(&Self::request_body(message)).await?;
        let data: Value = serde_json::from_str(&text)?;
        Ok(extract_reply(&data))
    }
}
