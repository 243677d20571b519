//! Wire types exchanged with remote protocol servers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tool_primitives::Args;

/// Tool call sent to a remote server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    /// Bare tool name as known by the server.
    pub name: String,
    /// Call arguments, forwarded verbatim.
    #[serde(default)]
    pub arguments: Args,
}

/// Raw result returned by a remote server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolResult {
    /// Unstructured content parts, in server order.
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Structured payload declared by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    /// Set when the server reports a tool-level failure.
    #[serde(default)]
    pub is_error: bool,
}

impl ProtocolResult {
    /// Result carrying a single text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentPart::text(text)],
            ..Self::default()
        }
    }

    /// Result carrying a structured payload.
    #[must_use]
    pub fn structured(value: Value) -> Self {
        Self {
            structured_content: Some(value),
            ..Self::default()
        }
    }

    /// Result carrying the supplied content parts.
    #[must_use]
    pub fn with_content(content: Vec<ContentPart>) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

/// One content part of a [`ProtocolResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// Text body.
        text: String,
    },
    /// Base64 image data.
    Image {
        /// Encoded payload.
        data: String,
        /// MIME type of the payload.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Base64 audio data.
    Audio {
        /// Encoded payload.
        data: String,
        /// MIME type of the payload.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource; text resources carry a `text` field.
    Resource {
        /// Raw resource object.
        resource: Value,
    },
}

impl ContentPart {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns the text carried by the part, if it is text-bearing.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::Resource { resource } => resource.get("text").and_then(Value::as_str),
            Self::Image { .. } | Self::Audio { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_server_payload() {
        let result: ProtocolResult = serde_json::from_value(json!({
            "content": [
                { "type": "text", "text": "hello" },
                { "type": "image", "data": "aGk=", "mimeType": "image/png" },
                { "type": "resource", "resource": { "uri": "file:///a", "text": "body" } }
            ],
            "isError": false
        }))
        .expect("parse");

        let texts: Vec<_> = result.content.iter().map(ContentPart::text_value).collect();
        assert_eq!(texts, vec![Some("hello"), None, Some("body")]);
        assert!(result.structured_content.is_none());
    }

    #[test]
    fn serializes_structured_content_camel_case() {
        let value = serde_json::to_value(ProtocolResult::structured(json!({ "ok": true })))
            .expect("json");
        assert_eq!(value["structuredContent"], json!({ "ok": true }));
        assert_eq!(value["isError"], json!(false));
    }
}
