// Response models
// Wire shapes of the persistence and metadata collaborators, plus the handler reply envelope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveConfigResponse {
    pub hash: String,
}

/// Body of every non-2xx reply: `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventInput {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub inputs: Vec<EventInput>,
}

/// Decoded contract descriptor returned by the network-metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractMetadata {
    pub contract_address: String,
    pub contract_name: String,
    #[serde(default)]
    pub contract_events: Vec<ContractEvent>,
}

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Handler reply: HTTP-style status, content type and raw body text.
///
/// Load replies carry the stored JSON verbatim, so the body stays a string rather than a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl ApiReply {
    pub fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        Self {
            status,
            content_type: CONTENT_TYPE_JSON,
            body,
        }
    }

    pub fn raw_json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_JSON,
            body: body.into(),
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorBody {
                error: message.into(),
            },
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Extract the `error` field of a failure body, if the body has one.
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .map(|b| b.error)
    }
}
