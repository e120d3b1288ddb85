//! Inbound payload of a custom-action call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::Domain;
use crate::errors::RequestError;
use crate::serde_ext::null_as_default;
use crate::tracker::Tracker;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Action the orchestrator wants to run.
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracker: Tracker,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domain: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ActionRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn from_value(body: Value) -> Result<Self, RequestError> {
        Ok(serde_json::from_value(body)?)
    }

    /// Conversation id, preferring the tracker's copy.
    pub fn sender_id(&self) -> &str {
        if self.tracker.sender_id.is_empty() {
            self.sender_id.as_deref().unwrap_or_default()
        } else {
            &self.tracker.sender_id
        }
    }
}
