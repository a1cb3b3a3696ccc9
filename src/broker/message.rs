//! Message definitions for the hub
//!
//! `Message` is the one type every producer hands to the hub and every
//! subscriber receives. On the wire it is a JSON object with the keys
//! `Topic` and `Payload`; the payload is any JSON value.
//!
//! Sensor payloads carry a `senderID` and either a numeric `data` map or an
//! `eventName`. Producers that put the readings at the top level of the
//! payload and the sensor id in the topic (`data::<sensor>`) are accepted
//! too; see [`Message::sender`] and [`Message::sensor_data`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::topic;
use crate::utils::{HubError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Topic")]
    pub topic: String,
    #[serde(rename = "Payload", default)]
    pub payload: Value,
}

impl Message {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    pub fn scope(&self) -> &str {
        topic::scope_of(&self.topic)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the wire form. Any failure is reported as `MalformedMessage`.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| HubError::MalformedMessage(e.to_string()))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| HubError::MalformedMessage(e.to_string()))
    }

    /// Id of the producing client: the payload's `senderID`, falling back to
    /// the second topic segment.
    pub fn sender(&self) -> Option<&str> {
        if let Some(id) = self.payload.get("senderID").and_then(Value::as_str) {
            return Some(id);
        }
        topic::segments(&self.topic)
            .nth(1)
            .filter(|segment| !segment.is_empty())
    }

    /// Numeric readings carried by the message. Taken from the payload's
    /// `data` object when present, otherwise from the numeric top-level
    /// fields of the payload.
    pub fn sensor_data(&self) -> HashMap<String, f64> {
        let source = match self.payload.get("data") {
            Some(Value::Object(map)) => map,
            _ => match &self.payload {
                Value::Object(map) => map,
                _ => return HashMap::new(),
            },
        };

        source
            .iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k.clone(), n)))
            .collect()
    }

    pub fn event_name(&self) -> Option<&str> {
        self.payload.get("eventName").and_then(Value::as_str)
    }
}

/// Payload published by the collection scheduler on `data::<client_id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorDataPayload {
    #[serde(rename = "senderID")]
    pub sender_id: String,
    #[serde(default)]
    pub data: HashMap<String, f64>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorEventPayload {
    #[serde(rename = "senderID")]
    pub sender_id: String,
    #[serde(rename = "eventName")]
    pub event_name: String,
}

/// Payload of an `alert<level>` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "ruleName")]
    pub rule_name: String,
    pub level: String,
}
