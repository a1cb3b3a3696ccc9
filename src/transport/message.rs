use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::broker::Message;
use crate::utils::{HubError, Result};

pub const ERROR_TOPIC: &str = "error";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },
}

/// One text frame from a peer: a control request when it carries a
/// `type` key, otherwise a message to publish.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    Control(ControlMessage),
    Publish(Message),
}

impl InboundFrame {
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(malformed)?;
        if value.get("type").is_some() {
            serde_json::from_value(value)
                .map(Self::Control)
                .map_err(malformed)
        } else {
            serde_json::from_value(value)
                .map(Self::Publish)
                .map_err(malformed)
        }
    }
}

/// Reply pushed to a peer whose frame could not be handled.
pub fn error_reply(reason: &str) -> Message {
    Message::new(ERROR_TOPIC, json!({ "error": reason }))
}

fn malformed(e: serde_json::Error) -> HubError {
    HubError::MalformedMessage(e.to_string())
}
