//! Alert actions
//!
//! Each action of a fired rule runs on its own task. Failures are logged
//! and go nowhere else: no retry, and rule evaluation never waits on them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::alert::rule::{ActionType, AlertAction, AlertRecord};
use crate::utils::{HubError, Result};

#[async_trait]
pub trait ActionSender: Send + Sync {
    /// Deliver one notification. `payload` is the action's configured payload.
    async fn send(&self, alert: &AlertRecord, payload: &Value) -> Result<()>;
}

#[derive(Default)]
pub struct ActionDispatcher {
    senders: HashMap<ActionType, Arc<dyn ActionSender>>,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sender(mut self, kind: ActionType, sender: Arc<dyn ActionSender>) -> Self {
        self.senders.insert(kind, sender);
        self
    }

    /// Spawn every action. The handles may be dropped; they are returned
    /// for callers that want to wait.
    pub fn dispatch(&self, alert: &AlertRecord, actions: &[AlertAction]) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(actions.len());
        for action in actions {
            let Some(sender) = self.senders.get(&action.kind).cloned() else {
                warn!(rule = %alert.rule_name, action = ?action.kind, "No sender registered for alert action");
                continue;
            };
            let alert = alert.clone();
            let payload = action.payload.clone();
            let kind = action.kind;
            handles.push(tokio::spawn(async move {
                match sender.send(&alert, &payload).await {
                    Ok(()) => debug!(rule = %alert.rule_name, action = ?kind, "Alert action sent"),
                    Err(e) => warn!(rule = %alert.rule_name, action = ?kind, error = %e, "Alert action failed"),
                }
            }));
        }
        handles
    }
}

impl fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("senders", &self.senders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// POSTs the alert as JSON to the `url` in the action payload.
#[derive(Debug, Clone)]
pub struct WebhookSender {
    http: reqwest::Client,
}

impl WebhookSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ActionSender for WebhookSender {
    async fn send(&self, alert: &AlertRecord, payload: &Value) -> Result<()> {
        let url = payload
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| HubError::InvalidRule("webhook action without url".to_string()))?;

        let body = json!({
            "clientID": alert.client_id,
            "ruleName": alert.rule_name,
            "level": alert.level,
            "createdAt": alert.created_at,
        });

        self.http
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
