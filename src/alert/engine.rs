//! Realtime alert evaluation
//!
//! The engine listens on `data::#`. For each sensor message it walks the
//! realtime rules, checks every condition aimed at the message's sender,
//! and for each condition that holds it records an alert, broadcasts it on
//! `alert<level>` and fires the rule's actions.
//!
//! The in-memory rule set is what evaluation reads. Rule changes hold its
//! write lock across the durable write and only touch memory once that
//! write succeeded, so the two copies never disagree.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::alert::action::ActionDispatcher;
use crate::alert::rule::{
    AlertRecord, AlertRule, AlertRuleCondition, AlertRuleType, ConditionPayload, ConditionType,
};
use crate::alert::store::{AlertRecordStore, RuleStore};
use crate::broker::message::AlertPayload;
use crate::broker::{Hub, Listener, ListenerId, Message};
use crate::client::permission::DATA_SCOPE;
use crate::utils::{HubError, Result};

/// Pattern the engine subscribes to.
pub const DATA_PATTERN: &str = "data::#";

pub struct AlertEngine {
    rules: RwLock<Vec<AlertRule>>,
    store: Arc<dyn RuleStore>,
    records: Arc<dyn AlertRecordStore>,
    actions: Arc<ActionDispatcher>,
}

impl AlertEngine {
    /// Create an engine with an empty rule set. Call `refresh_rules` to
    /// pull the stored rules in.
    pub fn new(
        store: Arc<dyn RuleStore>,
        records: Arc<dyn AlertRecordStore>,
        actions: Arc<ActionDispatcher>,
    ) -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
            store,
            records,
            actions,
        }
    }

    /// Register on the hub's listener registry.
    pub fn attach(self: &Arc<Self>, hub: &Hub) -> ListenerId {
        hub.add_topic_listener(DATA_PATTERN, self.clone())
    }

    /// Replace the in-memory rules with the stored ones. A name seen twice
    /// keeps its first definition.
    pub async fn refresh_rules(&self) -> Result<usize> {
        let loaded = self.store.load().await?;

        let mut rules: Vec<AlertRule> = Vec::with_capacity(loaded.len());
        for rule in loaded {
            if rules.iter().any(|r| r.name == rule.name) {
                warn!(rule = %rule.name, "Duplicate alert rule name in storage, skipped");
                continue;
            }
            if let Err(e) = rule.validate() {
                warn!(rule = %rule.name, error = %e, "Invalid alert rule in storage, skipped");
                continue;
            }
            rules.push(rule);
        }

        let count = rules.len();
        *self.rules.write().await = rules;
        info!(count, "Alert rules loaded");
        Ok(count)
    }

    pub async fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().await.clone()
    }

    pub async fn get_rule(&self, name: &str) -> Option<AlertRule> {
        self.rules
            .read()
            .await
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    pub async fn add_rule(&self, rule: AlertRule) -> Result<()> {
        rule.validate()?;

        let mut rules = self.rules.write().await;
        if rules.iter().any(|r| r.name == rule.name) {
            return Err(HubError::DuplicateRuleName(rule.name));
        }
        self.store.save(&rule).await?;

        info!(rule = %rule.name, "Alert rule added");
        rules.push(rule);
        Ok(())
    }

    pub async fn update_rule(&self, rule: AlertRule) -> Result<()> {
        rule.validate()?;

        let mut rules = self.rules.write().await;
        let Some(index) = rules.iter().position(|r| r.name == rule.name) else {
            return Err(HubError::RuleNotFound(rule.name));
        };
        self.store.save(&rule).await?;

        info!(rule = %rule.name, "Alert rule updated");
        rules[index] = rule;
        Ok(())
    }

    pub async fn delete_rule(&self, name: &str) -> Result<()> {
        let mut rules = self.rules.write().await;
        let Some(index) = rules.iter().position(|r| r.name == name) else {
            return Err(HubError::RuleNotFound(name.to_string()));
        };
        self.store.delete(name).await?;

        info!(rule = %name, "Alert rule deleted");
        rules.remove(index);
        Ok(())
    }

    /// Evaluate one message and raise every alert it triggers. Returns the
    /// number of alerts raised.
    pub async fn evaluate(&self, hub: &Hub, msg: &Message) -> usize {
        if msg.scope() != DATA_SCOPE {
            return 0;
        }
        let Some(sender) = msg.sender() else {
            debug!(topic = %msg.topic, "Data message without sender, skipped");
            return 0;
        };

        let fired: Vec<AlertRule> = {
            let rules = self.rules.read().await;
            let mut fired = Vec::new();
            for rule in rules.iter().filter(|r| r.kind == AlertRuleType::Realtime) {
                for condition in rule.conditions.iter().filter(|c| c.sensor_id == sender) {
                    if condition_matches(condition, msg) {
                        fired.push(rule.clone());
                    }
                }
            }
            fired
        };

        for rule in &fired {
            self.raise(hub, sender, rule).await;
        }
        fired.len()
    }

    async fn raise(&self, hub: &Hub, sender: &str, rule: &AlertRule) {
        let record = AlertRecord::new(sender, &rule.name, rule.level);
        info!(client_id = %sender, rule = %rule.name, level = %rule.level, "Alert raised");

        if let Err(e) = self.records.create(&record).await {
            error!(rule = %rule.name, error = %e, "Failed to store alert record");
        }

        let payload = AlertPayload {
            client_id: sender.to_string(),
            rule_name: rule.name.clone(),
            level: rule.level.to_string(),
        };
        match serde_json::to_value(&payload) {
            Ok(value) => hub.broadcast(Message::new(rule.level.topic(), value)),
            Err(e) => error!(rule = %rule.name, error = %e, "Failed to encode alert payload"),
        }

        self.actions.dispatch(&record, &rule.actions);
    }
}

#[async_trait]
impl Listener for AlertEngine {
    async fn on_message(&self, hub: &Hub, msg: &Message) {
        self.evaluate(hub, msg).await;
    }
}

/// Check one condition against a message from the condition's sensor.
pub fn condition_matches(condition: &AlertRuleCondition, msg: &Message) -> bool {
    match (&condition.kind, &condition.payload) {
        (ConditionType::Operator, ConditionPayload::Operator(spec)) => msg
            .sensor_data()
            .get(&condition.metric)
            .is_some_and(|value| spec.operator.compare(*value, spec.value)),
        (ConditionType::Event, ConditionPayload::Event(spec)) => {
            msg.event_name() == Some(spec.event_name.as_str())
        }
        _ => false,
    }
}
