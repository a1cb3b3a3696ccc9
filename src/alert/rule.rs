//! Alert rule model
//!
//! Rules are stored as JSON, one document per rule. A realtime rule is
//! checked against every sensor message; static rules are kept and
//! managed but not evaluated here.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::utils::{HubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Error,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Error => "error",
        }
    }

    /// Topic alerts of this level are broadcast on, e.g. `alertwarning`.
    pub fn topic(&self) -> String {
        format!("alert{}", self.as_str())
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertRuleType {
    Realtime,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionType {
    Operator,
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
}

impl Operator {
    pub fn compare(&self, actual: f64, operand: f64) -> bool {
        match self {
            Operator::Eq => actual == operand,
            Operator::Ne => actual != operand,
            Operator::Gt => actual > operand,
            Operator::Lt => actual < operand,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorSpec {
    pub operator: Operator,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSpec {
    #[serde(rename = "eventName", alias = "EventName")]
    pub event_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionPayload {
    Operator(OperatorSpec),
    Event(EventSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRuleCondition {
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    #[serde(default)]
    pub metric: String,
    #[serde(rename = "type")]
    pub kind: ConditionType,
    pub payload: ConditionPayload,
}

impl AlertRuleCondition {
    pub fn operator(
        sensor_id: impl Into<String>,
        metric: impl Into<String>,
        operator: Operator,
        value: f64,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            metric: metric.into(),
            kind: ConditionType::Operator,
            payload: ConditionPayload::Operator(OperatorSpec { operator, value }),
        }
    }

    pub fn event(sensor_id: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            metric: String::new(),
            kind: ConditionType::Event,
            payload: ConditionPayload::Event(EventSpec {
                event_name: event_name.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Email,
    Sms,
    Webhook,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertAction {
    #[serde(rename = "type", alias = "Type")]
    pub kind: ActionType,
    #[serde(default, alias = "Payload")]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AlertRuleType,
    pub level: AlertLevel,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    pub conditions: Vec<AlertRuleCondition>,
    #[serde(default)]
    pub actions: Vec<AlertAction>,
}

impl AlertRule {
    pub fn realtime(name: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            name: name.into(),
            kind: AlertRuleType::Realtime,
            level,
            summary: String::new(),
            description: String::new(),
            conditions: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: AlertRuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, kind: ActionType, payload: Value) -> Self {
        self.actions.push(AlertAction { kind, payload });
        self
    }

    /// Reject rules that cannot be stored under their name or whose
    /// condition payloads do not fit their condition type.
    pub fn validate(&self) -> Result<()> {
        let name_ok = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !self.name.starts_with('.');
        if !name_ok {
            return Err(HubError::InvalidRule(format!(
                "rule name '{}' must be non-empty and use only [A-Za-z0-9._-]",
                self.name
            )));
        }

        if self.conditions.is_empty() {
            return Err(HubError::InvalidRule(format!(
                "rule '{}' has no conditions",
                self.name
            )));
        }

        for condition in &self.conditions {
            if condition.sensor_id.is_empty() {
                return Err(HubError::InvalidRule(format!(
                    "rule '{}' has a condition without sensorId",
                    self.name
                )));
            }
            match (&condition.kind, &condition.payload) {
                (ConditionType::Operator, ConditionPayload::Operator(_)) => {
                    if condition.metric.is_empty() {
                        return Err(HubError::InvalidRule(format!(
                            "rule '{}' has an operator condition without metric",
                            self.name
                        )));
                    }
                }
                (ConditionType::Event, ConditionPayload::Event(_)) => {}
                _ => {
                    return Err(HubError::InvalidRule(format!(
                        "rule '{}' has a condition whose payload does not match its type",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Persisted fact that a rule fired for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(rename = "ruleName")]
    pub rule_name: String,
    pub level: AlertLevel,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    pub fn new(client_id: impl Into<String>, rule_name: impl Into<String>, level: AlertLevel) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            rule_name: rule_name.into(),
            level,
            created_at: Utc::now(),
        }
    }
}

/// Selection for `AlertRecordStore::query`. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub client_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AlertRecord) -> bool {
        self.client_id
            .as_deref()
            .is_none_or(|id| id == record.client_id)
            && self.start.is_none_or(|start| record.created_at >= start)
            && self.end.is_none_or(|end| record.created_at <= end)
    }
}
