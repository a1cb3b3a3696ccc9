//! The `alert` module turns sensor data into alerts.
//!
//! - `rule`: rule, condition, action and record types
//! - `store`: rule and record storage traits, the file-backed rule store
//! - `action`: notification dispatch (webhook built in, others pluggable)
//! - `engine`: rule management and realtime evaluation

pub mod action;
pub mod engine;
pub mod rule;
pub mod store;

pub use action::{ActionDispatcher, ActionSender, WebhookSender};
pub use engine::AlertEngine;
pub use rule::{
    ActionType, AlertAction, AlertLevel, AlertRecord, AlertRule, AlertRuleCondition,
    AlertRuleType, Operator, RecordFilter,
};
pub use store::{AlertRecordStore, FileRuleStore, MemoryRecordStore, RuleStore};
