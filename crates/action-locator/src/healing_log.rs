//! Per-execution record of every candidate attempt

use action_primitives::ActionKind;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Candidate;

/// One attempt of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub strategy_name: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Selector text tried; absent for derived locators
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    /// Retry round the attempt belonged to, starting at 0
    #[serde(default)]
    pub round: u32,
}

impl HealingAction {
    pub fn attempt(
        kind: ActionKind,
        candidate: &Candidate,
        round: u32,
        value: Option<&str>,
        error: Option<String>,
    ) -> Self {
        Self {
            kind,
            strategy_name: candidate.strategy_name().to_string(),
            success: error.is_none(),
            error,
            value: value.map(str::to_string),
            timestamp: Utc::now(),
            locator: candidate.locator().as_selector().map(str::to_string),
            round,
        }
    }
}

/// Aggregate view over a log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealingMetrics {
    pub total_attempts: usize,
    pub successful_healing: usize,
    pub success_rate: f64,
}

/// Append-only log scoped to one execution
#[derive(Debug, Default)]
pub struct HealingLog {
    entries: RwLock<Vec<HealingAction>>,
}

pub type SharedHealingLog = Arc<HealingLog>;

impl HealingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, action: HealingAction) {
        self.entries.write().push(action);
    }

    /// Copy of all entries in insertion order
    pub fn snapshot(&self) -> Vec<HealingAction> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn metrics(&self) -> HealingMetrics {
        let entries = self.entries.read();
        let total_attempts = entries.len();
        let successful_healing = entries.iter().filter(|entry| entry.success).count();
        let success_rate = if total_attempts == 0 {
            0.0
        } else {
            successful_healing as f64 / total_attempts as f64
        };
        HealingMetrics {
            total_attempts,
            successful_healing,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CandidateSource, LocatorStrategy};

    fn candidate(locator: &str) -> Candidate {
        Candidate::new(LocatorStrategy::new("", locator), CandidateSource::Authored)
    }

    #[test]
    fn snapshot_keeps_insertion_order() {
        let log = HealingLog::new();
        log.append(HealingAction::attempt(
            ActionKind::Click,
            &candidate("#a"),
            0,
            None,
            Some("timeout".into()),
        ));
        log.append(HealingAction::attempt(
            ActionKind::Click,
            &candidate("#b"),
            0,
            None,
            None,
        ));

        let entries = log.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].locator.as_deref(), Some("#a"));
        assert!(!entries[0].success);
        assert_eq!(entries[1].strategy_name, "inline");
        assert!(entries[1].success);
    }

    #[test]
    fn metrics_over_empty_log() {
        let metrics = HealingLog::new().metrics();
        assert_eq!(metrics.total_attempts, 0);
        assert_eq!(metrics.success_rate, 0.0);
    }

    #[test]
    fn metrics_count_successes() {
        let log = HealingLog::new();
        for error in [Some("x".to_string()), Some("y".to_string()), None, None] {
            log.append(HealingAction::attempt(
                ActionKind::Fill,
                &candidate("#email"),
                0,
                Some("a@b.c"),
                error,
            ));
        }
        let metrics = log.metrics();
        assert_eq!(metrics.total_attempts, 4);
        assert_eq!(metrics.successful_healing, 2);
        assert_eq!(metrics.success_rate, 0.5);
    }

    #[test]
    fn serialized_entry_uses_wire_names() {
        let entry = HealingAction::attempt(
            ActionKind::Fill,
            &candidate("#email"),
            1,
            Some("test@example.com"),
            None,
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "fill");
        assert_eq!(json["strategyName"], "inline");
        assert_eq!(json["value"], "test@example.com");
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }
}
