//! Persisted element record and the merge rules shared by all backends

use chrono::{DateTime, Utc};
use healwright_core_types::{ElementKey, SuiteId, GLOBAL_SCOPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::StoreError;

/// Durable record of the locators that worked for one element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedElement {
    /// Composite key `"{suite or global}:{url}:{name}"`
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub suite_id: Option<String>,

    /// Most recently proven selector; empty for records only seeded by discovery
    #[serde(default)]
    pub locator: String,

    /// Proven selectors, most recent first
    #[serde(default)]
    pub selectors: Vec<String>,

    #[serde(default)]
    pub ai_selectors: Vec<String>,

    #[serde(default)]
    pub fallback_selectors: Vec<String>,

    #[serde(default)]
    pub ai_confidence: Option<f64>,

    /// Opaque side-channel data (tag name, description, ...)
    #[serde(default)]
    pub metadata: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Selectors supplied by an external discovery process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    #[serde(default)]
    pub ai_selectors: Vec<String>,
    #[serde(default)]
    pub fallback_selectors: Vec<String>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
}

impl PersistedElement {
    /// Record created by the first successful resolution of `key`
    pub fn first_proven(
        key: &ElementKey,
        working_locator: &str,
        metadata: Option<Value>,
    ) -> Result<Self, StoreError> {
        let working = validate_locator(key, working_locator)?;
        let now = Utc::now();
        Ok(Self {
            id: key.id(),
            name: key.name.clone(),
            url: key.url.clone(),
            suite_id: key.suite.as_ref().map(|suite| suite.0.clone()),
            locator: working.clone(),
            selectors: vec![working],
            ai_selectors: Vec::new(),
            fallback_selectors: Vec::new(),
            ai_confidence: None,
            metadata,
            created_at: now,
            updated_at: now,
        })
    }

    /// Empty record to hang discovery results on before anything was proven
    pub fn unproven(key: &ElementKey) -> Self {
        let now = Utc::now();
        Self {
            id: key.id(),
            name: key.name.clone(),
            url: key.url.clone(),
            suite_id: key.suite.as_ref().map(|suite| suite.0.clone()),
            locator: String::new(),
            selectors: Vec::new(),
            ai_selectors: Vec::new(),
            fallback_selectors: Vec::new(),
            ai_confidence: None,
            metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> ElementKey {
        ElementKey {
            suite: self.suite_id.clone().map(SuiteId),
            url: self.url.clone(),
            name: self.name.clone(),
        }
    }

    pub fn scope(&self) -> &str {
        self.suite_id.as_deref().unwrap_or(GLOBAL_SCOPE)
    }

    /// Promote `working_locator` after a successful resolution.
    ///
    /// New `selectors` = dedup(`[working, locator, ...ai, ...selectors, ...fallback]`).
    /// Existing selectors are only ever reordered, never removed.
    pub fn promote(
        &mut self,
        working_locator: &str,
        metadata: Option<Value>,
    ) -> Result<(), StoreError> {
        let working = validate_locator(&self.key(), working_locator)?;
        let merged = dedup_preserving_order(
            std::iter::once(working.as_str())
                .chain(std::iter::once(self.locator.as_str()))
                .chain(self.ai_selectors.iter().map(String::as_str))
                .chain(self.selectors.iter().map(String::as_str))
                .chain(self.fallback_selectors.iter().map(String::as_str)),
        );
        self.locator = working;
        self.selectors = merged;
        if metadata.is_some() {
            self.metadata = metadata;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merge discovery output; new suggestions go ahead of older ones
    pub fn apply_discovery(&mut self, discovery: Discovery) {
        self.ai_selectors = dedup_preserving_order(
            discovery
                .ai_selectors
                .iter()
                .chain(self.ai_selectors.iter())
                .map(String::as_str),
        );
        self.fallback_selectors = dedup_preserving_order(
            discovery
                .fallback_selectors
                .iter()
                .chain(self.fallback_selectors.iter())
                .map(String::as_str),
        );
        if discovery.ai_confidence.is_some() {
            self.ai_confidence = discovery.ai_confidence;
        }
        self.updated_at = Utc::now();
    }

    /// Whether `locator` is already the record's first choice
    pub fn is_front(&self, locator: &str) -> bool {
        self.locator == locator && self.selectors.first().map(String::as_str) == Some(locator)
    }

    /// Every distinct selector the record knows about
    pub fn known_selectors(&self) -> HashSet<&str> {
        std::iter::once(self.locator.as_str())
            .chain(self.selectors.iter().map(String::as_str))
            .chain(self.ai_selectors.iter().map(String::as_str))
            .chain(self.fallback_selectors.iter().map(String::as_str))
            .filter(|selector| !selector.is_empty())
            .collect()
    }
}

/// Remove duplicates and blank entries, keeping the first occurrence of each.
///
/// Comparison is exact string equality: `#a` and `#a ` are different selectors.
pub fn dedup_preserving_order<'a, I>(selectors: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for selector in selectors {
        if selector.trim().is_empty() {
            continue;
        }
        if seen.insert(selector) {
            out.push(selector.to_string());
        }
    }
    out
}

fn validate_locator(key: &ElementKey, locator: &str) -> Result<String, StoreError> {
    if locator.trim().is_empty() {
        return Err(StoreError::InvalidLocator {
            key: key.id(),
            reason: "locator is empty".to_string(),
        });
    }
    Ok(locator.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ElementKey {
        ElementKey::global("https://app.test/login", "login-btn").unwrap()
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let out = dedup_preserving_order(["#a", "#b", "#a", "", "#c", "#b"]);
        assert_eq!(out, vec!["#a", "#b", "#c"]);
    }

    #[test]
    fn dedup_is_whitespace_sensitive() {
        let out = dedup_preserving_order(["#a", "#a "]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn first_proven_seeds_selectors() {
        let record = PersistedElement::first_proven(&key(), "#new-login", None).unwrap();
        assert_eq!(record.id, "global:https://app.test/login:login-btn");
        assert_eq!(record.locator, "#new-login");
        assert_eq!(record.selectors, vec!["#new-login"]);
        assert!(record.is_front("#new-login"));
    }

    #[test]
    fn promote_moves_working_locator_to_front() {
        let mut record = PersistedElement::first_proven(&key(), "#old", None).unwrap();
        record.apply_discovery(Discovery {
            ai_selectors: vec!["role=button[name=\"Log in\"]".into()],
            fallback_selectors: vec!["text=Log in".into()],
            ai_confidence: Some(0.8),
        });

        record.promote("text=Log in", None).unwrap();
        assert_eq!(record.locator, "text=Log in");
        assert_eq!(
            record.selectors,
            vec!["text=Log in", "#old", "role=button[name=\"Log in\"]"]
        );
        // supplementary lists are left in place
        assert_eq!(record.fallback_selectors, vec!["text=Log in"]);
    }

    #[test]
    fn promote_never_loses_selectors() {
        let mut record = PersistedElement::first_proven(&key(), "#a", None).unwrap();
        record.promote("#b", None).unwrap();
        record.promote("#c", None).unwrap();
        let before: HashSet<String> = record
            .known_selectors()
            .into_iter()
            .map(str::to_string)
            .collect();
        record.promote("#a", None).unwrap();
        let after = record.known_selectors();
        assert!(before.iter().all(|s| after.contains(s.as_str())));
        assert_eq!(record.selectors, vec!["#a", "#c", "#b"]);
    }

    #[test]
    fn promote_rejects_empty_locator() {
        let mut record = PersistedElement::first_proven(&key(), "#a", None).unwrap();
        assert!(matches!(
            record.promote("  ", None),
            Err(StoreError::InvalidLocator { .. })
        ));
    }

    #[test]
    fn metadata_only_replaced_when_supplied() {
        let mut record = PersistedElement::first_proven(
            &key(),
            "#a",
            Some(serde_json::json!({"tag": "button"})),
        )
        .unwrap();
        record.promote("#b", None).unwrap();
        assert_eq!(record.metadata, Some(serde_json::json!({"tag": "button"})));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let record = PersistedElement::first_proven(&key(), "#a", None).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("aiSelectors").is_some());
        assert!(json.get("fallbackSelectors").is_some());
        assert!(json.get("updatedAt").is_some());
    }
}
