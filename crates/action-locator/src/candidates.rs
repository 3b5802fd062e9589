//! Candidate builder - merge persisted history with authored strategies

use healwright_core_types::ElementKey;
use selector_store::{PersistedElement, SharedSelectorStore};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::types::{Candidate, CandidateSource, Locator, LocatorStrategy};

/// Ordered candidates plus the record they were seeded from
#[derive(Debug, Clone, Default)]
pub struct CandidatePlan {
    pub candidates: Vec<Candidate>,
    pub persisted: Option<PersistedElement>,
}

impl CandidatePlan {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Selector text of each candidate, derived locators shown by label
    pub fn describe(&self) -> Vec<String> {
        self.candidates
            .iter()
            .map(|candidate| candidate.locator().describe())
            .collect()
    }
}

/// Builds the candidate sequence for one action
#[derive(Clone, Default)]
pub struct CandidateBuilder {
    store: Option<SharedSelectorStore>,
}

impl CandidateBuilder {
    pub fn new(store: Option<SharedSelectorStore>) -> Self {
        Self { store }
    }

    /// Look up `key` in the store and merge its history ahead of `authored`.
    ///
    /// A failing store is treated as having no history.
    pub async fn build(&self, key: Option<&ElementKey>, authored: &[LocatorStrategy]) -> CandidatePlan {
        let persisted = match (&self.store, key) {
            (Some(store), Some(key)) => match store.get(key).await {
                Ok(record) => record,
                Err(err) => {
                    warn!(key = %key, error = %err, "Selector store read failed, using authored strategies only");
                    None
                }
            },
            _ => None,
        };

        let name = key.map(|key| key.name.as_str()).unwrap_or_default();
        let candidates = merge_candidates(name, persisted.as_ref(), authored);
        debug!(
            element = %name,
            persisted = persisted.is_some(),
            candidates = candidates.len(),
            "Built candidate sequence"
        );
        CandidatePlan {
            candidates,
            persisted,
        }
    }
}

/// Merge a persisted record and authored strategies into one ordered sequence.
///
/// Order: `locator`, `ai_selectors`, `selectors`, `fallback_selectors`, then
/// authored strategies as given. String selectors appear once, at their first
/// position (exact string comparison); derived locators are always kept.
pub fn merge_candidates(
    element_name: &str,
    persisted: Option<&PersistedElement>,
    authored: &[LocatorStrategy],
) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    if let Some(record) = persisted {
        let seeded = std::iter::once((record.locator.as_str(), CandidateSource::Persisted))
            .chain(
                record
                    .ai_selectors
                    .iter()
                    .map(|s| (s.as_str(), CandidateSource::Ai)),
            )
            .chain(
                record
                    .selectors
                    .iter()
                    .map(|s| (s.as_str(), CandidateSource::History)),
            )
            .chain(
                record
                    .fallback_selectors
                    .iter()
                    .map(|s| (s.as_str(), CandidateSource::Fallback)),
            );

        for (selector, source) in seeded {
            if selector.trim().is_empty() || !seen.insert(selector.to_string()) {
                continue;
            }
            let strategy = LocatorStrategy::new(element_name, selector)
                .with_description(format!("{source:?} selector from store").to_lowercase());
            out.push(Candidate::new(strategy, source));
        }
    }

    for strategy in authored {
        if !strategy.locator.is_usable() {
            continue;
        }
        if let Locator::Selector(text) = &strategy.locator {
            if !seen.insert(text.clone()) {
                continue;
            }
        }
        out.push(Candidate::new(strategy.clone(), CandidateSource::Authored));
    }

    out
}
