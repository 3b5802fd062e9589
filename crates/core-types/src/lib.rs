use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Scope label used in element keys when no suite is attached to the run.
pub const GLOBAL_SCOPE: &str = "global";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("element name cannot be empty")]
    EmptyName,
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SuiteId(pub String);

impl SuiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExecutionId(pub String);

impl ExecutionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a persisted element: `(suite or "global", url, element name)`.
///
/// The composite id `"{scope}:{url}:{name}"` is deterministic so stores can
/// upsert on it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ElementKey {
    pub suite: Option<SuiteId>,
    pub url: String,
    pub name: String,
}

impl ElementKey {
    pub fn new(
        suite: Option<SuiteId>,
        url: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(KeyError::EmptyName);
        }
        Ok(Self {
            suite,
            url: url.into(),
            name,
        })
    }

    /// Key scoped to no suite.
    pub fn global(url: impl Into<String>, name: impl Into<String>) -> Result<Self, KeyError> {
        Self::new(None, url, name)
    }

    pub fn scope(&self) -> &str {
        self.suite
            .as_ref()
            .map(SuiteId::as_str)
            .unwrap_or(GLOBAL_SCOPE)
    }

    pub fn id(&self) -> String {
        format!("{}:{}:{}", self.scope(), self.url, self.name)
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.scope(), self.url, self.name)
    }
}
