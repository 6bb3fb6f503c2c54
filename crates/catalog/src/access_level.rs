use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use accessdesk_core::{DomainError, ValueObject};

/// A named permission tier offered by a software entry (e.g. "Read").
///
/// Labels are compared exactly: "write" is not "Write".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(String);

impl AccessLevel {
    pub fn new(label: impl Into<String>) -> Result<Self, DomainError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(DomainError::validation("access level label cannot be empty"));
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for AccessLevel {}

impl core::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The non-empty, duplicate-free set of access levels a software entry offers.
///
/// Insertion order is preserved for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevels(Vec<AccessLevel>);

impl AccessLevels {
    pub fn new<I, S>(labels: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let levels = labels
            .into_iter()
            .map(AccessLevel::new)
            .collect::<Result<Vec<_>, _>>()?;

        if levels.is_empty() {
            return Err(DomainError::validation("at least one access level is required"));
        }

        let mut seen = HashSet::with_capacity(levels.len());
        for level in &levels {
            if !seen.insert(level.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate access level '{level}'"
                )));
            }
        }

        Ok(Self(levels))
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l.as_str() == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccessLevel> {
        self.0.iter()
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|l| l.as_str().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed value; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ValueObject for AccessLevels {}
