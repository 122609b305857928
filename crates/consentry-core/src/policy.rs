//! Consent policy names, decisions, and the persisted policy record.
//!
//! # Design
//! - Policy names are lower-cased on construction so lookups never depend on
//!   caller casing.
//! - The record keeps the JSON object wire format (`{"essential":true,...}`)
//!   while exposing a typed map internally.
//! - Decoding is the only fallible step; callers that must never observe a
//!   decode failure use [`PolicyRecord::decode_or_empty`].

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Name of the always-accepted policy.
pub const ESSENTIAL: &str = "essential";
/// Name of the built-in usage/analytics policy.
pub const USAGE: &str = "usage";
/// Name of the built-in settings policy.
pub const SETTINGS: &str = "settings";

/// Lower-cased consent policy identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PolicyName(String);

impl PolicyName {
    /// Build a policy name, lower-casing the input.
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    /// The reserved `essential` policy.
    #[must_use]
    pub fn essential() -> Self {
        Self(ESSENTIAL.to_string())
    }

    /// The built-in `usage` policy.
    #[must_use]
    pub fn usage() -> Self {
        Self(USAGE.to_string())
    }

    /// The built-in `settings` policy.
    #[must_use]
    pub fn settings() -> Self {
        Self(SETTINGS.to_string())
    }

    /// Borrow the normalised name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the non-revocable `essential` policy.
    #[must_use]
    pub fn is_essential(&self) -> bool {
        self.0 == ESSENTIAL
    }
}

impl From<String> for PolicyName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for PolicyName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<PolicyName> for String {
    fn from(value: PolicyName) -> Self {
        value.0
    }
}

impl AsRef<str> for PolicyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PolicyName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Acceptance state of a single policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    /// The visitor accepted the policy.
    Accepted,
    /// The visitor rejected the policy.
    Rejected,
    /// The policy is not present in the stored record.
    Unknown,
}

impl PolicyDecision {
    /// Map a stored boolean (or its absence) to a decision.
    #[must_use]
    pub const fn from_stored(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Accepted,
            Some(false) => Self::Rejected,
            None => Self::Unknown,
        }
    }

    /// `true` only for [`PolicyDecision::Accepted`].
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Collapse back to the stored representation.
    #[must_use]
    pub const fn as_stored(self) -> Option<bool> {
        match self {
            Self::Accepted => Some(true),
            Self::Rejected => Some(false),
            Self::Unknown => None,
        }
    }

    /// Lower-case label used in logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for PolicyDecision {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error raised when a stored policy record cannot be decoded.
#[derive(Debug, Error)]
#[error("stored policy record is malformed")]
pub struct RecordDecodeError {
    /// Source JSON error.
    #[from]
    source: serde_json::Error,
}

/// Mapping of policy name to acceptance flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyRecord(BTreeMap<PolicyName, bool>);

impl PolicyRecord {
    /// Create an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Record holding a single entry, used as a change payload.
    #[must_use]
    pub fn single(name: PolicyName, accepted: bool) -> Self {
        let mut record = Self::new();
        record.insert(name, accepted);
        record
    }

    /// Stored flag for `name`, if present.
    #[must_use]
    pub fn get(&self, name: &PolicyName) -> Option<bool> {
        self.0.get(name).copied()
    }

    /// Decision for `name`, distinguishing unknown policies.
    #[must_use]
    pub fn decision(&self, name: &PolicyName) -> PolicyDecision {
        PolicyDecision::from_stored(self.get(name))
    }

    /// Whether the record contains `name`.
    #[must_use]
    pub fn contains(&self, name: &PolicyName) -> bool {
        self.0.contains_key(name)
    }

    /// Insert or overwrite a flag, returning the previous value.
    pub fn insert(&mut self, name: PolicyName, accepted: bool) -> Option<bool> {
        self.0.insert(name, accepted)
    }

    /// Overlay every entry of `other` onto this record.
    pub fn merge(&mut self, other: &Self) {
        for (name, accepted) in &other.0 {
            self.0.insert(name.clone(), *accepted);
        }
    }

    /// Force `essential` to `true`.
    pub fn assert_essential(&mut self) {
        self.0.insert(PolicyName::essential(), true);
    }

    /// Copy of the record with every known policy set to `accepted`.
    #[must_use]
    pub fn with_all(&self, accepted: bool) -> Self {
        Self(self.0.keys().map(|name| (name.clone(), accepted)).collect())
    }

    /// Iterate over the known policy names in order.
    pub fn names(&self) -> impl Iterator<Item = &PolicyName> {
        self.0.keys()
    }

    /// Iterate over `(name, accepted)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&PolicyName, bool)> {
        self.0.iter().map(|(name, accepted)| (name, *accepted))
    }

    /// Number of policies in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record holds no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serialise to the JSON object stored in the policies cookie.
    #[must_use]
    pub fn encode(&self) -> String {
        let object = self
            .0
            .iter()
            .map(|(name, accepted)| (name.as_str().to_string(), Value::Bool(*accepted)))
            .collect::<Map<String, Value>>();
        Value::Object(object).to_string()
    }

    /// Parse a stored record. Every value must be a boolean.
    ///
    /// # Errors
    ///
    /// Returns [`RecordDecodeError`] when the payload is not a JSON object of
    /// booleans.
    pub fn decode(raw: &str) -> Result<Self, RecordDecodeError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Parse a stored record, treating absence or malformed input as empty.
    #[must_use]
    pub fn decode_or_empty(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        match Self::decode(raw) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(error = %err, "discarding malformed policy record");
                Self::new()
            }
        }
    }
}

impl FromIterator<(PolicyName, bool)> for PolicyRecord {
    fn from_iter<T: IntoIterator<Item = (PolicyName, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
