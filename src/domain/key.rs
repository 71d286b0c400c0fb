//! Event identity model.
//!
//! A `DedupKey` describes one observed event occurrence. It carries no
//! behavior of its own: which of its fields take part in a comparison is
//! decided by the dedup strategy that consumes it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity tuple of one observed event occurrence.
///
/// `source`, `namespace`, `kind` and `name` usually identify what the event is
/// about, `reason` is a short categorical label, and `message_hash` is a
/// caller-computed digest of the free-form message. The message hash is not
/// guaranteed to be stable across semantically identical events, which is why
/// some strategies ignore it.
///
/// # Example
/// ```
/// use dedup_engine::{DedupKey, KeyField};
///
/// let key = DedupKey::new("falco", "default", "Pod", "web-0", "Shell spawned", "a1b2");
/// assert_eq!(key.field(KeyField::Kind), "Pod");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DedupKey {
    /// Originating producer identifier
    pub source: String,
    /// Namespace of the target resource
    pub namespace: String,
    /// Kind of the target resource
    pub kind: String,
    /// Name of the target resource
    pub name: String,
    /// Short categorical label for the event
    pub reason: String,
    /// Digest of the free-form message
    pub message_hash: String,
}

impl DedupKey {
    /// Create a key from its six components.
    pub fn new(
        source: impl Into<String>,
        namespace: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
        message_hash: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
            kind: kind.into(),
            name: name.into(),
            reason: reason.into(),
            message_hash: message_hash.into(),
        }
    }

    /// Get the value of a single field.
    pub fn field(&self, field: KeyField) -> &str {
        match field {
            KeyField::Source => &self.source,
            KeyField::Namespace => &self.namespace,
            KeyField::Kind => &self.kind,
            KeyField::Name => &self.name,
            KeyField::Reason => &self.reason,
            KeyField::MessageHash => &self.message_hash,
        }
    }
}

/// Name of one `DedupKey` field.
///
/// Used to configure which fields the key-based strategy compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyField {
    /// `source`
    Source,
    /// `namespace`
    Namespace,
    /// `kind`
    Kind,
    /// `name`
    Name,
    /// `reason`
    Reason,
    /// `messageHash`
    MessageHash,
}

impl KeyField {
    /// All fields, in declaration order.
    pub const ALL: [KeyField; 6] = [
        KeyField::Source,
        KeyField::Namespace,
        KeyField::Kind,
        KeyField::Name,
        KeyField::Reason,
        KeyField::MessageHash,
    ];

    /// Canonical configuration name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyField::Source => "source",
            KeyField::Namespace => "namespace",
            KeyField::Kind => "kind",
            KeyField::Name => "name",
            KeyField::Reason => "reason",
            KeyField::MessageHash => "messageHash",
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a field name does not name a `DedupKey` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dedup key field: {0:?}")]
pub struct UnknownKeyField(pub String);

impl FromStr for KeyField {
    type Err = UnknownKeyField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "source" => Ok(KeyField::Source),
            "namespace" => Ok(KeyField::Namespace),
            "kind" => Ok(KeyField::Kind),
            "name" => Ok(KeyField::Name),
            "reason" => Ok(KeyField::Reason),
            "messageHash" | "message_hash" | "message-hash" => Ok(KeyField::MessageHash),
            other => Err(UnknownKeyField(other.to_string())),
        }
    }
}
