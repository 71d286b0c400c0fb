//! Canonical content fingerprints.
//!
//! A fingerprint is a digest over the semantically meaningful parts of an
//! event payload. Volatile fields (timestamps, counters, object versions) are
//! excluded so two events that differ only in bookkeeping collapse into one
//! occurrence, while a real content change (for example a different
//! `severity`) produces a different fingerprint.
//!
//! Fingerprinting never fails: malformed or missing fields are simply not
//! part of the digest.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque event payload handed to the dedup strategies.
pub type Content = Map<String, Value>;

/// Top-level fields that describe what an event means.
pub const CANONICAL_FIELDS: &[&str] = &[
    "source",
    "category",
    "severity",
    "eventType",
    "rule",
    "resource",
    "details",
];

/// Fields stripped at every depth before hashing.
pub const VOLATILE_FIELDS: &[&str] = &[
    "timestamp",
    "detectedAt",
    "firstSeen",
    "lastSeen",
    "firstTimestamp",
    "lastTimestamp",
    "count",
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "managedFields",
];

/// Hex-encoded SHA-256 digest of canonical event content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of an event payload.
    ///
    /// If the payload carries an object under `spec` (the layout of a
    /// Kubernetes-style resource), that object is fingerprinted; otherwise the
    /// payload itself. Only `CANONICAL_FIELDS` take part, unless none of them
    /// is present, in which case everything except `VOLATILE_FIELDS` does.
    ///
    /// # Example
    /// ```
    /// use dedup_engine::Fingerprint;
    /// use serde_json::json;
    ///
    /// let a = json!({"source": "falco", "severity": "HIGH", "timestamp": "10:00"});
    /// let b = json!({"source": "falco", "severity": "HIGH", "timestamp": "10:05"});
    ///
    /// assert_eq!(
    ///     Fingerprint::of(a.as_object().unwrap()),
    ///     Fingerprint::of(b.as_object().unwrap()),
    /// );
    /// ```
    pub fn of(content: &Content) -> Self {
        let source = match content.get("spec") {
            Some(Value::Object(spec)) => spec,
            _ => content,
        };

        let mut hasher = Sha256::new();
        let has_canonical = CANONICAL_FIELDS.iter().any(|f| source.contains_key(*f));

        if has_canonical {
            for field in CANONICAL_FIELDS {
                if let Some(value) = source.get(*field) {
                    write_str(&mut hasher, field);
                    write_canonical(&mut hasher, value);
                }
            }
        } else {
            write_object(&mut hasher, source);
        }

        Fingerprint(hex::encode(hasher.finalize()))
    }

    /// Get the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn write_object(hasher: &mut Sha256, object: &Map<String, Value>) {
    let mut keys: Vec<&String> = object
        .keys()
        .filter(|k| !VOLATILE_FIELDS.contains(&k.as_str()))
        .collect();
    keys.sort();

    hasher.update(b"{");
    for key in keys {
        write_str(hasher, key);
        write_canonical(hasher, &object[key.as_str()]);
    }
    hasher.update(b"}");
}

fn write_canonical(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Object(object) => write_object(hasher, object),
        Value::Array(items) => {
            hasher.update(b"[");
            for item in items {
                write_canonical(hasher, item);
            }
            hasher.update(b"]");
        }
        Value::String(s) => {
            hasher.update(b"s");
            write_str(hasher, s);
        }
        scalar => {
            // null, bool and number render unambiguously as JSON
            hasher.update(b"v");
            write_str(hasher, &scalar.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(value: Value) -> Content {
        match value {
            Value::Object(map) => map,
            _ => panic!("test content must be an object"),
        }
    }

    #[test]
    fn test_identical_content_same_fingerprint() {
        let a = content(json!({"source": "trivy", "category": "security", "severity": "HIGH"}));
        let b = content(json!({"severity": "HIGH", "source": "trivy", "category": "security"}));

        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_severity_change_changes_fingerprint() {
        let a = content(json!({"source": "trivy", "severity": "HIGH"}));
        let b = content(json!({"source": "trivy", "severity": "LOW"}));

        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_volatile_fields_ignored() {
        let a = content(json!({
            "source": "falco",
            "details": {"rule": "shell", "lastSeen": "2024-01-01T00:00:00Z"},
            "timestamp": "2024-01-01T00:00:00Z"
        }));
        let b = content(json!({
            "source": "falco",
            "details": {"rule": "shell", "lastSeen": "2024-01-01T00:09:00Z"},
            "timestamp": "2024-01-01T00:09:00Z"
        }));

        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_non_canonical_fields_ignored_when_canonical_present() {
        let a = content(json!({"source": "kyverno", "message": "policy violated on pod a"}));
        let b = content(json!({"source": "kyverno", "message": "policy violated on pod b"}));

        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_spec_object_is_used() {
        let wrapped = content(json!({
            "metadata": {"name": "obs-1", "resourceVersion": "12"},
            "spec": {"source": "falco", "severity": "CRITICAL"}
        }));
        let flat = content(json!({"source": "falco", "severity": "CRITICAL"}));

        assert_eq!(Fingerprint::of(&wrapped), Fingerprint::of(&flat));
    }

    #[test]
    fn test_fallback_to_whole_content() {
        let a = content(json!({"message": "disk full", "timestamp": 1}));
        let b = content(json!({"message": "disk full", "timestamp": 2}));
        let c = content(json!({"message": "disk ok"}));

        assert_eq!(Fingerprint::of(&a), Fingerprint::of(&b));
        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&c));
    }

    #[test]
    fn test_empty_and_malformed_content() {
        let empty = Content::new();
        let odd = content(json!({"spec": "not-an-object", "severity": null}));

        assert_eq!(Fingerprint::of(&empty).as_str().len(), 64);
        assert_eq!(Fingerprint::of(&odd).as_str().len(), 64);
        assert_ne!(Fingerprint::of(&empty), Fingerprint::of(&odd));
    }

    #[test]
    fn test_string_and_number_are_distinct() {
        let a = content(json!({"severity": "1"}));
        let b = content(json!({"severity": 1}));

        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }

    #[test]
    fn test_array_order_matters() {
        let a = content(json!({"details": {"cves": ["CVE-1", "CVE-2"]}}));
        let b = content(json!({"details": {"cves": ["CVE-2", "CVE-1"]}}));

        assert_ne!(Fingerprint::of(&a), Fingerprint::of(&b));
    }
}
