//! # Raw Credential Fields
//!
//! The ingestion model for a credential as upstream systems present it:
//! references may arrive as bare identifier strings or as embedded objects,
//! dates as arbitrary RFC 3339 renderings, and module lists with
//! duplicates. Everything here is pre-normalization input.

use serde::{Deserialize, Serialize};

/// A reference to an external entity (learner, institute, course).
///
/// Upstream documents embed referenced entities inconsistently: sometimes a
/// bare identifier string, sometimes the full object. Only the stable
/// identifier participates in hashing, so metadata changes on the
/// referenced entity never change an issued credential's artifact hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityRef {
    /// A bare identifier string.
    Id(String),
    /// An embedded object carrying the identifier plus arbitrary metadata.
    Embedded {
        /// The stable identifier, when present.
        #[serde(default)]
        id: Option<String>,
        /// Everything else the upstream document embedded; ignored by
        /// normalization.
        #[serde(flatten)]
        metadata: serde_json::Map<String, serde_json::Value>,
    },
}

impl EntityRef {
    /// The stable identifier this reference normalizes to, if any.
    pub fn stable_id(&self) -> Option<&str> {
        match self {
            EntityRef::Id(s) => Some(s),
            EntityRef::Embedded { id, .. } => id.as_deref(),
        }
    }
}

/// A credential's raw semantic fields, as submitted for issuance or
/// presented for verification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CredentialFields {
    /// Issuer-assigned certificate identifier.
    #[serde(default)]
    pub certificate_id: Option<String>,
    /// The learner the credential was awarded to.
    #[serde(default)]
    pub learner: Option<EntityRef>,
    /// The institute that issued the credential.
    #[serde(default)]
    pub institute: Option<EntityRef>,
    /// The course the credential covers.
    #[serde(default)]
    pub course: Option<EntityRef>,
    /// When the credential was issued (any RFC 3339 rendering).
    #[serde(default)]
    pub issued_on: Option<String>,
    /// When the course was completed (any RFC 3339 rendering).
    #[serde(default)]
    pub completed_on: Option<String>,
    /// Final grade, as a string (floats are rejected at canonicalization).
    #[serde(default)]
    pub grade: Option<String>,
    /// Names of modules awarded; may contain duplicates and stray whitespace.
    #[serde(default)]
    pub modules_awarded: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_id_ref() {
        let r: EntityRef = serde_json::from_str("\"learner-001\"").unwrap();
        assert_eq!(r.stable_id(), Some("learner-001"));
    }

    #[test]
    fn embedded_ref_with_metadata() {
        let r: EntityRef = serde_json::from_str(
            r#"{"id": "inst-42", "name": "Example Institute", "country": "NL"}"#,
        )
        .unwrap();
        assert_eq!(r.stable_id(), Some("inst-42"));
    }

    #[test]
    fn embedded_ref_without_id() {
        let r: EntityRef = serde_json::from_str(r#"{"name": "orphan object"}"#).unwrap();
        assert_eq!(r.stable_id(), None);
    }

    #[test]
    fn fields_deserialize_with_everything_absent() {
        let fields: CredentialFields = serde_json::from_str("{}").unwrap();
        assert!(fields.certificate_id.is_none());
        assert!(fields.learner.is_none());
        assert!(fields.modules_awarded.is_empty());
    }

    #[test]
    fn fields_deserialize_full_document() {
        let fields: CredentialFields = serde_json::from_str(
            r#"{
                "certificate_id": "CERT-2026-0001",
                "learner": {"id": "learner-001", "email": "a@example.org"},
                "institute": "inst-42",
                "course": {"id": "course-7", "title": "Distributed Systems"},
                "issued_on": "2026-03-01T09:00:00+01:00",
                "completed_on": "2026-02-20T00:00:00Z",
                "grade": "A",
                "modules_awarded": ["Consensus", "Consensus", " Storage "]
            }"#,
        )
        .unwrap();
        assert_eq!(fields.learner.as_ref().unwrap().stable_id(), Some("learner-001"));
        assert_eq!(fields.institute.as_ref().unwrap().stable_id(), Some("inst-42"));
        assert_eq!(fields.modules_awarded.len(), 3);
    }
}
