//! # Canonical Payload
//!
//! The fixed-shape, normalized representation of a credential that feeds
//! the artifact hash. Construction applies every normalization rule;
//! serialization through `CanonicalBytes` applies RFC 8785 key sorting and
//! compact separators.
//!
//! ## Determinism Invariant
//!
//! `canonicalize()` is a pure function of the credential's semantic
//! content. Field order in the source document, embedded-vs-bare
//! references, timezone renderings of the same instant, and duplicated or
//! unsorted module lists all collapse to one byte sequence.

use std::collections::BTreeSet;

use certseal_core::{artifact_digest, ArtifactHash, CanonicalBytes, CanonicalizationError, Timestamp};
use serde::{Deserialize, Serialize};

use crate::fields::CredentialFields;

/// Version tag baked into every canonical payload.
///
/// Bumping this changes every artifact hash, so it moves only with a
/// deliberate migration of all issued credentials.
pub const PAYLOAD_SCHEMA_VERSION: u32 = 1;

/// The normalized, fixed-shape hashing input.
///
/// Every optional field serializes as an explicit `null` when absent —
/// omitted keys would make "field missing" and "field removed"
/// indistinguishable across schema evolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPayload {
    /// Issuer-assigned certificate identifier.
    pub certificate_id: Option<String>,
    /// Stable learner identifier.
    pub learner_id: Option<String>,
    /// Stable institute identifier.
    pub institute_id: Option<String>,
    /// Stable course identifier.
    pub course_id: Option<String>,
    /// Issue instant, UTC, second precision.
    pub issued_on: Option<Timestamp>,
    /// Completion instant, UTC, second precision.
    pub completed_on: Option<Timestamp>,
    /// Final grade.
    pub grade: Option<String>,
    /// Trimmed, deduplicated, ascending-sorted module names.
    pub modules_awarded: Vec<String>,
    /// Payload schema version.
    pub schema_version: u32,
}

/// The result of canonicalizing a credential: the normalized payload, its
/// canonical JCS string, and the artifact hash over that string's UTF-8
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalArtifact {
    /// The normalized payload.
    pub payload: CanonicalPayload,
    /// The canonical JCS serialization of the payload.
    pub canonical_string: String,
    /// SHA-256 over the canonical string's UTF-8 bytes.
    pub artifact_hash: ArtifactHash,
}

/// Canonicalize a credential's raw fields.
///
/// Normalization itself is total — unparsable dates become `null`, missing
/// references become `null`, module lists collapse to a sorted set. The
/// only error path is serializer failure, which the fixed payload shape
/// (strings, timestamps, integers, nulls) cannot trigger on well-typed
/// input.
pub fn canonicalize(
    fields: &CredentialFields,
) -> Result<CanonicalArtifact, CanonicalizationError> {
    let payload = CanonicalPayload {
        certificate_id: fields.certificate_id.clone(),
        learner_id: fields
            .learner
            .as_ref()
            .and_then(|r| r.stable_id())
            .map(str::to_owned),
        institute_id: fields
            .institute
            .as_ref()
            .and_then(|r| r.stable_id())
            .map(str::to_owned),
        course_id: fields
            .course
            .as_ref()
            .and_then(|r| r.stable_id())
            .map(str::to_owned),
        issued_on: fields.issued_on.as_deref().and_then(Timestamp::normalize),
        completed_on: fields
            .completed_on
            .as_deref()
            .and_then(Timestamp::normalize),
        grade: fields.grade.clone(),
        modules_awarded: normalize_modules(&fields.modules_awarded),
        schema_version: PAYLOAD_SCHEMA_VERSION,
    };

    let bytes = CanonicalBytes::new(&payload)?;
    let artifact_hash = artifact_digest(&bytes);
    Ok(CanonicalArtifact {
        payload,
        canonical_string: bytes.into_string(),
        artifact_hash,
    })
}

/// Trim, deduplicate (case-sensitive exact match) and sort module names.
fn normalize_modules(raw: &[String]) -> Vec<String> {
    let set: BTreeSet<String> = raw.iter().map(|m| m.trim().to_owned()).collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::EntityRef;

    fn sample_fields() -> CredentialFields {
        CredentialFields {
            certificate_id: Some("CERT-2026-0001".to_string()),
            learner: Some(EntityRef::Id("learner-001".to_string())),
            institute: Some(EntityRef::Id("inst-42".to_string())),
            course: Some(EntityRef::Id("course-7".to_string())),
            issued_on: Some("2026-03-01T09:00:00Z".to_string()),
            completed_on: Some("2026-02-20T00:00:00Z".to_string()),
            grade: Some("A".to_string()),
            modules_awarded: vec!["Consensus".to_string(), "Storage".to_string()],
        }
    }

    // -----------------------------------------------------------------------
    // Determinism and order independence
    // -----------------------------------------------------------------------

    #[test]
    fn canonicalize_is_deterministic() {
        let fields = sample_fields();
        let a = canonicalize(&fields).unwrap();
        let b = canonicalize(&fields).unwrap();
        assert_eq!(a.canonical_string, b.canonical_string);
        assert_eq!(a.artifact_hash, b.artifact_hash);
    }

    #[test]
    fn source_key_order_does_not_matter() {
        let doc_a: CredentialFields = serde_json::from_str(
            r#"{"grade": "B", "certificate_id": "C-1", "learner": "l-1"}"#,
        )
        .unwrap();
        let doc_b: CredentialFields = serde_json::from_str(
            r#"{"learner": "l-1", "grade": "B", "certificate_id": "C-1"}"#,
        )
        .unwrap();
        assert_eq!(
            canonicalize(&doc_a).unwrap().artifact_hash,
            canonicalize(&doc_b).unwrap().artifact_hash
        );
    }

    #[test]
    fn canonical_string_has_sorted_keys_and_explicit_nulls() {
        let fields = CredentialFields::default();
        let artifact = canonicalize(&fields).unwrap();
        assert_eq!(
            artifact.canonical_string,
            "{\"certificate_id\":null,\"completed_on\":null,\"course_id\":null,\
             \"grade\":null,\"institute_id\":null,\"issued_on\":null,\
             \"learner_id\":null,\"modules_awarded\":[],\"schema_version\":1}"
        );
    }

    // -----------------------------------------------------------------------
    // Reference normalization
    // -----------------------------------------------------------------------

    #[test]
    fn embedded_metadata_does_not_change_hash() {
        let mut bare = sample_fields();
        bare.learner = Some(EntityRef::Id("learner-001".to_string()));

        let mut embedded = sample_fields();
        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "email".to_string(),
            serde_json::Value::String("new-address@example.org".to_string()),
        );
        metadata.insert("display_name".to_string(), serde_json::Value::String("L.".into()));
        embedded.learner = Some(EntityRef::Embedded {
            id: Some("learner-001".to_string()),
            metadata,
        });

        assert_eq!(
            canonicalize(&bare).unwrap().artifact_hash,
            canonicalize(&embedded).unwrap().artifact_hash
        );
    }

    #[test]
    fn embedded_ref_without_id_normalizes_to_null() {
        let mut fields = sample_fields();
        fields.institute = Some(EntityRef::Embedded {
            id: None,
            metadata: serde_json::Map::new(),
        });
        let artifact = canonicalize(&fields).unwrap();
        assert!(artifact.payload.institute_id.is_none());
        assert!(artifact.canonical_string.contains("\"institute_id\":null"));
    }

    // -----------------------------------------------------------------------
    // Date normalization
    // -----------------------------------------------------------------------

    #[test]
    fn timezone_renderings_of_same_instant_hash_equal() {
        let mut utc = sample_fields();
        utc.issued_on = Some("2026-03-01T09:00:00Z".to_string());

        let mut offset = sample_fields();
        offset.issued_on = Some("2026-03-01T10:00:00+01:00".to_string());

        assert_eq!(
            canonicalize(&utc).unwrap().artifact_hash,
            canonicalize(&offset).unwrap().artifact_hash
        );
    }

    #[test]
    fn unparsable_date_normalizes_to_null() {
        let mut fields = sample_fields();
        fields.completed_on = Some("sometime last spring".to_string());
        let artifact = canonicalize(&fields).unwrap();
        assert!(artifact.payload.completed_on.is_none());
        assert!(artifact.canonical_string.contains("\"completed_on\":null"));
    }

    #[test]
    fn absent_and_unparsable_dates_hash_equal() {
        let mut absent = sample_fields();
        absent.completed_on = None;
        let mut garbage = sample_fields();
        garbage.completed_on = Some("n/a".to_string());
        assert_eq!(
            canonicalize(&absent).unwrap().artifact_hash,
            canonicalize(&garbage).unwrap().artifact_hash
        );
    }

    // -----------------------------------------------------------------------
    // Module list normalization
    // -----------------------------------------------------------------------

    #[test]
    fn modules_deduplicated_and_sorted() {
        let mut fields = sample_fields();
        fields.modules_awarded = vec![
            "Storage".to_string(),
            " Consensus ".to_string(),
            "Consensus".to_string(),
            "Byzantine Fault Tolerance".to_string(),
        ];
        let artifact = canonicalize(&fields).unwrap();
        assert_eq!(
            artifact.payload.modules_awarded,
            vec!["Byzantine Fault Tolerance", "Consensus", "Storage"]
        );
    }

    #[test]
    fn module_case_is_significant() {
        let mut fields = sample_fields();
        fields.modules_awarded = vec!["consensus".to_string(), "Consensus".to_string()];
        let artifact = canonicalize(&fields).unwrap();
        assert_eq!(artifact.payload.modules_awarded.len(), 2);
    }

    #[test]
    fn module_order_does_not_change_hash() {
        let mut forward = sample_fields();
        forward.modules_awarded = vec!["A".to_string(), "B".to_string()];
        let mut reversed = sample_fields();
        reversed.modules_awarded = vec!["B".to_string(), "A".to_string()];
        assert_eq!(
            canonicalize(&forward).unwrap().artifact_hash,
            canonicalize(&reversed).unwrap().artifact_hash
        );
    }

    // -----------------------------------------------------------------------
    // Totality
    // -----------------------------------------------------------------------

    #[test]
    fn empty_input_produces_a_hash() {
        let artifact = canonicalize(&CredentialFields::default()).unwrap();
        assert_eq!(artifact.artifact_hash.to_hex().len(), 64);
    }

    #[test]
    fn semantic_change_changes_hash() {
        let base = canonicalize(&sample_fields()).unwrap();
        let mut changed = sample_fields();
        changed.grade = Some("B".to_string());
        assert_ne!(base.artifact_hash, canonicalize(&changed).unwrap().artifact_hash);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_fields() -> impl Strategy<Value = CredentialFields> {
        (
            proptest::option::of("[A-Za-z0-9-]{1,20}"),
            proptest::option::of("[a-z0-9-]{1,16}"),
            proptest::option::of("[A-Za-z0-9 :+.TZ-]{0,30}"),
            proptest::collection::vec("[A-Za-z ]{0,12}", 0..6),
        )
            .prop_map(|(cert, learner, date, modules)| CredentialFields {
                certificate_id: cert,
                learner: learner.map(crate::fields::EntityRef::Id),
                institute: None,
                course: None,
                issued_on: date,
                completed_on: None,
                grade: None,
                modules_awarded: modules,
            })
    }

    proptest! {
        /// Canonicalization is total and deterministic over arbitrary raw
        /// fields, including garbage dates.
        #[test]
        fn total_and_deterministic(fields in arb_fields()) {
            let a = canonicalize(&fields).unwrap();
            let b = canonicalize(&fields).unwrap();
            prop_assert_eq!(a.canonical_string, b.canonical_string);
            prop_assert_eq!(a.artifact_hash, b.artifact_hash);
        }

        /// Module list permutation never changes the hash.
        #[test]
        fn module_permutation_invariant(
            mut modules in proptest::collection::vec("[A-Za-z]{1,10}", 1..6)
        ) {
            let forward = CredentialFields {
                modules_awarded: modules.clone(),
                ..CredentialFields::default()
            };
            modules.reverse();
            let reversed = CredentialFields {
                modules_awarded: modules,
                ..CredentialFields::default()
            };
            prop_assert_eq!(
                canonicalize(&forward).unwrap().artifact_hash,
                canonicalize(&reversed).unwrap().artifact_hash
            );
        }
    }
}
