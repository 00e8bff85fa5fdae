//! # Publishing Split End-to-End Scenario
//!
//! Three songwriters split publishing income 50/30/20. The attestation must
//! reject splits that do not total 100, accept exactly the three listed
//! contractual keys, and finalize only when the third one signs.

use std::sync::Arc;

use attest_audit::{AuditEventType, AuditTrail};
use attest_core::{sha256_digest, CanonicalBytes};
use attest_crypto::{Ed25519KeyPair, Ed25519Verifier, KeyRole};
use attest_state::{
    anchor_hash, AttestationManager, AttestationState, InMemoryStore, ManagerError,
    SignatureSubmission, SigningError,
};
use attest_template::{TemplateRegistry, ValidationError};
use serde_json::{json, Value};

fn manager() -> AttestationManager {
    AttestationManager::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(TemplateRegistry::builtin().unwrap()),
        Arc::new(Ed25519Verifier),
        Arc::new(AuditTrail::new()),
    )
}

fn writers() -> [(Ed25519KeyPair, &'static str); 3] {
    [
        (Ed25519KeyPair::from_seed(&[11; 32]), "Ada"),
        (Ed25519KeyPair::from_seed(&[12; 32]), "Ben"),
        (Ed25519KeyPair::from_seed(&[13; 32]), "Cy"),
    ]
}

fn fields(splits: [u32; 3]) -> Value {
    let parties: Vec<Value> = writers()
        .iter()
        .zip(splits)
        .map(|((kp, name), split)| json!({"name": name, "pubkey": kp.public_key(), "split": split}))
        .collect();
    json!({
        "song_title": "Harbour Lights",
        "song_hash": sha256_digest(&CanonicalBytes::new(&"harbour-lights.wav").unwrap()).to_hex(),
        "parties": parties,
    })
}

fn submit(kp: &Ed25519KeyPair, name: &str, content_hash: &attest_core::ContentDigest) -> SignatureSubmission {
    SignatureSubmission {
        pubkey: kp.public_key(),
        key_role: KeyRole::Contractual,
        signer_name: name.into(),
        signature: kp.sign_digest(content_hash),
    }
}

// ---------------------------------------------------------------------------
// 1. Field validation
// ---------------------------------------------------------------------------

#[test]
fn splits_summing_to_95_are_rejected() {
    let m = manager();
    let err = m
        .create("song:harbour-lights", "publishing-split", &fields([50, 30, 15]))
        .unwrap_err();
    match err {
        ManagerError::Validation(ValidationError::InvalidField { field, reason }) => {
            assert_eq!(field, "parties");
            assert!(reason.contains("95"), "reason: {reason}");
        }
        other => panic!("expected InvalidField, got {other}"),
    }
    assert!(m.list().unwrap().is_empty());
}

#[test]
fn missing_and_unexpected_fields_are_both_reported() {
    let m = manager();
    let mut f = fields([50, 30, 20]);
    let obj = f.as_object_mut().unwrap();
    obj.remove("song_hash");
    obj.insert("isrc".into(), json!("US-XYZ-26-00001"));
    match m.create("s", "publishing-split", &f).unwrap_err() {
        ManagerError::Validation(ValidationError::FieldSet { missing, unexpected, .. }) => {
            assert_eq!(missing, vec!["song_hash".to_string()]);
            assert_eq!(unexpected, vec!["isrc".to_string()]);
        }
        other => panic!("expected FieldSet, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// 2. Signing to completion
// ---------------------------------------------------------------------------

#[test]
fn finalizes_only_on_third_signature() {
    let m = manager();
    let a = m
        .create("song:harbour-lights", "publishing-split", &fields([50, 30, 20]))
        .unwrap();
    assert_eq!(a.state(), AttestationState::Signing);
    let report = m.verify_all(&a.id()).unwrap();
    assert!(report.all_valid);
    assert!(!report.finalized);

    let ws = writers();
    let after_first = m.add_signature(&a.id(), submit(&ws[0].0, ws[0].1, &a.content_hash())).unwrap();
    assert_eq!(after_first.state(), AttestationState::Signing);
    let after_second = m.add_signature(&a.id(), submit(&ws[1].0, ws[1].1, &a.content_hash())).unwrap();
    assert_eq!(after_second.state(), AttestationState::Signing);
    assert!(after_second.anchor_hash().is_none());

    let done = m.add_signature(&a.id(), submit(&ws[2].0, ws[2].1, &a.content_hash())).unwrap();
    assert_eq!(done.state(), AttestationState::Complete);

    let digests: Vec<_> = done.signatures().iter().map(|s| s.digest().unwrap()).collect();
    assert_eq!(done.anchor_hash(), Some(anchor_hash(&done.content_hash(), &digests)));

    let types: Vec<_> = m.audit_events(&a.id()).iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        [
            AuditEventType::Created,
            AuditEventType::Signed,
            AuditEventType::Signed,
            AuditEventType::Signed,
            AuditEventType::Finalized,
        ]
    );

    let fourth = Ed25519KeyPair::from_seed(&[14; 32]);
    let err = m
        .add_signature(&a.id(), submit(&fourth, "Dee", &a.content_hash()))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Signing(SigningError::NotInSigningState {
            state: AttestationState::Complete
        })
    ));
}

#[test]
fn signer_matching_is_by_key_not_name() {
    let m = manager();
    let a = m.create("s", "publishing-split", &fields([50, 30, 20])).unwrap();
    let impostor = Ed25519KeyPair::from_seed(&[99; 32]);
    let err = m
        .add_signature(&a.id(), submit(&impostor, "Ada", &a.content_hash()))
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Signing(SigningError::SignerNotEligible { .. })
    ));
}

#[test]
fn rendered_text_lists_every_party() {
    let m = manager();
    let a = m.create("s", "publishing-split", &fields([50, 30, 20])).unwrap();
    let text = m.render(&a.id()).unwrap();
    assert!(text.contains("Harbour Lights"));
    for (_, name) in writers() {
        assert!(text.contains(name), "missing {name} in:\n{text}");
    }
}
