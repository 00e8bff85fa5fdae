//! # Signing Protocol
//!
//! Rejections never change an attestation, role checks come from the
//! template, and concurrent signers on one attestation neither lose nor
//! duplicate signatures.

use std::sync::Arc;

use attest_audit::AuditTrail;
use attest_core::ContentDigest;
use attest_crypto::{Ed25519KeyPair, Ed25519Verifier, KeyRole};
use attest_state::{
    AttestationManager, AttestationState, FileStore, InMemoryStore, ManagerError,
    SignatureSubmission, SigningError,
};
use attest_template::TemplateRegistry;
use serde_json::{json, Value};

fn manager() -> AttestationManager {
    AttestationManager::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(TemplateRegistry::builtin().unwrap()),
        Arc::new(Ed25519Verifier),
        Arc::new(AuditTrail::new()),
    )
}

fn key(seed: u8) -> Ed25519KeyPair {
    Ed25519KeyPair::from_seed(&[seed; 32])
}

fn submission(kp: &Ed25519KeyPair, role: KeyRole, hash: &ContentDigest) -> SignatureSubmission {
    SignatureSubmission {
        pubkey: kp.public_key(),
        key_role: role,
        signer_name: "signer".into(),
        signature: kp.sign_digest(hash),
    }
}

fn license(licensor: &Ed25519KeyPair, licensee: &Ed25519KeyPair) -> Value {
    json!({
        "work_title": "Night Drive",
        "work_hash": "4e".repeat(32),
        "licensor": {"name": "Label", "pubkey": licensor.public_key()},
        "licensee": {"name": "Studio", "pubkey": licensee.public_key()},
        "territory": "worldwide",
        "term_months": 24,
        "royalty_bps": 1250,
    })
}

// ---------------------------------------------------------------------------
// 1. Rejections
// ---------------------------------------------------------------------------

#[test]
fn duplicate_signer_leaves_count_and_state_unchanged() {
    let m = manager();
    let (licensor, licensee) = (key(1), key(2));
    let a = m.create("work:night-drive", "license-grant", &license(&licensor, &licensee)).unwrap();
    m.add_signature(&a.id(), submission(&licensor, KeyRole::Contractual, &a.content_hash()))
        .unwrap();
    let before = m.get(&a.id()).unwrap();

    let err = m
        .add_signature(&a.id(), submission(&licensor, KeyRole::Financial, &a.content_hash()))
        .unwrap_err();
    assert!(matches!(err, ManagerError::Signing(SigningError::DuplicateSigner { .. })));
    assert_eq!(m.get(&a.id()).unwrap(), before);
}

#[test]
fn role_outside_template_set_is_a_mismatch() {
    let m = manager();
    let (licensor, licensee) = (key(1), key(2));
    let a = m.create("w", "license-grant", &license(&licensor, &licensee)).unwrap();
    let err = m
        .add_signature(&a.id(), submission(&licensee, KeyRole::Identity, &a.content_hash()))
        .unwrap_err();
    match err {
        ManagerError::Signing(SigningError::RoleMismatch { expected, actual }) => {
            let mut accepted = vec![KeyRole::Contractual, KeyRole::Financial];
            accepted.sort();
            assert_eq!(expected, accepted);
            assert_eq!(actual, KeyRole::Identity);
        }
        other => panic!("expected RoleMismatch, got {other}"),
    }
    assert!(m.get(&a.id()).unwrap().signatures().is_empty());
}

#[test]
fn either_accepted_role_may_be_used() {
    let m = manager();
    let (licensor, licensee) = (key(1), key(2));
    let a = m.create("w", "license-grant", &license(&licensor, &licensee)).unwrap();
    m.add_signature(&a.id(), submission(&licensor, KeyRole::Contractual, &a.content_hash()))
        .unwrap();
    let done = m
        .add_signature(&a.id(), submission(&licensee, KeyRole::Financial, &a.content_hash()))
        .unwrap();
    assert_eq!(done.state(), AttestationState::Complete);
    assert!(m.verify_all(&a.id()).unwrap().is_sound());
}

#[test]
fn signature_over_other_content_is_invalid() {
    let m = manager();
    let (licensor, licensee) = (key(1), key(2));
    let a = m.create("w", "license-grant", &license(&licensor, &licensee)).unwrap();
    let b = m.create("w2", "license-grant", &license(&licensor, &licensee)).unwrap();
    assert_ne!(a.content_hash(), b.content_hash());

    let err = m
        .add_signature(&a.id(), submission(&licensor, KeyRole::Contractual, &b.content_hash()))
        .unwrap_err();
    assert!(matches!(err, ManagerError::Signing(SigningError::InvalidSignature { .. })));
    assert_eq!(m.audit_events(&a.id()).len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_signers_with_duplicates_on_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let m = AttestationManager::new(
        Arc::new(FileStore::open(dir.path()).unwrap()),
        Arc::new(TemplateRegistry::builtin().unwrap()),
        Arc::new(Ed25519Verifier),
        Arc::new(AuditTrail::new()),
    );
    let witnesses: Vec<Ed25519KeyPair> = (1..=6).map(key).collect();
    let list: Vec<Value> = witnesses
        .iter()
        .map(|w| json!({"name": "witness", "pubkey": w.public_key()}))
        .collect();
    let a = m
        .create(
            "doc:board-minutes",
            "witnessed-statement",
            &json!({
                "title": "Board minutes",
                "document_hash": "77".repeat(32),
                "statement": "Resolution 4 passed.",
                "witnesses": list,
                "quorum": 6,
            }),
        )
        .unwrap();
    let id = a.id();
    let hash = a.content_hash();

    // Every witness submits twice from two threads.
    let results: Vec<Result<_, ManagerError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = witnesses
            .iter()
            .chain(witnesses.iter())
            .map(|w| {
                let m = &m;
                scope.spawn(move || m.add_signature(&id, submission(w, KeyRole::Identity, &hash)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 6);
    for r in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(
            r,
            ManagerError::Signing(SigningError::DuplicateSigner { .. })
                | ManagerError::Signing(SigningError::NotInSigningState { .. })
        ));
    }

    let done = m.get(&id).unwrap();
    assert_eq!(done.state(), AttestationState::Complete);
    assert_eq!(done.signatures().len(), 6);
    let seqs: Vec<u64> = m.audit_events(&id).iter().map(|e| e.sequence_no).collect();
    assert_eq!(seqs, (0..8).collect::<Vec<_>>());
    assert!(m.verify_audit(&id).is_ok());
}

#[test]
fn independent_attestations_sign_in_parallel() {
    let m = manager();
    let pairs: Vec<(Ed25519KeyPair, Ed25519KeyPair)> =
        (0..4u8).map(|i| (key(20 + i), key(40 + i))).collect();
    let created: Vec<_> = pairs
        .iter()
        .map(|(a, b)| m.create("w", "license-grant", &license(a, b)).unwrap())
        .collect();

    std::thread::scope(|scope| {
        for (att, (licensor, licensee)) in created.iter().zip(&pairs) {
            let m = &m;
            scope.spawn(move || {
                m.add_signature(&att.id(), submission(licensor, KeyRole::Contractual, &att.content_hash()))
                    .unwrap();
                m.add_signature(&att.id(), submission(licensee, KeyRole::Contractual, &att.content_hash()))
                    .unwrap();
            });
        }
    });

    for att in &created {
        assert_eq!(m.get(&att.id()).unwrap().state(), AttestationState::Complete);
        assert_eq!(m.audit_events(&att.id()).len(), 4);
    }
}
