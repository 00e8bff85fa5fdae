//! # attest-cli — Attestation Engine Command-Line Interface
//!
//! ## Subcommands
//!
//! - `attest keygen`: Ed25519 key file for one key role.
//! - `attest create | sign | verify | export | render | list`: attestation
//!   lifecycle against the local data directory.
//! - `attest audit show | verify`: audit chain inspection.
//! - `attest publish`: drain pending audit events to a ledger directory.
//! - `attest prove | verify-proof`: privacy commitment proofs.
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from handlers; handlers return an exit
//!   code and delegate to the domain crates.
//! - Exit codes: 0 success, 1 error, 2 verification failed, 3 events left
//!   pending after a publish pass.

pub mod attestation;
pub mod audit;
pub mod config;
pub mod context;
pub mod keys;
pub mod ledger;
pub mod lock;
pub mod proof;

#[cfg(test)]
mod tests {
    use crate::attestation::*;
    use crate::audit::*;
    use crate::config::CliConfig;
    use crate::context::Context;
    use crate::keys::{run_keygen, KeyFile, KeygenArgs};
    use crate::ledger::DirectoryLedger;
    use attest_audit::{check_events, AuditEventType, PublishConfig, PublishWorker};
    use attest_core::AttestationId;
    use attest_crypto::KeyRole;
    use attest_state::{AttestationStore, FileStore, StoreError};
    use attest_template::TemplateRegistry;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    fn context(root: &Path) -> Context {
        Context::open(&config(root)).unwrap()
    }

    fn keygen(root: &Path, name: &str, role: KeyRole) -> (PathBuf, KeyFile) {
        let out = root.join(format!("{name}.key.json"));
        run_keygen(&KeygenArgs {
            role,
            out: out.clone(),
            force: false,
        })
        .unwrap();
        let file = KeyFile::read(&out).unwrap();
        (out, file)
    }

    fn config(root: &Path) -> CliConfig {
        CliConfig {
            data_dir: root.join("data"),
            templates: None,
            log_format: Default::default(),
            lock_timeout: CliConfig::DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Ownership transfer between two fresh keys. Returns the id and the
    /// seller and buyer key files.
    fn create_transfer(root: &Path) -> (AttestationId, PathBuf, PathBuf) {
        let (seller_key, seller) = keygen(root, "seller", KeyRole::Property);
        let (buyer_key, buyer) = keygen(root, "buyer", KeyRole::Property);
        let fields = root.join("fields.json");
        std::fs::write(
            &fields,
            serde_json::json!({
                "asset_title": "Lot 4",
                "asset_hash": "aa".repeat(32),
                "seller": {"name": "Sam", "pubkey": seller.public_key},
                "buyer": {"name": "Bo", "pubkey": buyer.public_key},
                "consideration": "10 BTC",
            })
            .to_string(),
        )
        .unwrap();
        let create = CreateArgs {
            action: "ownership-transfer".into(),
            subject: "asset:lot-4".into(),
            fields,
        };
        run_create(&create, &context(root)).unwrap();
        let id = context(root).manager().list().unwrap()[0];
        (id, seller_key, buyer_key)
    }

    fn sign_args(id: AttestationId, key: &Path, name: &str) -> SignArgs {
        SignArgs {
            id,
            key: key.to_path_buf(),
            name: name.into(),
            role: None,
        }
    }

    fn event_types(ctx: &Context, id: &AttestationId) -> Vec<AuditEventType> {
        ctx.read_chain(id).unwrap().iter().map(|e| e.event_type).collect()
    }

    /// Audit chain store whose writes always fail.
    struct UnwritableChains(FileStore);

    impl AttestationStore for UnwritableChains {
        fn load(&self, id: &AttestationId) -> Result<Vec<u8>, StoreError> {
            self.0.load(id)
        }

        fn save(&self, _id: &AttestationId, _bytes: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io {
                path: self.0.dir().display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn list(&self) -> Result<Vec<AttestationId>, StoreError> {
            self.0.list()
        }
    }

    #[test]
    fn full_lifecycle_across_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, buyer_key) = create_transfer(root);

        // Each step opens a fresh context, like separate CLI invocations.
        for (key, name) in [(&seller_key, "Sam"), (&buyer_key, "Bo")] {
            assert_eq!(run_sign(&sign_args(id, key, name), &context(root)).unwrap(), 0);
        }

        let ctx = context(root);
        assert_eq!(run_verify(&VerifyArgs { id: Some(id), export: None }, &ctx).unwrap(), 0);
        let events = ctx.read_chain(&id).unwrap();
        assert_eq!(events.len(), 4);
        let audit = AuditArgs {
            command: AuditCommand::Verify { id },
        };
        assert_eq!(run_audit(&audit, &ctx).unwrap(), 0);

        let export_path = root.join("export.json");
        run_export(
            &ExportArgs {
                id,
                out: Some(export_path.clone()),
            },
            &ctx,
        )
        .unwrap();
        let verify_export = VerifyArgs {
            id: None,
            export: Some(export_path),
        };
        assert_eq!(run_verify(&verify_export, &ctx).unwrap(), 0);
    }

    #[test]
    fn tampered_chain_fails_verify_and_blocks_signing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (key, file) = keygen(root, "w", KeyRole::Identity);
        let (other_key, other) = keygen(root, "w2", KeyRole::Identity);
        let fields = root.join("fields.json");
        std::fs::write(
            &fields,
            serde_json::json!({
                "title": "Minutes",
                "document_hash": "bb".repeat(32),
                "statement": "Approved",
                "witnesses": [
                    {"name": "W", "pubkey": file.public_key},
                    {"name": "X", "pubkey": other.public_key},
                ],
                "quorum": 2,
            })
            .to_string(),
        )
        .unwrap();
        let create = CreateArgs {
            action: "witnessed-statement".into(),
            subject: "doc:minutes".into(),
            fields,
        };
        run_create(&create, &context(root)).unwrap();
        let ctx = context(root);
        let id = ctx.manager().list().unwrap()[0];
        run_sign(
            &SignArgs {
                id,
                key,
                name: "W".into(),
                role: None,
            },
            &ctx,
        )
        .unwrap();

        let chain_path = root.join("data").join("audit").join(format!("{id}.json"));
        let mut chain: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&chain_path).unwrap()).unwrap();
        chain[0]["payload"]["subject"] = serde_json::json!("doc:forged");
        std::fs::write(&chain_path, chain.to_string()).unwrap();

        let ctx = context(root);
        let audit = AuditArgs {
            command: AuditCommand::Verify { id },
        };
        assert_eq!(run_audit(&audit, &ctx).unwrap(), 2);
        let sign = SignArgs {
            id,
            key: other_key,
            name: "X".into(),
            role: None,
        };
        assert!(run_sign(&sign, &ctx).is_err());
    }

    #[test]
    fn publish_attaches_receipts_and_persists_them() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let fields = root.join("fields.json");
        std::fs::write(
            &fields,
            serde_json::json!({"title": "T", "content_hash": "cc".repeat(32), "owner_name": "O"})
                .to_string(),
        )
        .unwrap();
        let create = CreateArgs {
            action: "content-registration".into(),
            subject: "doc:t".into(),
            fields,
        };
        run_create(&create, &context(root)).unwrap();

        let ctx = context(root);
        let id = ctx.manager().list().unwrap()[0];
        assert_eq!(run_publish(&PublishArgs { ledger_dir: None }, &ctx).unwrap(), 0);

        let events = context(root).read_chain(&id).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| !e.is_pending()));
        let ledger = root.join("data").join("ledger");
        assert_eq!(std::fs::read_dir(ledger).unwrap().count(), 2);

        // A second pass finds nothing pending.
        assert_eq!(run_publish(&PublishArgs { ledger_dir: None }, &context(root)).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Concurrent invocations on one data directory
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn publish_keeps_events_signed_by_a_concurrent_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, buyer_key) = create_transfer(root);

        // The publisher snapshots the chain and publishes it...
        let publisher = context(root);
        assert_eq!(publisher.load_all_chains().unwrap(), vec![id]);
        let ledger = Arc::new(DirectoryLedger::open(root.join("ledger")).unwrap());
        let worker = PublishWorker::new(Arc::clone(publisher.audit()), ledger, PublishConfig::default());
        assert_eq!(worker.drain().await.published, 1);

        // ...while another invocation signs before the receipts are written.
        assert_eq!(run_sign(&sign_args(id, &seller_key, "Sam"), &context(root)).unwrap(), 0);
        assert_eq!(publisher.merge_receipts(&id).unwrap(), 1);

        let ctx = context(root);
        assert_eq!(event_types(&ctx, &id), vec![AuditEventType::Created, AuditEventType::Signed]);
        let events = ctx.read_chain(&id).unwrap();
        assert!(!events[0].is_pending());
        assert!(events[1].is_pending());

        assert_eq!(run_sign(&sign_args(id, &buyer_key, "Bo"), &context(root)).unwrap(), 0);
        let ctx = context(root);
        assert_eq!(ctx.manager().get(&id).unwrap().signatures().len(), 2);
        assert_eq!(
            event_types(&ctx, &id),
            vec![
                AuditEventType::Created,
                AuditEventType::Signed,
                AuditEventType::Signed,
                AuditEventType::Finalized,
            ]
        );
        assert!(check_events(&id, &ctx.read_chain(&id).unwrap()).is_ok());
    }

    #[test]
    fn parallel_signers_in_separate_invocations_are_both_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, buyer_key) = create_transfer(root);

        std::thread::scope(|scope| {
            for (key, name) in [(&seller_key, "Sam"), (&buyer_key, "Bo")] {
                scope.spawn(move || {
                    assert_eq!(run_sign(&sign_args(id, key, name), &context(root)).unwrap(), 0);
                });
            }
        });

        let ctx = context(root);
        let done = ctx.manager().get(&id).unwrap();
        assert_eq!(done.signatures().len(), 2);
        let events = ctx.read_chain(&id).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].event_type, AuditEventType::Finalized);
        assert!(check_events(&id, &events).is_ok());
        assert_eq!(std::fs::read_dir(root.join("data").join("locks")).unwrap().count(), 0);
    }

    #[test]
    fn held_lock_makes_sign_wait_then_fail() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, _) = create_transfer(root);

        let holder = context(root);
        let _held = holder.lock(&id).unwrap();
        let mut short = config(root);
        short.lock_timeout = std::time::Duration::from_millis(50);
        let ctx = Context::open(&short).unwrap();
        assert!(run_sign(&sign_args(id, &seller_key, "Sam"), &ctx).is_err());
        assert!(ctx.manager().get(&id).unwrap().signatures().is_empty());
    }

    // -----------------------------------------------------------------------
    // Attestation and chain persist together
    // -----------------------------------------------------------------------

    #[test]
    fn failed_chain_write_rolls_back_the_signature() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, buyer_key) = create_transfer(root);

        let cfg = config(root);
        let broken = Context::with_stores(
            &cfg,
            Arc::new(TemplateRegistry::builtin().unwrap()),
            Arc::new(FileStore::open(cfg.data_dir.join("attestations")).unwrap()),
            Arc::new(UnwritableChains(FileStore::open(cfg.data_dir.join("audit")).unwrap())),
        );
        assert!(run_sign(&sign_args(id, &seller_key, "Sam"), &broken).is_err());

        let ctx = context(root);
        assert!(ctx.manager().get(&id).unwrap().signatures().is_empty());
        assert_eq!(event_types(&ctx, &id), vec![AuditEventType::Created]);

        // Nothing half-written blocks the retry.
        assert_eq!(run_sign(&sign_args(id, &seller_key, "Sam"), &context(root)).unwrap(), 0);
        assert_eq!(run_sign(&sign_args(id, &buyer_key, "Bo"), &context(root)).unwrap(), 0);
        let ctx = context(root);
        assert_eq!(ctx.read_chain(&id).unwrap().len(), 4);
    }

    #[test]
    fn truncated_chain_is_refused_before_signing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let (id, seller_key, buyer_key) = create_transfer(root);
        run_sign(&sign_args(id, &seller_key, "Sam"), &context(root)).unwrap();

        // Dropping the tail of a chain leaves a prefix that still verifies.
        let chain_path = root.join("data").join("audit").join(format!("{id}.json"));
        let mut events = context(root).read_chain(&id).unwrap();
        events.truncate(1);
        assert!(check_events(&id, &events).is_ok());
        std::fs::write(&chain_path, serde_json::to_vec(&events).unwrap()).unwrap();

        let err = run_sign(&sign_args(id, &buyer_key, "Bo"), &context(root)).unwrap_err();
        assert!(format!("{err:#}").contains("out of step"));
        assert_eq!(context(root).manager().get(&id).unwrap().signatures().len(), 1);
    }
}
