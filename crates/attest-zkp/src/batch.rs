//! Batch proofs: several facts proven under one shared challenge, bound
//! together by a hash over their commitment hashes.

use attest_core::{ContentDigest, Sha256Accumulator};
use serde::{Deserialize, Serialize};

use crate::bundle::ProofBundle;
use crate::commitment::{check_bundle, commit, prove, random_challenge, CommitmentSecret};
use crate::error::{ProofError, VerifyError};
use crate::quantity::Quantity;

/// One fact to prove: `value ≤ threshold` under `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fact {
    pub label: String,
    pub value: Quantity,
    pub threshold: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProof {
    pub entries: Vec<ProofBundle>,
    pub challenge: String,
    pub batch_hash: ContentDigest,
    pub overall_compliant: bool,
}

/// Commit to and prove every fact under one random challenge.
///
/// Secrets are returned in entry order for the prover to keep.
pub fn prove_batch(facts: &[Fact]) -> Result<(BatchProof, Vec<CommitmentSecret>), ProofError> {
    if facts.is_empty() {
        return Err(ProofError::EmptyBatch);
    }
    let challenge = random_challenge();
    let mut entries = Vec::with_capacity(facts.len());
    let mut secrets = Vec::with_capacity(facts.len());
    for fact in facts {
        let (commitment, secret) = commit(fact.value, fact.threshold, &fact.label)?;
        let proof = prove(&commitment, &secret, Some(&challenge))?;
        entries.push(ProofBundle::new(&commitment, &proof));
        secrets.push(secret);
    }
    let batch_hash = batch_hash(&entries);
    let overall_compliant = entries.iter().all(|e| e.claimed_compliant);
    Ok((
        BatchProof {
            entries,
            challenge,
            batch_hash,
            overall_compliant,
        },
        secrets,
    ))
}

/// Re-check every entry, the shared challenge, the batch hash and the
/// aggregate claim.
pub fn check_batch(batch: &BatchProof, strict: bool) -> Result<(), VerifyError> {
    if batch.entries.is_empty() {
        return Err(VerifyError::Malformed("batch has no entries".into()));
    }
    for (index, entry) in batch.entries.iter().enumerate() {
        check_bundle(entry, strict).map_err(|e| VerifyError::BatchEntry {
            index,
            source: Box::new(e),
        })?;
        if entry.challenge != batch.challenge {
            return Err(VerifyError::ChallengeMismatch { index });
        }
    }
    if batch_hash(&batch.entries) != batch.batch_hash {
        return Err(VerifyError::BatchHashMismatch);
    }
    if batch.entries.iter().all(|e| e.claimed_compliant) != batch.overall_compliant {
        return Err(VerifyError::AggregateMismatch);
    }
    Ok(())
}

pub fn verify_batch(batch: &BatchProof) -> bool {
    check_batch(batch, false).is_ok()
}

fn batch_hash(entries: &[ProofBundle]) -> ContentDigest {
    let mut acc = Sha256Accumulator::new();
    for e in entries {
        acc.update_digest(&e.commitment_hash);
    }
    acc.finalize()
}
