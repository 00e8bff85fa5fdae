//! # Blinded Threshold Commitments
//!
//! A toy scheme for showing `value ≤ threshold` without revealing `value`.
//! It is not zero-knowledge in any formal sense: it hides the value behind
//! a random multiplicative blinding factor and lets a verifier compare the
//! blinded pair. Replace it behind [`CommitmentScheme`](crate::CommitmentScheme)
//! with a vetted range proof before relying on it.
//!
//! ```text
//! commitment_hash = SHA256(canonical {value, threshold, label, nonce})
//! blinded(x)      = ((x + 1) · r) mod M        M = 2^127 − 1, r ∈ [1, 2^63)
//! proof_hash      = SHA256(canonical {blinded_value, blinded_threshold, challenge, nonce})
//! ```
//!
//! `x` is the value in micro-units (below 2^53), so `(x + 1) · r < 2^116`
//! never wraps modulo `M` and the blinded order equals the real order. The
//! `+ 1` keeps a zero value distinguishable from an absent one.

use attest_core::{sha256_digest, CanonicalBytes, ContentDigest, Timestamp};
use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::bundle::ProofBundle;
use crate::error::{ProofError, VerifyError};
use crate::quantity::Quantity;

/// The blinding modulus, the Mersenne prime 2^127 − 1.
pub const MODULUS: u128 = (1u128 << 127) - 1;

/// Exclusive upper bound of the blinding factor.
const BLINDING_BOUND: u64 = 1 << 63;

/// Public half of a commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub commitment_hash: ContentDigest,
    pub public_threshold: Quantity,
    pub public_label: String,
    pub created_at: Timestamp,
}

/// Private opening of a commitment. Held only by the prover; deliberately
/// not serializable.
#[derive(Clone, PartialEq, Eq)]
pub struct CommitmentSecret {
    actual_value: Quantity,
    nonce: [u8; 32],
}

impl CommitmentSecret {
    pub fn actual_value(&self) -> Quantity {
        self.actual_value
    }
}

impl std::fmt::Debug for CommitmentSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CommitmentSecret(<redacted>)")
    }
}

/// A value blinded modulo [`MODULUS`]. Serialized as a decimal string,
/// since it does not fit a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlindedValue(pub u128);

impl Serialize for BlindedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BlindedValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>().map(Self).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for BlindedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proof that the committed value relates to the threshold as claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub blinded_value: BlindedValue,
    pub blinded_threshold: BlindedValue,
    pub proof_hash: ContentDigest,
    /// Hex-encoded verifier challenge.
    pub challenge: String,
    pub claimed_compliant: bool,
}

// ---------------------------------------------------------------------------
// Commit / prove
// ---------------------------------------------------------------------------

/// Commit to `value` against a public `threshold` and `label`.
pub fn commit(
    value: Quantity,
    threshold: Quantity,
    label: &str,
) -> Result<(Commitment, CommitmentSecret), ProofError> {
    let mut nonce = [0u8; 32];
    OsRng.fill_bytes(&mut nonce);
    let secret = CommitmentSecret {
        actual_value: value,
        nonce,
    };
    let commitment = Commitment {
        commitment_hash: commitment_hash(&secret, threshold, label)?,
        public_threshold: threshold,
        public_label: label.to_string(),
        created_at: Timestamp::now(),
    };
    Ok((commitment, secret))
}

/// Produce a proof for `commitment`.
///
/// A random 32-byte challenge is drawn when none is supplied.
pub fn prove(
    commitment: &Commitment,
    secret: &CommitmentSecret,
    challenge: Option<&str>,
) -> Result<Proof, ProofError> {
    let opened = commitment_hash(secret, commitment.public_threshold, &commitment.public_label)?;
    if opened != commitment.commitment_hash {
        return Err(ProofError::SecretMismatch {
            commitment_hash: commitment.commitment_hash.to_hex(),
        });
    }

    let challenge = match challenge {
        Some(c) => {
            if !is_challenge(c) {
                return Err(ProofError::InvalidChallenge(c.to_string()));
            }
            c.to_string()
        }
        None => random_challenge(),
    };

    let r = u128::from(OsRng.gen_range(1..BLINDING_BOUND));
    let blinded_value = blind(secret.actual_value, r);
    let blinded_threshold = blind(commitment.public_threshold, r);

    let proof_hash = sha256_digest(&CanonicalBytes::new(&serde_json::json!({
        "blinded_value": blinded_value,
        "blinded_threshold": blinded_threshold,
        "challenge": challenge,
        "nonce": hex(&secret.nonce),
    }))?);

    Ok(Proof {
        blinded_value,
        blinded_threshold,
        proof_hash,
        challenge,
        claimed_compliant: secret.actual_value <= commitment.public_threshold,
    })
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

/// Structural checks plus `claimed_compliant ⇒ blinded_value ≤ blinded_threshold`.
///
/// A proof that claims non-compliance is not contradicted by this check
/// even when the blinded comparison says compliant; see [`verify_strict`].
pub fn verify(commitment: &Commitment, proof: &Proof) -> bool {
    check_bundle(&ProofBundle::new(commitment, proof), false).is_ok()
}

/// Like [`verify`], but the claim must match the blinded comparison in
/// both directions.
pub fn verify_strict(commitment: &Commitment, proof: &Proof) -> bool {
    check_bundle(&ProofBundle::new(commitment, proof), true).is_ok()
}

/// Detailed verification of an exported bundle.
pub fn check_bundle(bundle: &ProofBundle, strict: bool) -> Result<(), VerifyError> {
    if bundle.commitment_hash == ContentDigest::ZERO {
        return Err(VerifyError::Malformed("commitment_hash is zero".into()));
    }
    if bundle.proof_hash == ContentDigest::ZERO {
        return Err(VerifyError::Malformed("proof_hash is zero".into()));
    }
    if !is_challenge(&bundle.challenge) {
        return Err(VerifyError::Malformed("challenge must be non-empty hex".into()));
    }
    for (field, v) in [
        ("blinded_value", bundle.blinded_value),
        ("blinded_threshold", bundle.blinded_threshold),
    ] {
        if v.0 == 0 || v.0 >= MODULUS {
            return Err(VerifyError::BlindedOutOfRange { field });
        }
    }
    let blinded_compliant = bundle.blinded_value <= bundle.blinded_threshold;
    if bundle.claimed_compliant && !blinded_compliant {
        return Err(VerifyError::ClaimContradicted { claimed: true });
    }
    if strict && !bundle.claimed_compliant && blinded_compliant {
        return Err(VerifyError::ClaimContradicted { claimed: false });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn commitment_hash(
    secret: &CommitmentSecret,
    threshold: Quantity,
    label: &str,
) -> Result<ContentDigest, ProofError> {
    let canonical = CanonicalBytes::new(&serde_json::json!({
        "value": secret.actual_value.micros(),
        "threshold": threshold.micros(),
        "label": label,
        "nonce": hex(&secret.nonce),
    }))?;
    Ok(sha256_digest(&canonical))
}

fn blind(value: Quantity, r: u128) -> BlindedValue {
    BlindedValue(((u128::from(value.micros()) + 1) * r) % MODULUS)
}

pub(crate) fn random_challenge() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex(&bytes)
}

fn is_challenge(c: &str) -> bool {
    !c.is_empty() && c.len() % 2 == 0 && c.bytes().all(|b| b.is_ascii_hexdigit())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn honest_proofs_always_verify_strictly(
            value in 0u64..=Quantity::MAX.micros(),
            threshold in 0u64..=Quantity::MAX.micros(),
        ) {
            let v = Quantity::from_micros(value).unwrap();
            let t = Quantity::from_micros(threshold).unwrap();
            let (c, s) = commit(v, t, "prop").unwrap();
            let p = prove(&c, &s, None).unwrap();
            prop_assert_eq!(p.claimed_compliant, value <= threshold);
            prop_assert!(verify_strict(&c, &p));
        }
    }
}
