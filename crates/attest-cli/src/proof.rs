//! # Prove and Verify-Proof Subcommands
//!
//! `prove` commits to one or more `label=value:threshold` facts and writes
//! the proof export. With `--id` the facts are bound to a finalized
//! attestation's anchor hash. Commitment secrets are never written out.
//!
//! A single unbound fact produces a proof bundle; anything else produces a
//! batch proof. `verify-proof` accepts either shape.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Context as _, Result};
use attest_core::AttestationId;
use attest_zkp::{check_batch, check_bundle, commit, prove, prove_batch, BatchProof, Fact, ProofBundle, Quantity};
use clap::Args;
use serde_json::Value;

use crate::attestation::read_json;
use crate::context::Context;

/// `label=value:threshold`, e.g. `benzene=0.8:5.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactArg(pub Fact);

impl FromStr for FactArg {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (label, numbers) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected label=value:threshold, got `{s}`"))?;
        let (value, threshold) = numbers
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("expected label=value:threshold, got `{s}`"))?;
        let label = label.trim();
        if label.is_empty() {
            bail!("fact label must not be empty");
        }
        Ok(Self(Fact {
            label: label.to_string(),
            value: value.parse::<Quantity>()?,
            threshold: threshold.parse::<Quantity>()?,
        }))
    }
}

#[derive(Args, Debug)]
pub struct ProveArgs {
    /// Fact to prove, as `label=value:threshold`. Repeatable.
    #[arg(long = "fact", required = true)]
    pub facts: Vec<FactArg>,

    /// Bind the facts to this finalized attestation.
    #[arg(long)]
    pub id: Option<AttestationId>,

    /// Write to a file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VerifyProofArgs {
    /// Proof bundle or batch proof file.
    #[arg(long)]
    pub file: PathBuf,

    /// Also reject a non-compliance claim the blinded values contradict.
    #[arg(long)]
    pub strict: bool,
}

pub fn run_prove(args: &ProveArgs, ctx: &Context) -> Result<u8> {
    let facts: Vec<Fact> = args.facts.iter().map(|f| f.0.clone()).collect();
    let output = match (&args.id, facts.as_slice()) {
        (Some(id), _) => serde_json::to_value(ctx.manager().prove_facts(id, &facts)?.0)?,
        (None, [fact]) => {
            let (commitment, secret) = commit(fact.value, fact.threshold, &fact.label)?;
            let proof = prove(&commitment, &secret, None)?;
            serde_json::to_value(ProofBundle::new(&commitment, &proof))?
        }
        (None, _) => serde_json::to_value(prove_batch(&facts)?.0)?,
    };
    let json = serde_json::to_string_pretty(&output)?;
    match &args.out {
        Some(path) => std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(0)
}

/// Exit code 0 when the proof verifies, 2 otherwise.
pub fn run_verify_proof(args: &VerifyProofArgs) -> Result<u8> {
    let value = read_json(&args.file)?;
    let result = if is_batch(&value) {
        let batch: BatchProof = serde_json::from_value(value).context("malformed batch proof")?;
        check_batch(&batch, args.strict)
    } else {
        let bundle: ProofBundle = serde_json::from_value(value).context("malformed proof bundle")?;
        check_bundle(&bundle, args.strict)
    };
    match result {
        Ok(()) => {
            println!("OK");
            Ok(0)
        }
        Err(e) => {
            tracing::warn!(file = %args.file.display(), strict = args.strict, "proof rejected: {e}");
            println!("FAIL: {e}");
            Ok(2)
        }
    }
}

fn is_batch(value: &Value) -> bool {
    value.get("entries").is_some()
}
