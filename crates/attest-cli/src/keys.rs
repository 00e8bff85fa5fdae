//! # Keygen Subcommand
//!
//! Local stand-in for an external signer: generates an Ed25519 key pair for
//! one [`KeyRole`] and stores it as a JSON key file. `attest sign` reads the
//! file to sign an attestation's content hash.

use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use attest_crypto::{Ed25519KeyPair, Ed25519PublicKey, KeyRole};
use clap::Args;
use serde::{Deserialize, Serialize};

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Role the key is used in (identity, financial, contractual, property, privacy).
    #[arg(long)]
    pub role: KeyRole,

    /// Output key file.
    #[arg(long)]
    pub out: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// On-disk key file. Holds the secret seed in hex.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyFile {
    pub role: KeyRole,
    pub public_key: Ed25519PublicKey,
    pub secret_seed: String,
}

impl KeyFile {
    pub fn new(role: KeyRole, keypair: &Ed25519KeyPair) -> Self {
        Self {
            role,
            public_key: keypair.public_key(),
            secret_seed: keypair.seed_hex(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading key file {}", path.display()))?;
        let file: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing key file {}", path.display()))?;
        Ok(file)
    }

    /// The key pair, checked against the recorded public key.
    pub fn keypair(&self) -> Result<Ed25519KeyPair> {
        let keypair = Ed25519KeyPair::from_seed_hex(&self.secret_seed)?;
        ensure!(
            keypair.public_key() == self.public_key,
            "key file public key does not match its secret seed"
        );
        Ok(keypair)
    }
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    if args.out.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", args.out.display());
    }
    let keypair = Ed25519KeyPair::generate();
    let file = KeyFile::new(args.role, &keypair);
    let json = serde_json::to_string_pretty(&file)?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&args.out, json)
        .with_context(|| format!("writing key file {}", args.out.display()))?;
    tracing::info!(role = %args.role, public_key = %file.public_key, "key generated");
    println!("{}", file.public_key);
    Ok(0)
}
