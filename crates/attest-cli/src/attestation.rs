//! # Attestation Subcommands
//!
//! `create`, `sign`, `verify`, `export`, `render` and `list`. Handlers
//! that mutate go through [`Context`], which persists the attestation and
//! its audit chain together under the id lock.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use attest_core::AttestationId;
use attest_crypto::{Ed25519Verifier, KeyRole};
use attest_state::{AttestationExport, SignatureSubmission};
use clap::Args;
use serde_json::Value;

use crate::context::Context;
use crate::keys::KeyFile;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Template action, e.g. `publishing-split`.
    #[arg(long)]
    pub action: String,

    /// What the attestation is about, e.g. `song:blue-hour`.
    #[arg(long)]
    pub subject: String,

    /// JSON file with the template fields, or `-` for stdin.
    #[arg(long)]
    pub fields: PathBuf,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    #[arg(long)]
    pub id: AttestationId,

    /// Key file produced by `attest keygen`.
    #[arg(long)]
    pub key: PathBuf,

    /// Display name recorded with the signature.
    #[arg(long)]
    pub name: String,

    /// Override the role recorded in the key file.
    #[arg(long)]
    pub role: Option<KeyRole>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct VerifyArgs {
    /// Re-verify a stored attestation.
    #[arg(long)]
    pub id: Option<AttestationId>,

    /// Check an exported attestation file offline.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    #[arg(long)]
    pub id: AttestationId,

    /// Write to a file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RenderArgs {
    #[arg(long)]
    pub id: AttestationId,
}

pub fn run_create(args: &CreateArgs, ctx: &Context) -> Result<u8> {
    let fields = read_json(&args.fields)?;
    let attestation = ctx.create(&args.subject, &args.action, &fields)?;
    println!("{}", attestation.id());
    println!("content_hash: {}", attestation.content_hash());
    println!("state: {}", attestation.state());
    Ok(0)
}

pub fn run_sign(args: &SignArgs, ctx: &Context) -> Result<u8> {
    let key_file = KeyFile::read(&args.key)?;
    let keypair = key_file.keypair()?;
    let current = ctx.manager().get(&args.id)?;

    let submission = SignatureSubmission {
        pubkey: keypair.public_key(),
        key_role: args.role.unwrap_or(key_file.role),
        signer_name: args.name.clone(),
        signature: keypair.sign_digest(&current.content_hash()),
    };
    let updated = ctx.sign(&args.id, submission)?;

    println!(
        "OK: {} signatures, state {}",
        updated.signatures().len(),
        updated.state()
    );
    if let Some(anchor) = updated.anchor_hash() {
        println!("anchor_hash: {anchor}");
    }
    Ok(0)
}

/// Exit code 0 when everything verifies, 2 otherwise.
pub fn run_verify(args: &VerifyArgs, ctx: &Context) -> Result<u8> {
    let sound = match (&args.id, &args.export) {
        (Some(id), _) => {
            let report = ctx.manager().verify_all(id)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            report.is_sound()
        }
        (None, Some(path)) => {
            let export: AttestationExport = serde_json::from_value(read_json(path)?)
                .with_context(|| format!("{} is not an attestation export", path.display()))?;
            let check = export.check(&Ed25519Verifier)?;
            println!("{}", serde_json::to_string_pretty(&check)?);
            check.is_sound()
        }
        (None, None) => bail!("one of --id or --export is required"),
    };
    Ok(if sound { 0 } else { 2 })
}

pub fn run_export(args: &ExportArgs, ctx: &Context) -> Result<u8> {
    let export = ctx.manager().export(&args.id)?;
    let json = serde_json::to_string_pretty(&export)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(attestation_id = %args.id, path = %path.display(), "exported");
        }
        None => println!("{json}"),
    }
    Ok(0)
}

pub fn run_render(args: &RenderArgs, ctx: &Context) -> Result<u8> {
    print!("{}", ctx.manager().render(&args.id)?);
    Ok(0)
}

pub fn run_list(ctx: &Context) -> Result<u8> {
    for id in ctx.manager().list()? {
        let a = ctx.manager().get(&id)?;
        println!(
            "{id}  {:<20} {:<9} {}/{} signatures  {}",
            a.action(),
            a.state(),
            a.signatures().len(),
            a.policy().rule.required_count(),
            a.subject()
        );
    }
    Ok(0)
}

pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}
