//! # attest CLI entry point
//!
//! Parses arguments, configures tracing, opens the data directory and
//! dispatches to the subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use attest_cli::attestation::{
    run_create, run_export, run_list, run_render, run_sign, run_verify, CreateArgs, ExportArgs,
    RenderArgs, SignArgs, VerifyArgs,
};
use attest_cli::audit::{run_audit, run_publish, AuditArgs, PublishArgs};
use attest_cli::config::{CliConfig, LogFormat};
use attest_cli::context::Context;
use attest_cli::keys::{run_keygen, KeygenArgs};
use attest_cli::proof::{run_prove, run_verify_proof, ProveArgs, VerifyProofArgs};

/// Multi-party attestations with a tamper-evident audit trail and
/// threshold commitment proofs.
#[derive(Parser, Debug)]
#[command(name = "attest", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Data directory (overrides ATTEST_DATA_DIR).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Template YAML file (overrides ATTEST_TEMPLATES).
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 key file for a key role.
    Keygen(KeygenArgs),

    /// Create an attestation from a template and a fields file.
    Create(CreateArgs),

    /// Sign an attestation's content hash with a key file.
    Sign(SignArgs),

    /// Re-verify a stored attestation or an exported file.
    Verify(VerifyArgs),

    /// Print or write the canonical export of an attestation.
    Export(ExportArgs),

    /// Print the contract text of an attestation.
    Render(RenderArgs),

    /// List stored attestations.
    List,

    /// Inspect and verify audit chains.
    Audit(AuditArgs),

    /// Publish pending audit events to a ledger directory.
    Publish(PublishArgs),

    /// Commit to threshold facts and produce a proof.
    Prove(ProveArgs),

    /// Verify a proof bundle or batch proof.
    VerifyProof(VerifyProofArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = CliConfig::from_env();
    let format = config.as_ref().map(|c| c.log_format).unwrap_or_default();
    init_tracing(cli.verbose, format);

    let mut config = match config {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(path) = cli.templates {
        config.templates = Some(path);
    }

    let result = dispatch(&cli.command, &config);

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn dispatch(command: &Commands, config: &CliConfig) -> anyhow::Result<u8> {
    match command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::VerifyProof(args) => run_verify_proof(args),
        Commands::Create(args) => run_create(args, &Context::open(config)?),
        Commands::Sign(args) => run_sign(args, &Context::open(config)?),
        Commands::Verify(args) => run_verify(args, &Context::open(config)?),
        Commands::Export(args) => run_export(args, &Context::open(config)?),
        Commands::Render(args) => run_render(args, &Context::open(config)?),
        Commands::List => run_list(&Context::open(config)?),
        Commands::Audit(args) => run_audit(args, &Context::open(config)?),
        Commands::Publish(args) => run_publish(args, &Context::open(config)?),
        Commands::Prove(args) => run_prove(args, &Context::open(config)?),
    }
}

/// `RUST_LOG` wins when set; otherwise verbosity picks the level.
fn init_tracing(verbose: u8, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
