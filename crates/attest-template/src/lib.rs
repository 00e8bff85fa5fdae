//! # attest-template — Contract Templates
//!
//! - [`fields`]: the closed set of contract schemas ([`ContractFields`]) and
//!   their validation.
//! - [`policy`]: [`SigningPolicy`] and [`SignerRule`], derived from a
//!   template and validated fields.
//! - [`registry`]: the immutable [`TemplateRegistry`], loaded from YAML or
//!   from the built-in set, and contract-text rendering.
//!
//! There is no global template table. Callers build a registry and share
//! it with `Arc<TemplateRegistry>`, so tests can run against alternate sets.

pub mod error;
pub mod fields;
pub mod policy;
pub mod registry;

pub use error::{RegistryError, ValidationError};
pub use fields::{ContractFields, ContractKind, Party, SplitParty};
pub use policy::{SignerRule, SigningPolicy};
pub use registry::{ContractTemplate, TemplateRegistry};
