use thiserror::Error;

/// Key and signature parsing/verification failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Malformed or invalid public/private key material.
    #[error("key error: {0}")]
    KeyError(String),

    /// Malformed signature encoding.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Signature did not verify.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Unrecognized key role name.
    #[error("unknown key role \"{0}\"")]
    UnknownRole(String),
}
