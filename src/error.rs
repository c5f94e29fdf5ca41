//! Error types for certificate issuance.

use thiserror::Error;

/// Represents errors that can occur while issuing certificates.
///
/// Every failure of an issuance request is reported through exactly one of
/// these variants; nothing is retried or defaulted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RootCaError {
    /// The validity unit is not one of `d`, `w` or `y`.
    #[error("Invalid unit: {0:?}, must be one of [d, w, y]")]
    InvalidUnit(String),

    /// The validity count is not positive, or the resulting window does not fit
    /// the supported time range.
    #[error("Invalid duration: {0}, must be a positive count within the supported time range")]
    InvalidDuration(i64),

    /// The requested RSA modulus size is outside the supported range.
    #[error("Invalid key size: {0} bits")]
    InvalidKeySize(usize),

    /// Key generation failed, usually because the randomness source failed.
    #[error("Key generation error: {0}")]
    KeyGenerationFailed(String),

    /// The serial number sequence has no values left.
    #[error("Serial number sequence exhausted")]
    SequencerExhausted,

    /// The certificate template could not be constructed.
    #[error("Invalid certificate template: {0}")]
    TemplateInvalid(String),

    /// Signing the certificate failed.
    #[error("Signature error: {0}")]
    SignatureFailed(String),

    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// A signature did not verify against the given public key.
    #[error("Verification error: {0}")]
    VerificationFailed(String),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RootCaError>;

impl From<der::Error> for RootCaError {
    /// Converts a `der::Error` into a `RootCaError`.
    fn from(err: der::Error) -> Self {
        RootCaError::DecodingError(err.to_string())
    }
}

impl From<pem::PemError> for RootCaError {
    fn from(err: pem::PemError) -> Self {
        RootCaError::DecodingError(err.to_string())
    }
}
