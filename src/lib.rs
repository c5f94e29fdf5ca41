//! # rootca - Self-Signed CA Certificates in Pure Rust
//!
//! rootca issues self-signed, CA-capable X.509 certificates built entirely with
//! rustcrypto libraries. Each issuance generates a fresh key pair, draws a
//! serial number from a sequencer, computes a validity window from a duration
//! such as `1y` and returns the certificate and keys as PEM text.
//!
//! ## Supported Key Types
//!
//! - **RSA**: 2048 to 8192-bit keys (4096 by default), PKCS#1 v1.5 with SHA-256
//! - **ECDSA**: P-256 with SHA-256
//!
//! ## Key Features
//!
//! - **Validity windows**: durations in days (`d`), weeks (`w`) or 365-day years (`y`)
//! - **Serial sequencing**: lock-free, strictly increasing 64-bit serials
//! - **Injectable collaborators**: clock, randomness and serial allocation
//! - **X.509 Extensions**: basic constraints, key usage, extended key usage,
//!   subject alternative names, subject and authority key identifiers
//! - **PEM output**: certificate, private key and public key
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rootca::{CertificateConfig, CertificateFactory};
//!
//! # fn main() -> Result<(), rootca::error::RootCaError> {
//! let factory = CertificateFactory::default();
//!
//! let config = CertificateConfig::builder()
//!     .country("US")
//!     .common_name("test-ca")
//!     .organization(vec!["Acme".to_string()])
//!     .build();
//!
//! let issued = factory.issue(&config, "foo.com", 1, "y")?;
//! println!("serial {}", issued.serial());
//! println!("{}", issued.certificate_pem());
//! println!("{}", issued.private_key_pem());
//! # Ok(())
//! # }
//! ```
//!
//! ### Computing a Validity Window
//!
//! ```rust
//! use rootca::validity::compute_window;
//! use time::macros::datetime;
//!
//! let window = compute_window(1, "y", datetime!(2024-01-01 00:00:00 UTC)).unwrap();
//! assert_eq!(window.till(), datetime!(2024-12-31 00:00:00 UTC));
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a distinct [`error::RootCaError`] variant:
//!
//! ```rust
//! use rootca::{error::RootCaError, validity::compute_window};
//!
//! let now = time::OffsetDateTime::now_utc();
//! match compute_window(5, "x", now) {
//!     Err(RootCaError::InvalidUnit(unit)) => println!("unknown unit {unit}"),
//!     Err(e) => println!("Other error: {}", e),
//!     Ok(window) => println!("{window:?}"),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`factory`]: End-to-end issuance of self-signed CA certificates
//! - [`sequencer`]: Serial number allocation
//! - [`validity`]: Validity units, windows and clocks
//! - [`random`]: Randomness sources for key generation
//! - [`key`]: Key generation, PEM import/export, signing and verification
//! - [`cert`]: Certificate encoding/decoding, names and extensions
//! - [`issuer`]: The certificate issuing trait
//! - [`tbs_certificate`]: Low-level certificate structure construction
//! - [`error`]: Error types

pub mod cert;
pub mod error;
pub mod factory;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod random;
pub mod sequencer;
pub mod tbs_certificate;
pub mod validity;

pub use cert::Certificate;
pub use cert::params::CertificateConfig;
pub use factory::{CertificateFactory, IssuedCertificate};
pub use key::{KeyAlgorithm, KeyPair, PublicKey};
pub use sequencer::{SerialAllocator, SerialNumber, Sequencer};
pub use validity::{ValidityUnit, ValidityWindow, compute_window};
