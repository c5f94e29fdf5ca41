//! Self-signed CA issuance.
//!
//! [`CertificateFactory`] ties the other modules together: it computes the
//! validity window, draws a serial from its allocator, generates a fresh key
//! pair and self-signs a CA certificate described by a [`CertificateConfig`].

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use bon::Builder;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, info_span, warn};

use crate::cert::Certificate;
use crate::cert::extensions::SubjectAltName;
use crate::cert::params::{CertificateConfig, CertificationRequestInfo};
use crate::error::{Result, RootCaError};
use crate::key::{KeyAlgorithm, KeyPair};
use crate::random::{OsRandom, RandomSource};
use crate::sequencer::{SerialAllocator, SerialNumber, Sequencer};
use crate::validity::{Clock, SystemClock, ValidityUnit, ValidityWindow};

/// Issues self-signed CA certificates.
///
/// Every collaborator is injectable; the defaults are a fresh [`Sequencer`],
/// [`OsRandom`], [`SystemClock`] and RSA-4096 keys.
///
/// ```no_run
/// use rootca::cert::params::CertificateConfig;
/// use rootca::factory::CertificateFactory;
/// use rootca::key::KeyAlgorithm;
///
/// # fn main() -> rootca::error::Result<()> {
/// let factory = CertificateFactory::builder()
///     .key_algorithm(KeyAlgorithm::EcdsaP256)
///     .build();
/// let config = CertificateConfig::builder()
///     .country("US")
///     .common_name("test-ca")
///     .organization(vec!["Acme".to_string()])
///     .build();
/// let issued = factory.issue(&config, "foo.com", 1, "y")?;
/// println!("{}", issued.certificate_pem());
/// # Ok(())
/// # }
/// ```
#[derive(Builder)]
pub struct CertificateFactory {
    #[builder(default = Arc::new(Sequencer::new()) as Arc<dyn SerialAllocator>)]
    sequencer: Arc<dyn SerialAllocator>,
    #[builder(default = Arc::new(OsRandom) as Arc<dyn RandomSource>)]
    random: Arc<dyn RandomSource>,
    #[builder(default = Arc::new(SystemClock) as Arc<dyn Clock>)]
    clock: Arc<dyn Clock>,
    #[builder(default)]
    key_algorithm: KeyAlgorithm,
}

impl Default for CertificateFactory {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for CertificateFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateFactory")
            .field("key_algorithm", &self.key_algorithm)
            .finish_non_exhaustive()
    }
}

impl CertificateFactory {
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        self.key_algorithm
    }

    /// Issues a self-signed CA certificate for `host`, valid for `count`
    /// units of `unit` (`d`, `w` or `y`) starting now.
    ///
    /// # Errors
    /// * `InvalidUnit` / `InvalidDuration` for a bad validity request.
    /// * `InvalidKeySize` / `TemplateInvalid` for a bad key algorithm, config or host.
    /// * `SequencerExhausted`, `KeyGenerationFailed`, `SignatureFailed` or
    ///   `EncodingError` if issuance fails part way.
    ///
    /// Validation errors are raised before a serial is drawn.
    pub fn issue(
        &self,
        config: &CertificateConfig,
        host: &str,
        count: i64,
        unit: &str,
    ) -> Result<IssuedCertificate> {
        let unit = unit.parse::<ValidityUnit>().inspect_err(|e| {
            warn!(host, unit, error = %e, "rejected certificate request");
        })?;
        self.issue_with_unit(config, host, count, unit)
    }

    /// Same as [`CertificateFactory::issue`] with an already parsed unit.
    pub fn issue_with_unit(
        &self,
        config: &CertificateConfig,
        host: &str,
        count: i64,
        unit: ValidityUnit,
    ) -> Result<IssuedCertificate> {
        let span = info_span!("issue", host, count, unit = %unit);
        let _guard = span.enter();

        self.try_issue(config, host, count, unit).inspect_err(|e| {
            warn!(error = %e, "certificate issuance failed");
        })
    }

    fn try_issue(
        &self,
        config: &CertificateConfig,
        host: &str,
        count: i64,
        unit: ValidityUnit,
    ) -> Result<IssuedCertificate> {
        self.key_algorithm.validate()?;
        config.validate()?;
        validate_host(host)?;

        let now = truncate_to_seconds(self.clock.now());
        let validity = ValidityWindow::compute(count, unit, now)?;
        debug!(since = %validity.since(), till = %validity.till(), "computed validity window");

        let serial = self.sequencer.next_serial()?;
        debug!(%serial, "allocated serial number");

        let key_pair = KeyPair::generate(self.key_algorithm, self.random.as_ref())?;
        debug!(algorithm = ?self.key_algorithm, "generated key pair");

        let request = CertificationRequestInfo::builder()
            .subject(config.subject())
            .subject_public_key(key_pair.public_key())
            .alt_names(alt_names(config, host))
            .usages(config.usages.clone())
            .is_ca(true)
            .build();
        let certificate = Certificate::new_self_signed(&request, &key_pair, serial, &validity)?;

        let issued = IssuedCertificate {
            host: host.to_string(),
            valid_for: count,
            unit,
            serial,
            validity,
            certificate_pem: certificate.to_pem()?,
            private_key_pem: key_pair.private_key_pem()?,
            public_key_pem: key_pair.public_key_pem()?,
        };

        info!(
            %serial,
            since = %validity.since(),
            till = %validity.till(),
            "issued self-signed CA certificate"
        );
        Ok(issued)
    }
}

fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() {
        return Err(RootCaError::TemplateInvalid(
            "host must not be empty".to_string(),
        ));
    }
    if !host.is_ascii() || host.chars().any(|c| c.is_ascii_whitespace() || c.is_ascii_control()) {
        return Err(RootCaError::TemplateInvalid(format!(
            "host {host:?} is not a valid DNS name or IP address"
        )));
    }
    Ok(())
}

fn truncate_to_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    instant - Duration::nanoseconds(i64::from(instant.nanosecond()))
}

/// The host first, then the configured names, without duplicates.
fn alt_names(config: &CertificateConfig, host: &str) -> SubjectAltName {
    let mut san = SubjectAltName::default();
    match host.parse::<IpAddr>() {
        Ok(ip) => san.ip_addresses.push(ip),
        Err(_) => san.dns_names.push(host.to_string()),
    }
    for dns_name in &config.alt_names.dns_names {
        if !san.dns_names.contains(dns_name) {
            san.dns_names.push(dns_name.clone());
        }
    }
    for ip in &config.alt_names.ips {
        if !san.ip_addresses.contains(ip) {
            san.ip_addresses.push(*ip);
        }
    }
    san
}

/// The result of one issuance: the request parameters and the PEM-encoded
/// certificate and key pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedCertificate {
    host: String,
    valid_for: i64,
    unit: ValidityUnit,
    serial: SerialNumber,
    validity: ValidityWindow,
    certificate_pem: String,
    private_key_pem: String,
    public_key_pem: String,
}

impl IssuedCertificate {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The requested duration count.
    pub fn valid_for(&self) -> i64 {
        self.valid_for
    }

    pub fn unit(&self) -> ValidityUnit {
        self.unit
    }

    pub fn serial(&self) -> SerialNumber {
        self.serial
    }

    pub fn validity(&self) -> &ValidityWindow {
        &self.validity
    }

    pub fn certificate_pem(&self) -> &str {
        &self.certificate_pem
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    /// Parses the PEM certificate.
    pub fn certificate(&self) -> Result<Certificate> {
        Certificate::from_pem(&self.certificate_pem)
    }

    /// Parses the PEM private key.
    pub fn key_pair(&self) -> Result<KeyPair> {
        KeyPair::from_pem(&self.private_key_pem)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| RootCaError::EncodingError(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RootCaError::DecodingError(e.to_string()))
    }
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("host", &self.host)
            .field("valid_for", &self.valid_for)
            .field("unit", &self.unit)
            .field("serial", &self.serial)
            .field("validity", &self.validity)
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .field("public_key_pem", &self.public_key_pem)
            .finish()
    }
}
