pub mod extensions;
pub mod params;

use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{BasicConstraints, KeyUsage, SubjectAltName, ToAndFromX509Extension};
use params::{CertificationRequestInfo, DistinguishedName};

use crate::error::{Result, RootCaError};
use crate::issuer::Issuer;
use crate::key::{KeyPair, PublicKey};
use crate::sequencer::SerialNumber;
use crate::tbs_certificate::decode_time;
use crate::validity::ValidityWindow;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with RSA encryption.
    Sha256WithRSA,
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA identifiers carry explicit NULL parameters (RFC 4055); ECDSA
    /// identifiers carry none (RFC 5758).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithRSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
                parameters: Some(der::asn1::Any::null()),
            },
            SignatureAlgorithm::Sha256WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
        }
    }
}

impl SignatureAlgorithm {
    pub fn from_oid(oid: const_oid::ObjectIdentifier) -> Result<Self> {
        match oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => Ok(Self::Sha256WithRSA),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Ok(Self::Sha256WithECDSA),
            _ => Err(RootCaError::DecodingError(format!(
                "Unsupported signature algorithm {oid}"
            ))),
        }
    }
}

/// Represents an X.509 certificate.
///
/// This struct provides methods to encode the certificate into DER or PEM
/// formats and to read back the fields set at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: x509_cert::Certificate,
}

impl Certificate {
    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| RootCaError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate as a `CERTIFICATE` PEM block.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| RootCaError::EncodingError(e.to_string()))
    }

    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: x509_cert::Certificate::from_der(der)?,
        })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        Ok(Self {
            inner: x509_cert::Certificate::from_pem(pem_str)?,
        })
    }

    /// The serial number, which must fit in 64 bits.
    pub fn serial_number(&self) -> Result<SerialNumber> {
        SerialNumber::from_be_slice(self.inner.tbs_certificate.serial_number.as_bytes())
    }

    pub fn subject(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> Result<DistinguishedName> {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// The `notBefore`/`notAfter` window.
    pub fn validity(&self) -> Result<ValidityWindow> {
        let validity = &self.inner.tbs_certificate.validity;
        ValidityWindow::from_bounds(
            decode_time(&validity.not_before),
            decode_time(&validity.not_after),
        )
    }

    pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(self.inner.signature_algorithm.oid)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Decodes the extension `E`, with its criticality, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<(bool, E)>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| -> Result<(bool, E)> {
                Ok((ext.critical, E::from_x509_extension_value(ext.extn_value.as_bytes())?))
            })
            .transpose()
    }

    pub fn subject_alt_name(&self) -> Result<SubjectAltName> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|(_, san)| san)
            .unwrap_or_default())
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        Ok(self.extension::<KeyUsage>()?.map(|(_, usage)| usage))
    }

    /// Whether the basic constraints extension marks this certificate as a CA.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self
            .extension::<BasicConstraints>()?
            .is_some_and(|(_, bc)| bc.is_ca))
    }

    /// Verifies the certificate signature against `issuer_key`.
    pub fn verify_signature(&self, issuer_key: &PublicKey) -> Result<()> {
        let tbs = self.inner.tbs_certificate.to_der()?;
        issuer_key.verify(&tbs, self.inner.signature.raw_bytes())
    }

    /// Verifies that the certificate is signed by its own subject key and that
    /// issuer and subject match.
    pub fn verify_self_signed(&self) -> Result<()> {
        if self.inner.tbs_certificate.issuer != self.inner.tbs_certificate.subject {
            return Err(RootCaError::VerificationFailed(
                "issuer and subject differ".to_string(),
            ));
        }
        self.verify_signature(&self.public_key()?)
    }

    /// Creates a new self-signed certificate.
    ///
    /// # Arguments
    /// * `cert_info` - The certification request information.
    /// * `key` - The key pair whose public half is certified and whose private half signs.
    /// * `serial_number` - The certificate serial number.
    /// * `validity` - The certificate validity window.
    pub fn new_self_signed(
        cert_info: &CertificationRequestInfo,
        key: &KeyPair,
        serial_number: SerialNumber,
        validity: &ValidityWindow,
    ) -> Result<Self> {
        // For self-signed certificates, the issuer is the same as the subject
        let self_issuer = SelfIssuer {
            name: cert_info.subject.clone(),
            key,
        };
        self_issuer.issue(cert_info, serial_number, validity)
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: DistinguishedName,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> &DistinguishedName {
        &self.name
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }
}
