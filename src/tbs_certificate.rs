use std::time::SystemTime;

use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::TbsCertificate;
use x509_cert::Version;
use x509_cert::serial_number::SerialNumber as X509SerialNumber;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::params::{DistinguishedName, ExtensionParam};
use crate::error::{Result, RootCaError};
use crate::key::PublicKey;
use crate::sequencer::SerialNumber;
use crate::validity::ValidityWindow;

/// First year that must be encoded as GeneralizedTime (RFC 5280, 4.1.2.5).
const GENERALIZED_TIME_FROM_YEAR: i32 = 2050;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity window.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Additional X.509 extensions for the certificate.
pub struct CertificateTemplate {
    pub serial_number: SerialNumber,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: DistinguishedName,
    pub validity: ValidityWindow,
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl CertificateTemplate {
    /// Converts the template into the `x509-cert` TBS structure for DER encoding.
    ///
    /// # Errors
    /// `TemplateInvalid` when a field cannot be represented.
    pub fn to_tbs_certificate(&self) -> Result<TbsCertificate> {
        let invalid = |field: &str, e: der::Error| {
            RootCaError::TemplateInvalid(format!("{field}: {e}"))
        };

        let extensions = self
            .extensions
            .iter()
            .map(|ext| -> Result<x509_cert::ext::Extension> {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())
                        .map_err(|e| invalid("extension", e))?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: encode_time(self.validity.since()).map_err(|e| invalid("not before", e))?,
            not_after: encode_time(self.validity.till()).map_err(|e| invalid("not after", e))?,
        };

        let serial_number = X509SerialNumber::new(&self.serial_number.to_be_bytes())
            .map_err(|e| invalid("serial number", e))?;

        let subject_public_key_info = self
            .subject_public_key
            .to_spki()
            .map_err(|e| RootCaError::TemplateInvalid(e.to_string()))?;

        Ok(TbsCertificate {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.clone().into(),
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        })
    }
}

/// Encodes `instant` as UTCTime before 2050 and GeneralizedTime afterwards.
/// Sub-second precision is dropped.
fn encode_time(instant: OffsetDateTime) -> der::Result<Time> {
    let system_time = SystemTime::from(instant);
    if instant.year() < GENERALIZED_TIME_FROM_YEAR {
        UtcTime::from_system_time(system_time).map(Time::UtcTime)
    } else {
        GeneralizedTime::from_system_time(system_time).map(Time::GeneralTime)
    }
}

/// Reads a certificate time back into an `OffsetDateTime`.
pub(crate) fn decode_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}
