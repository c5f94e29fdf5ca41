use der::Encode;
use sha1::{Digest, Sha1};

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage, KeyUsages,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificationRequestInfo, DistinguishedName, ExtensionParam};
use crate::error::{Result, RootCaError};
use crate::key::{KeyPair, PublicKey};
use crate::sequencer::SerialNumber;
use crate::tbs_certificate::CertificateTemplate;
use crate::validity::ValidityWindow;

/// Represents an entity capable of issuing certificates.
///
/// A self-signed CA issues with its own key and name; an intermediate or leaf
/// issuer would implement this trait over a loaded CA certificate and key.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> &DistinguishedName;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// # Arguments
    /// * `cert_request` - The subject, public key and requested extensions.
    /// * `serial_number` - The serial to place in the certificate.
    /// * `validity` - The `notBefore`/`notAfter` window.
    ///
    /// # Errors
    /// `TemplateInvalid` if a field cannot be encoded, `SignatureFailed` if
    /// signing fails.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        serial_number: SerialNumber,
        validity: &ValidityWindow,
    ) -> Result<Certificate> {
        let signing_key = self.signing_key();
        let signature_algorithm = signing_key.signature_algorithm();

        let basic_constraints = BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: None,
        };

        let key_usage = if cert_request.is_ca {
            KeyUsage::certificate_authority()
        } else {
            KeyUsage(KeyUsages::DigitalSignature | KeyUsages::KeyEncipherment)
        };

        let mut extensions: Vec<ExtensionParam> = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(key_usage, true)?,
            ExtensionParam::from_extension(
                SubjectKeyIdentifier(key_identifier(&cert_request.subject_public_key)?),
                false,
            )?,
            ExtensionParam::from_extension(
                AuthorityKeyIdentifier {
                    key_identifier: key_identifier(&signing_key.public_key())?,
                },
                false,
            )?,
        ];

        if !cert_request.alt_names.is_empty() {
            extensions.push(ExtensionParam::from_extension(
                cert_request.alt_names.clone(),
                false,
            )?);
        }

        if !cert_request.usages.is_empty() {
            let extended_key_usage = ExtendedKeyUsage {
                usage: cert_request.usages.clone(),
            };
            extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
        }

        extensions.extend(cert_request.extensions.iter().cloned());

        let template = CertificateTemplate {
            serial_number,
            signature_algorithm,
            issuer: self.issuer_name().clone(),
            validity: *validity,
            subject: cert_request.subject.clone(),
            subject_public_key: cert_request.subject_public_key.clone(),
            extensions,
        };

        let tbs_certificate = template.to_tbs_certificate()?;
        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| RootCaError::TemplateInvalid(e.to_string()))?;
        let signature = signing_key.sign_data(&tbs_der)?;

        let inner = x509_cert::Certificate {
            tbs_certificate,
            signature_algorithm: signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&signature)
                .map_err(|e| RootCaError::SignatureFailed(e.to_string()))?,
        };

        Ok(Certificate { inner })
    }
}

/// SHA-1 over the subject public key bits (RFC 5280, 4.2.1.2, method 1).
fn key_identifier(public_key: &PublicKey) -> Result<Vec<u8>> {
    let spki = public_key
        .to_spki()
        .map_err(|e| RootCaError::TemplateInvalid(e.to_string()))?;
    Ok(Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::random::SeededRandom;
    use crate::validity::{ValidityUnit, ValidityWindow};

    struct TestAuthority {
        name: DistinguishedName,
        key: KeyPair,
    }

    impl Issuer for TestAuthority {
        fn issuer_name(&self) -> &DistinguishedName {
            &self.name
        }

        fn signing_key(&self) -> &KeyPair {
            &self.key
        }
    }

    #[test]
    fn test_issue_leaf_from_authority() {
        let authority = TestAuthority {
            name: DistinguishedName::builder().common_name("authority").build(),
            key: KeyPair::generate_ecdsa_p256(&SeededRandom::new(21)).unwrap(),
        };
        let leaf_key = KeyPair::generate_ecdsa_p256(&SeededRandom::new(22)).unwrap();
        let request = CertificationRequestInfo::builder()
            .subject(DistinguishedName::builder().common_name("leaf").build())
            .subject_public_key(leaf_key.public_key())
            .build();
        let window =
            ValidityWindow::compute(1, ValidityUnit::Week, datetime!(2025-01-01 00:00:00 UTC))
                .unwrap();

        let cert = authority
            .issue(&request, SerialNumber::new(9), &window)
            .unwrap();

        assert_eq!(cert.issuer().unwrap().common_name, "authority");
        assert_eq!(cert.subject().unwrap().common_name, "leaf");
        assert!(!cert.is_ca().unwrap());
        assert!(cert.extension::<crate::cert::extensions::SubjectAltName>().unwrap().is_none());

        let key_usage = cert.key_usage().unwrap().unwrap();
        assert!(!key_usage.contains(KeyUsages::KeyCertSign));
        assert!(key_usage.contains(KeyUsages::DigitalSignature));

        let (_, aki) = cert.extension::<AuthorityKeyIdentifier>().unwrap().unwrap();
        assert_eq!(
            aki.key_identifier,
            key_identifier(&authority.key.public_key()).unwrap()
        );

        assert!(cert.verify_signature(&authority.key.public_key()).is_ok());
        assert!(cert.verify_self_signed().is_err());
    }
}
