use std::collections::BTreeSet;
use std::net::IpAddr;

use bon::Builder;
use const_oid::ObjectIdentifier;
use const_oid::db::rfc4519::{COMMON_NAME, COUNTRY_NAME, ORGANIZATION_NAME};
use der::Tag;
use der::asn1::{Any, PrintableStringRef, SetOfVec};
use serde::{Deserialize, Serialize};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::error::{Result, RootCaError};
use crate::key::PublicKey;

/// Issuance policy for a self-signed CA certificate.
///
/// ```
/// use rootca::cert::params::CertificateConfig;
///
/// let config: CertificateConfig = CertificateConfig::from_json(
///     r#"{"country": "US", "common_name": "test-ca", "organisation": ["Acme"]}"#,
/// ).unwrap();
/// assert_eq!(config.organization, vec!["Acme".to_string()]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Builder, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Two-letter country code (C).
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Common name (CN).
    #[builder(into)]
    pub common_name: String,
    /// Organization names (O), one attribute each.
    #[builder(default)]
    #[serde(default, alias = "organisation")]
    pub organization: Vec<String>,
    /// Additional subject alternative names besides the host.
    #[builder(default)]
    #[serde(default)]
    pub alt_names: AltNames,
    /// Extended key usages; omitted from the certificate when empty.
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub usages: Vec<ExtendedKeyUsageOption>,
}

/// Alternate identities placed in the subject alternative name extension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltNames {
    #[serde(default)]
    pub dns_names: BTreeSet<String>,
    #[serde(default)]
    pub ips: BTreeSet<IpAddr>,
}

impl CertificateConfig {
    /// Loads a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RootCaError::DecodingError(e.to_string()))
    }

    /// Checks the subject fields.
    ///
    /// The common name must be non-empty and the country, when present, must
    /// be two ASCII letters.
    pub fn validate(&self) -> Result<()> {
        if self.common_name.trim().is_empty() {
            return Err(RootCaError::TemplateInvalid(
                "common name must not be empty".to_string(),
            ));
        }
        if let Some(country) = &self.country {
            if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(RootCaError::TemplateInvalid(format!(
                    "country must be a two-letter code, got {country:?}"
                )));
            }
        }
        Ok(())
    }

    /// The subject (and, for self-signed certificates, issuer) name.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName {
            country: self.country.clone(),
            common_name: self.common_name.clone(),
            organization: self.organization.clone(),
        }
    }
}

/// Parameters for building an X.509 certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `alt_names` - DNS names and IP addresses for the SAN extension.
/// * `usages` - A list of extended key usage options.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub alt_names: super::extensions::SubjectAltName,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<ExtensionParam>,
}

/// Distinguished name of a certificate subject or issuer.
///
/// # Fields
/// * `country` - The country (C), encoded as a PrintableString.
/// * `common_name` - The common name (CN).
/// * `organization` - The organizations (O), in order.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub common_name: String,
    #[builder(default)]
    pub organization: Vec<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 `Name`.
    ///
    /// Attributes are ordered C, O..., CN; absent or empty values are omitted.
    pub fn as_x509_name(&self) -> Result<Name> {
        let mut rdns = Vec::new();
        if let Some(country) = self.country.as_deref().filter(|c| !c.is_empty()) {
            PrintableStringRef::new(country).map_err(|e| {
                RootCaError::TemplateInvalid(format!("country {country:?}: {e}"))
            })?;
            rdns.push(single_attribute(COUNTRY_NAME, Tag::PrintableString, country)?);
        }
        for organization in self.organization.iter().filter(|o| !o.is_empty()) {
            rdns.push(single_attribute(
                ORGANIZATION_NAME,
                Tag::Utf8String,
                organization,
            )?);
        }
        if !self.common_name.is_empty() {
            rdns.push(single_attribute(
                COMMON_NAME,
                Tag::Utf8String,
                &self.common_name,
            )?);
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 `Name`.
    ///
    /// Attributes other than C, O and CN are ignored.
    pub fn from_x509_name(x509dn: &Name) -> Result<Self> {
        let mut dn = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = std::str::from_utf8(attr.value.value())
                    .map_err(|e| RootCaError::DecodingError(e.to_string()))?
                    .to_string();
                match attr.oid {
                    COUNTRY_NAME => dn.country = Some(value),
                    ORGANIZATION_NAME => dn.organization.push(value),
                    COMMON_NAME => dn.common_name = value,
                    _ => {}
                }
            }
        }
        Ok(dn)
    }
}

fn single_attribute(oid: ObjectIdentifier, tag: Tag, value: &str) -> Result<RelativeDistinguishedName> {
    let value = Any::new(tag, value.as_bytes())
        .map_err(|e| RootCaError::TemplateInvalid(e.to_string()))?;
    let set = SetOfVec::try_from(vec![AttributeTypeAndValue { oid, value }])
        .map_err(|e| RootCaError::TemplateInvalid(e.to_string()))?;
    Ok(RelativeDistinguishedName(set))
}

/// Represents an X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        let value = extension.to_x509_extension_value()?;
        Ok(Self {
            oid: E::OID,
            critical,
            value,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        E::from_x509_extension_value(&self.value)
    }
}
