//! X.509 v3 certificates with the Relaynet extension profile.
//!
//! Certificates are held as their DER encoding plus the parsed structure;
//! identity (equality, hashing) is defined over the encoding alone. Issuance
//! builds the `TBSCertificate` by hand and signs it with RSASSA-PSS/SHA-256.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::{DateTime, Utc};
use der::asn1::{BitString, GeneralizedTime, OctetString, SetOfVec, UtcTime};
use der::{Any, Decode, Encode, Tag, Tagged};
use log::debug;
use rsa::{RsaPrivateKey, RsaPublicKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use serde::{Deserialize, Serialize};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::{AuthorityKeyIdentifier, BasicConstraints, SubjectKeyIdentifier};
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate as X509Certificate, TbsCertificate, Version};

use crate::algorithms::{pss_algorithm_identifier, sign_pss, verify_pss};
use crate::error::CertificateError;
use crate::hashing::{self, HashingAlgorithm};
use crate::keys::generate_random_serial;
use crate::oids;

/// Prefix of every private node address.
pub const PRIVATE_ADDRESS_PREFIX: &str = "0";

/// Optional issuance inputs; the defaults produce an end-entity certificate
/// self-issued as of now.
#[derive(Clone, Copy, Default)]
pub struct IssuanceOptions<'a> {
    /// Start of the validity window. Defaults to the current instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Issuing CA. Absent for self-issued certificates.
    pub issuer_certificate: Option<&'a Certificate>,
    /// Whether the subject may issue certificates itself.
    pub is_ca: bool,
    /// basicConstraints pathLenConstraint; only meaningful for CAs.
    pub path_length: i32,
}

/// An immutable X.509 v3 certificate.
#[derive(Clone, Debug)]
pub struct Certificate {
    certificate: X509Certificate,
    der: Vec<u8>,
}

impl Certificate {
    /// Issue a certificate for `common_name` over `subject_public_key`,
    /// signed by `issuer_private_key`.
    ///
    /// The subject DN is a single CommonName RDN (BMPString). The extension
    /// profile is fixed: critical basicConstraints, then the authority and
    /// subject key identifiers, both SHA-256 digests of the respective
    /// SubjectPublicKeyInfo encodings.
    pub fn issue(
        common_name: &str,
        subject_public_key: &RsaPublicKey,
        issuer_private_key: &RsaPrivateKey,
        expiry_date: DateTime<Utc>,
        options: IssuanceOptions<'_>,
    ) -> Result<Self, CertificateError> {
        if !options.is_ca && options.path_length != 0 {
            return Err(CertificateError::NonCaPathLength(options.path_length));
        }
        if !(0..=2).contains(&options.path_length) {
            return Err(CertificateError::PathLengthOutOfRange(options.path_length));
        }
        let start_date = options.start_date.unwrap_or_else(Utc::now);
        if expiry_date <= start_date {
            return Err(CertificateError::InvalidValidityWindow);
        }

        let subject = single_common_name_rdn(common_name)
            .map_err(|e| CertificateError::Encoding(e.to_string()))?;
        let subject_spki_der = subject_public_key
            .to_public_key_der()
            .map_err(|e| CertificateError::InvalidPublicKey(e.to_string()))?;

        let (issuer, authority_key_digest) = match options.issuer_certificate {
            Some(issuer_certificate) => {
                let constraints_extension = issuer_certificate
                    .extension(&oids::BASIC_CONSTRAINTS)
                    .ok_or(CertificateError::IssuerWithoutBasicConstraints)?;
                let constraints =
                    BasicConstraints::from_der(constraints_extension.extn_value.as_bytes())
                        .map_err(|e| CertificateError::Encoding(e.to_string()))?;
                if !constraints.ca {
                    return Err(CertificateError::IssuerNotCa);
                }
                if issuer_certificate
                    .extension(&oids::SUBJECT_KEY_IDENTIFIER)
                    .is_none()
                {
                    return Err(CertificateError::IssuerWithoutKeyIdentifier);
                }
                let issuer_spki_der = issuer_certificate.subject_public_key_info_der()?;
                (
                    issuer_certificate.certificate.tbs_certificate.subject.clone(),
                    hashing::sha256(&issuer_spki_der),
                )
            }
            None => (subject.clone(), hashing::sha256(subject_spki_der.as_bytes())),
        };

        let subject_key_digest = hashing::sha256(subject_spki_der.as_bytes());
        let extensions = vec![
            basic_constraints_extension(options.is_ca, options.path_length as u8)?,
            authority_key_identifier_extension(&authority_key_digest)?,
            subject_key_identifier_extension(&subject_key_digest)?,
        ];

        let signature_algorithm = pss_algorithm_identifier(HashingAlgorithm::Sha256)
            .map_err(|e| CertificateError::Encoding(e.to_string()))?;
        let subject_public_key_info =
            SubjectPublicKeyInfoOwned::from_der(subject_spki_der.as_bytes())
                .map_err(|e| CertificateError::InvalidPublicKey(e.to_string()))?;

        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number: serial_number_from_u64(generate_random_serial())?,
            signature: signature_algorithm.clone(),
            issuer,
            validity: Validity {
                not_before: to_asn1_time(start_date)?,
                not_after: to_asn1_time(expiry_date)?,
            },
            subject,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions),
        };

        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| CertificateError::Encoding(e.to_string()))?;
        let signature = sign_pss(issuer_private_key, HashingAlgorithm::Sha256, &tbs_der);

        let certificate = X509Certificate {
            tbs_certificate,
            signature_algorithm,
            signature: BitString::from_bytes(&signature)
                .map_err(|e| CertificateError::Encoding(e.to_string()))?,
        };
        Self::from_x509(certificate)
    }

    fn from_x509(certificate: X509Certificate) -> Result<Self, CertificateError> {
        let der = certificate
            .to_der()
            .map_err(|e| CertificateError::Encoding(e.to_string()))?;
        Ok(Self { certificate, der })
    }

    /// Reconstruct a certificate from its DER encoding.
    pub fn deserialize(der: &[u8]) -> Result<Self, CertificateError> {
        let certificate =
            X509Certificate::from_der(der).map_err(|_| CertificateError::InvalidDer)?;
        if certificate.tbs_certificate.version != Version::V3 {
            return Err(CertificateError::InvalidDer);
        }
        Ok(Self {
            certificate,
            der: der.to_vec(),
        })
    }

    /// The DER encoding of the certificate.
    pub fn serialize(&self) -> Vec<u8> {
        self.der.clone()
    }

    /// Borrow the DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub(crate) fn x509(&self) -> &X509Certificate {
        &self.certificate
    }

    /// The CommonName of the subject.
    pub fn common_name(&self) -> Result<String, CertificateError> {
        common_name_of(&self.certificate.tbs_certificate.subject)
            .ok_or(CertificateError::MissingCommonName)
    }

    /// The private node address derived from the subject public key:
    /// "0" followed by the lowercase hex SHA-256 of the SubjectPublicKeyInfo.
    pub fn subject_private_address(&self) -> Result<String, CertificateError> {
        let spki_der = self.subject_public_key_info_der()?;
        Ok(format!(
            "{PRIVATE_ADDRESS_PREFIX}{}",
            hashing::sha256_hex(&spki_der)
        ))
    }

    /// The subject public key as an RSA key.
    pub fn subject_public_key(&self) -> Result<RsaPublicKey, CertificateError> {
        let spki_der = self.subject_public_key_info_der()?;
        RsaPublicKey::from_public_key_der(&spki_der)
            .map_err(|e| CertificateError::InvalidPublicKey(e.to_string()))
    }

    fn subject_public_key_info_der(&self) -> Result<Vec<u8>, CertificateError> {
        self.certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CertificateError::Encoding(e.to_string()))
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        from_asn1_time(&self.certificate.tbs_certificate.validity.not_before)
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        from_asn1_time(&self.certificate.tbs_certificate.validity.not_after)
    }

    /// Whether basicConstraints marks the subject as a CA.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints().map(|bc| bc.ca).unwrap_or(false)
    }

    /// The pathLenConstraint, when the certificate carries one.
    pub fn path_length(&self) -> Option<u8> {
        self.basic_constraints().and_then(|bc| bc.path_len_constraint)
    }

    fn basic_constraints(&self) -> Option<BasicConstraints> {
        let extension = self.extension(&oids::BASIC_CONSTRAINTS)?;
        BasicConstraints::from_der(extension.extn_value.as_bytes()).ok()
    }

    /// SubjectKeyIdentifier digest, when present.
    pub fn subject_key_identifier(&self) -> Option<Vec<u8>> {
        let extension = self.extension(&oids::SUBJECT_KEY_IDENTIFIER)?;
        let identifier = SubjectKeyIdentifier::from_der(extension.extn_value.as_bytes()).ok()?;
        Some(identifier.0.as_bytes().to_vec())
    }

    /// AuthorityKeyIdentifier digest, when present.
    pub fn authority_key_identifier(&self) -> Option<Vec<u8>> {
        let extension = self.extension(&oids::AUTHORITY_KEY_IDENTIFIER)?;
        let identifier = AuthorityKeyIdentifier::from_der(extension.extn_value.as_bytes()).ok()?;
        Some(identifier.key_identifier?.as_bytes().to_vec())
    }

    fn extension(&self, oid: &der::asn1::ObjectIdentifier) -> Option<&Extension> {
        self.certificate
            .tbs_certificate
            .extensions
            .as_ref()?
            .iter()
            .find(|extension| extension.extn_id == *oid)
    }

    /// Check the subject DN and the validity window against the current time.
    pub fn validate(&self) -> Result<(), CertificateError> {
        self.common_name()?;
        let now = Utc::now();
        if now < self.start_date() {
            return Err(CertificateError::NotYetValid);
        }
        if self.expiry_date() < now {
            return Err(CertificateError::Expired);
        }
        Ok(())
    }

    /// Build the certification path from this certificate to one of the
    /// `trusted_certificates`, routing through `intermediate_certificates`
    /// as needed.
    ///
    /// The returned list starts at this certificate and ends at the trust
    /// anchor; every link is checked for DN/key-identifier agreement and a
    /// valid issuer signature.
    pub fn get_certification_path(
        &self,
        intermediate_certificates: &[Certificate],
        trusted_certificates: &[Certificate],
    ) -> Result<Vec<Certificate>, CertificateError> {
        if trusted_certificates.is_empty() {
            return Err(CertificateError::EmptyTrustedSet);
        }
        if trusted_certificates.iter().any(|anchor| anchor == self) {
            return Ok(vec![self.clone()]);
        }
        let mut in_use = Vec::new();
        let chain = extend_path(
            self,
            intermediate_certificates,
            trusted_certificates,
            &mut in_use,
        )
        .ok_or(CertificateError::NoPathFound)?;

        let mut path = Vec::with_capacity(1 + chain.len());
        path.push(self.clone());
        path.extend(chain);
        debug!("Built certification path spanning {} certificates", path.len());
        Ok(path)
    }

    /// Whether this certificate issued `subject`.
    fn issued(&self, subject: &Certificate) -> bool {
        if subject.certificate.tbs_certificate.issuer != self.certificate.tbs_certificate.subject {
            return false;
        }
        if let (Some(authority_digest), Some(subject_digest)) = (
            subject.authority_key_identifier(),
            self.subject_key_identifier(),
        ) {
            if authority_digest != subject_digest {
                return false;
            }
        }
        let Ok(tbs_der) = subject.certificate.tbs_certificate.to_der() else {
            return false;
        };
        let Ok(issuer_public_key) = self.subject_public_key() else {
            return false;
        };
        let Some(signature) = subject.certificate.signature.as_bytes() else {
            return false;
        };
        verify_pss(
            &issuer_public_key,
            HashingAlgorithm::Sha256,
            &tbs_der,
            signature,
        )
        .is_ok()
    }
}

fn extend_path(
    subject: &Certificate,
    intermediates: &[Certificate],
    trusted: &[Certificate],
    in_use: &mut Vec<Vec<u8>>,
) -> Option<Vec<Certificate>> {
    for anchor in trusted {
        if anchor.issued(subject) {
            return Some(vec![anchor.clone()]);
        }
    }
    for intermediate in intermediates {
        if in_use.iter().any(|der| der.as_slice() == intermediate.der()) {
            continue;
        }
        if !intermediate.issued(subject) {
            continue;
        }
        in_use.push(intermediate.der().to_vec());
        if let Some(rest) = extend_path(intermediate, intermediates, trusted, in_use) {
            let mut chain = Vec::with_capacity(1 + rest.len());
            chain.push(intermediate.clone());
            chain.extend(rest);
            return Some(chain);
        }
        in_use.pop();
    }
    None
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl Hash for Certificate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl Serialize for Certificate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.der.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Certificate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let der: Vec<u8> = Vec::deserialize(deserializer)?;
        Certificate::deserialize(&der).map_err(serde::de::Error::custom)
    }
}

fn single_common_name_rdn(common_name: &str) -> Result<Name, der::Error> {
    let mut utf16 = Vec::with_capacity(common_name.len() * 2);
    for unit in common_name.encode_utf16() {
        utf16.extend_from_slice(&unit.to_be_bytes());
    }
    let attribute = AttributeTypeAndValue {
        oid: oids::COMMON_NAME,
        value: Any::new(Tag::BmpString, utf16)?,
    };
    let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![attribute])?);
    Ok(RdnSequence(vec![rdn]))
}

fn common_name_of(name: &Name) -> Option<String> {
    for rdn in &name.0 {
        for attribute in rdn.0.iter() {
            if attribute.oid != oids::COMMON_NAME {
                continue;
            }
            let bytes = attribute.value.value();
            if attribute.value.tag() != Tag::BmpString || bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes
                .chunks(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            return String::from_utf16(&units).ok();
        }
    }
    None
}

fn basic_constraints_extension(is_ca: bool, path_length: u8) -> Result<Extension, CertificateError> {
    let constraints = BasicConstraints {
        ca: is_ca,
        path_len_constraint: is_ca.then_some(path_length),
    };
    let value = constraints
        .to_der()
        .map_err(|e| CertificateError::Encoding(e.to_string()))?;
    Ok(Extension {
        extn_id: oids::BASIC_CONSTRAINTS,
        critical: true,
        extn_value: OctetString::new(value).map_err(|e| CertificateError::Encoding(e.to_string()))?,
    })
}

fn authority_key_identifier_extension(digest: &[u8]) -> Result<Extension, CertificateError> {
    let identifier = AuthorityKeyIdentifier {
        key_identifier: Some(
            OctetString::new(digest).map_err(|e| CertificateError::Encoding(e.to_string()))?,
        ),
        authority_cert_issuer: None,
        authority_cert_serial_number: None,
    };
    let value = identifier
        .to_der()
        .map_err(|e| CertificateError::Encoding(e.to_string()))?;
    Ok(Extension {
        extn_id: oids::AUTHORITY_KEY_IDENTIFIER,
        critical: false,
        extn_value: OctetString::new(value).map_err(|e| CertificateError::Encoding(e.to_string()))?,
    })
}

fn subject_key_identifier_extension(digest: &[u8]) -> Result<Extension, CertificateError> {
    let identifier = SubjectKeyIdentifier(
        OctetString::new(digest).map_err(|e| CertificateError::Encoding(e.to_string()))?,
    );
    let value = identifier
        .to_der()
        .map_err(|e| CertificateError::Encoding(e.to_string()))?;
    Ok(Extension {
        extn_id: oids::SUBJECT_KEY_IDENTIFIER,
        critical: false,
        extn_value: OctetString::new(value).map_err(|e| CertificateError::Encoding(e.to_string()))?,
    })
}

fn serial_number_from_u64(value: u64) -> Result<SerialNumber, CertificateError> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|&&b| b == 0)
        .count()
        .min(bytes.len() - 1);
    let mut content = bytes[skip..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    SerialNumber::new(&content).map_err(|e| CertificateError::Encoding(e.to_string()))
}

fn to_asn1_time(instant: DateTime<Utc>) -> Result<Time, CertificateError> {
    let seconds = instant.timestamp();
    if seconds < 0 {
        return Err(CertificateError::Encoding(
            "validity predates the Unix epoch".to_string(),
        ));
    }
    let datetime = der::DateTime::from_unix_duration(Duration::from_secs(seconds as u64))
        .map_err(|e| CertificateError::Encoding(e.to_string()))?;
    Ok(match UtcTime::from_date_time(datetime) {
        Ok(utc) => Time::UtcTime(utc),
        Err(_) => Time::GeneralTime(GeneralizedTime::from_date_time(datetime)),
    })
}

fn from_asn1_time(time: &Time) -> DateTime<Utc> {
    let duration = match time {
        Time::UtcTime(utc) => utc.to_unix_duration(),
        Time::GeneralTime(generalized) => generalized.to_unix_duration(),
    };
    DateTime::<Utc>::from_timestamp(duration.as_secs() as i64, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::RsaKeyPair;
    use chrono::Duration as ChronoDuration;
    use std::sync::OnceLock;

    fn subject_keys() -> &'static RsaKeyPair {
        static KEYS: OnceLock<RsaKeyPair> = OnceLock::new();
        KEYS.get_or_init(|| RsaKeyPair::generate().unwrap())
    }

    fn issuer_keys() -> &'static RsaKeyPair {
        static KEYS: OnceLock<RsaKeyPair> = OnceLock::new();
        KEYS.get_or_init(|| RsaKeyPair::generate().unwrap())
    }

    fn tomorrow() -> DateTime<Utc> {
        Utc::now() + ChronoDuration::days(1)
    }

    fn issue_self_signed(common_name: &str, options: IssuanceOptions<'_>) -> Certificate {
        let keys = subject_keys();
        Certificate::issue(
            common_name,
            &keys.public_key,
            &keys.private_key,
            tomorrow(),
            options,
        )
        .unwrap()
    }

    #[test]
    fn issued_certificate_is_v3_with_critical_basic_constraints() {
        let certificate = issue_self_signed(
            "root",
            IssuanceOptions {
                is_ca: true,
                path_length: 2,
                ..Default::default()
            },
        );

        assert_eq!(certificate.x509().tbs_certificate.version, Version::V3);
        assert!(certificate.is_ca());
        assert_eq!(certificate.path_length(), Some(2));
        let extension = certificate.extension(&oids::BASIC_CONSTRAINTS).unwrap();
        assert!(extension.critical);
    }

    #[test]
    fn subject_dn_is_a_single_bmpstring_common_name() {
        let certificate = issue_self_signed("node.example", IssuanceOptions::default());
        assert_eq!(certificate.common_name().unwrap(), "node.example");

        let subject = &certificate.x509().tbs_certificate.subject;
        assert_eq!(subject.0.len(), 1);
        let attribute = subject.0[0].0.iter().next().unwrap();
        assert_eq!(attribute.oid, oids::COMMON_NAME);
        assert_eq!(attribute.value.tag(), Tag::BmpString);
    }

    #[test]
    fn key_identifiers_digest_the_subject_public_key_info() {
        let certificate = issue_self_signed("root", IssuanceOptions::default());

        let spki_der = certificate.subject_public_key_info_der().unwrap();
        let expected = hashing::sha256(&spki_der).to_vec();
        assert_eq!(certificate.subject_key_identifier().unwrap(), expected);
        // Self-issued, so the authority digest equals the subject digest.
        assert_eq!(certificate.authority_key_identifier().unwrap(), expected);
    }

    #[test]
    fn private_address_prefixes_the_spki_digest() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        let address = certificate.subject_private_address().unwrap();

        let spki_der = certificate.subject_public_key_info_der().unwrap();
        assert_eq!(address, format!("0{}", hashing::sha256_hex(&spki_der)));
        assert_eq!(address.len(), 65);
    }

    #[test]
    fn serial_number_is_positive() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        let serial = certificate.x509().tbs_certificate.serial_number.as_bytes();
        assert!(!serial.is_empty());
        assert_eq!(serial[0] & 0x80, 0);
    }

    #[test]
    fn positive_path_length_requires_ca() {
        let keys = subject_keys();
        for path_length in [1, 2] {
            let error = Certificate::issue(
                "node",
                &keys.public_key,
                &keys.private_key,
                tomorrow(),
                IssuanceOptions {
                    path_length,
                    ..Default::default()
                },
            )
            .unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("Subject should be a CA if pathLenConstraint={path_length}"),
            );
        }
    }

    #[test]
    fn zero_path_length_without_ca_is_accepted() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        assert!(!certificate.is_ca());
        assert_eq!(certificate.path_length(), None);
    }

    #[test]
    fn path_length_outside_zero_to_two_is_rejected() {
        let keys = subject_keys();
        for path_length in [-1, 3] {
            let error = Certificate::issue(
                "ca",
                &keys.public_key,
                &keys.private_key,
                tomorrow(),
                IssuanceOptions {
                    is_ca: true,
                    path_length,
                    ..Default::default()
                },
            )
            .unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("pathLenConstraint should be between 0 and 2 (got {path_length})"),
            );
        }
    }

    #[test]
    fn validity_window_must_not_be_empty() {
        let keys = subject_keys();
        let start = Utc::now();
        let error = Certificate::issue(
            "node",
            &keys.public_key,
            &keys.private_key,
            start,
            IssuanceOptions {
                start_date: Some(start),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "The end date must be later than the start date");
    }

    #[test]
    fn issuer_must_carry_basic_constraints_marked_as_ca() {
        let subject = subject_keys();
        let issuer = issuer_keys();
        let non_ca = Certificate::issue(
            "not-a-ca",
            &issuer.public_key,
            &issuer.private_key,
            tomorrow(),
            IssuanceOptions::default(),
        )
        .unwrap();

        let error = Certificate::issue(
            "node",
            &subject.public_key,
            &issuer.private_key,
            tomorrow(),
            IssuanceOptions {
                issuer_certificate: Some(&non_ca),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(error.to_string(), "Issuer certificate should be marked as CA");
    }

    #[test]
    fn ca_issued_certificate_links_to_its_issuer() {
        let subject = subject_keys();
        let issuer = issuer_keys();
        let ca = Certificate::issue(
            "ca",
            &issuer.public_key,
            &issuer.private_key,
            tomorrow(),
            IssuanceOptions {
                is_ca: true,
                path_length: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let certificate = Certificate::issue(
            "node",
            &subject.public_key,
            &issuer.private_key,
            tomorrow(),
            IssuanceOptions {
                issuer_certificate: Some(&ca),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(
            certificate.x509().tbs_certificate.issuer,
            ca.x509().tbs_certificate.subject,
        );
        assert_eq!(
            certificate.authority_key_identifier().unwrap(),
            ca.subject_key_identifier().unwrap(),
        );
        assert!(ca.issued(&certificate));
    }

    #[test]
    fn validate_rejects_certificates_outside_their_window() {
        let keys = subject_keys();
        let future = Certificate::issue(
            "node",
            &keys.public_key,
            &keys.private_key,
            Utc::now() + ChronoDuration::days(2),
            IssuanceOptions {
                start_date: Some(Utc::now() + ChronoDuration::days(1)),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            future.validate().unwrap_err().to_string(),
            "Certificate is not yet valid",
        );

        let current = issue_self_signed("node", IssuanceOptions::default());
        current.validate().unwrap();
    }

    #[test]
    fn deserialization_round_trips_bit_exactly() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        let serialization = certificate.serialize();
        let deserialized = Certificate::deserialize(&serialization).unwrap();
        assert_eq!(deserialized, certificate);
        assert_eq!(deserialized.serialize(), serialization);
    }

    #[test]
    fn garbage_is_not_a_certificate() {
        let error = Certificate::deserialize(b"Not a certificate").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Value should be a DER-encoded, X.509 v3 certificate",
        );
    }

    #[test]
    fn serde_round_trip_preserves_identity() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        let json = serde_json::to_string(&certificate).unwrap();
        let restored: Certificate = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, certificate);
    }

    #[test]
    fn empty_trusted_set_fails_path_building() {
        let certificate = issue_self_signed("node", IssuanceOptions::default());
        let error = certificate.get_certification_path(&[], &[]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Failed to initialize path builder; set of trusted CAs might be empty",
        );
    }
}
