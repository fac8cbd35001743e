//! Cryptographic Message Syntax (RFC 5652) structures shared by the
//! SignedData and EnvelopedData layers.

pub mod enveloped_data;
pub mod signed_data;

pub use enveloped_data::{EnvelopedData, SymmetricCipher};
pub use signed_data::SignedData;

use der::{Any, Enumerated, Sequence};
use der::asn1::ObjectIdentifier;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;

/// CMSVersion (RFC 5652 § 10.2.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Enumerated)]
#[asn1(type = "INTEGER")]
#[repr(u8)]
pub(crate) enum CmsVersion {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

/// The outermost CMS wrapper (RFC 5652 § 3).
///
/// ```text
/// ContentInfo ::= SEQUENCE {
///     contentType ContentType,
///     content [0] EXPLICIT ANY DEFINED BY contentType }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct ContentInfo {
    pub content_type: ObjectIdentifier,

    #[asn1(context_specific = "0", tag_mode = "EXPLICIT")]
    pub content: Any,
}

/// IssuerAndSerialNumber (RFC 5652 § 10.2.4), the recipient/signer
/// identifier used throughout this crate.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: SerialNumber,
}

impl IssuerAndSerialNumber {
    pub(crate) fn of_certificate(certificate: &crate::certificate::Certificate) -> Self {
        let tbs = &certificate.x509().tbs_certificate;
        Self {
            issuer: tbs.issuer.clone(),
            serial_number: tbs.serial_number.clone(),
        }
    }

    pub(crate) fn matches(&self, certificate: &crate::certificate::Certificate) -> bool {
        let tbs = &certificate.x509().tbs_certificate;
        self.issuer == tbs.issuer && self.serial_number == tbs.serial_number
    }
}
