//! CMS SignedData with attached content and a single signer.

use core::cmp::Ordering;

use der::asn1::{OctetString, SetOfVec};
use der::{Any, Choice, Decode, Encode, Sequence, ValueOrd};
use rsa::RsaPrivateKey;
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attributes;
use x509_cert::Certificate as X509Certificate;

use super::{CmsVersion, ContentInfo, IssuerAndSerialNumber};
use crate::algorithms::{digest_algorithm_identifier, pss_algorithm_identifier, sign_pss, verify_pss};
use crate::certificate::Certificate;
use crate::error::CmsError;
use crate::hashing::HashingAlgorithm;
use crate::oids;

/// EncapsulatedContentInfo (RFC 5652 § 5.2) with attached content.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct EncapsulatedContentInfo {
    pub econtent_type: der::asn1::ObjectIdentifier,

    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub econtent: Option<OctetString>,
}

/// SignerIdentifier (RFC 5652 § 5.3).
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub(crate) enum SignerIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "false")]
    SubjectKeyIdentifier(OctetString),
}

/// SignerInfo (RFC 5652 § 5.3). Signed and unsigned attributes are never
/// produced by this crate: the signature covers the attached content octets
/// directly.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SignerInfo {
    pub version: CmsVersion,
    pub sid: SignerIdentifier,
    pub digest_algorithm: AlgorithmIdentifierOwned,

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true", optional = "true")]
    pub signed_attributes: Option<Attributes>,

    pub signature_algorithm: AlgorithmIdentifierOwned,
    pub signature: OctetString,

    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", constructed = "true", optional = "true")]
    pub unsigned_attributes: Option<Attributes>,
}

impl ValueOrd for SignerInfo {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        Ok(self.to_der()?.cmp(&other.to_der()?))
    }
}

/// SignedData (RFC 5652 § 5.1), without CRLs.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct SignedDataContent {
    pub version: CmsVersion,
    pub digest_algorithms: SetOfVec<AlgorithmIdentifierOwned>,
    pub encap_content_info: EncapsulatedContentInfo,

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true", optional = "true")]
    pub certificates: Option<SetOfVec<X509Certificate>>,

    pub signer_infos: SetOfVec<SignerInfo>,
}

/// A CMS SignedData value with the signed plaintext attached.
#[derive(Clone, Debug)]
pub struct SignedData {
    content: SignedDataContent,
    signer_certificate: Option<Certificate>,
    attached_certificates: Vec<Certificate>,
}

impl SignedData {
    /// Sign `plaintext`, attaching it together with the signer certificate
    /// and any additional CA certificates.
    pub fn sign(
        plaintext: &[u8],
        signer_private_key: &RsaPrivateKey,
        signer_certificate: &Certificate,
        ca_certificates: &[Certificate],
        hashing_algorithm: HashingAlgorithm,
    ) -> Result<Self, CmsError> {
        let signature = sign_pss(signer_private_key, hashing_algorithm, plaintext);

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber::of_certificate(
                signer_certificate,
            )),
            digest_algorithm: digest_algorithm_identifier(hashing_algorithm),
            signed_attributes: None,
            signature_algorithm: pss_algorithm_identifier(hashing_algorithm)
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
            signature: OctetString::new(signature).map_err(|e| CmsError::Encoding(e.to_string()))?,
            unsigned_attributes: None,
        };

        let mut attached = vec![signer_certificate.clone()];
        attached.extend(ca_certificates.iter().cloned());
        let certificate_set = SetOfVec::try_from(
            attached
                .iter()
                .map(|certificate| certificate.x509().clone())
                .collect::<Vec<_>>(),
        )
        .map_err(|e| CmsError::Encoding(e.to_string()))?;

        let content = SignedDataContent {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![digest_algorithm_identifier(
                hashing_algorithm,
            )])
            .map_err(|e| CmsError::Encoding(e.to_string()))?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: oids::ID_DATA,
                econtent: Some(
                    OctetString::new(plaintext).map_err(|e| CmsError::Encoding(e.to_string()))?,
                ),
            },
            certificates: Some(certificate_set),
            signer_infos: SetOfVec::try_from(vec![signer_info])
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
        };

        Ok(Self {
            content,
            signer_certificate: Some(signer_certificate.clone()),
            attached_certificates: attached,
        })
    }

    /// DER-encode the ContentInfo wrapping this SignedData.
    pub fn serialize(&self) -> Result<Vec<u8>, CmsError> {
        let content_der = self
            .content
            .to_der()
            .map_err(|e| CmsError::Encoding(e.to_string()))?;
        let content_info = ContentInfo {
            content_type: oids::ID_SIGNED_DATA,
            content: Any::from_der(&content_der).map_err(|e| CmsError::Encoding(e.to_string()))?,
        };
        content_info
            .to_der()
            .map_err(|e| CmsError::Encoding(e.to_string()))
    }

    /// Parse a ContentInfo wrapping a SignedData value.
    pub fn deserialize(serialization: &[u8]) -> Result<Self, CmsError> {
        let content_info =
            ContentInfo::from_der(serialization).map_err(|_| CmsError::InvalidDer)?;
        if content_info.content_type != oids::ID_SIGNED_DATA {
            return Err(CmsError::NotWrappedInContentInfo);
        }
        let content_der = content_info
            .content
            .to_der()
            .map_err(|_| CmsError::InvalidSignedData)?;
        let content =
            SignedDataContent::from_der(&content_der).map_err(|_| CmsError::InvalidSignedData)?;

        let mut attached = Vec::new();
        if let Some(certificates) = &content.certificates {
            for certificate in certificates.iter() {
                let der = certificate
                    .to_der()
                    .map_err(|e| CmsError::Encoding(e.to_string()))?;
                attached.push(
                    Certificate::deserialize(&der).map_err(CmsError::AttachedCertificate)?,
                );
            }
        }

        let signer_certificate = content.signer_infos.iter().next().and_then(|signer_info| {
            match &signer_info.sid {
                SignerIdentifier::IssuerAndSerialNumber(identifier) => attached
                    .iter()
                    .find(|certificate| identifier.matches(certificate))
                    .cloned(),
                SignerIdentifier::SubjectKeyIdentifier(identifier) => attached
                    .iter()
                    .find(|certificate| {
                        certificate.subject_key_identifier().as_deref()
                            == Some(identifier.as_bytes())
                    })
                    .cloned(),
            }
        });

        Ok(Self {
            content,
            signer_certificate,
            attached_certificates: attached,
        })
    }

    /// Validate the signature of the sole SignerInfo over the attached
    /// content, optionally checking that content against
    /// `expected_plaintext`. Returns the signer certificate.
    pub fn verify(&self, expected_plaintext: Option<&[u8]>) -> Result<&Certificate, CmsError> {
        let mut signer_infos = self.content.signer_infos.iter();
        let signer_info = match (signer_infos.next(), signer_infos.next()) {
            (Some(signer_info), None) => signer_info,
            _ => return Err(CmsError::SignerCount(self.content.signer_infos.len())),
        };

        let plaintext = self.plaintext().ok_or(CmsError::MissingPlaintext)?;
        if let Some(expected) = expected_plaintext {
            if expected != plaintext {
                return Err(CmsError::PlaintextMismatch);
            }
        }

        let hashing_algorithm = HashingAlgorithm::from_oid(&signer_info.digest_algorithm.oid)
            .ok_or_else(|| {
                CmsError::UnsupportedHashingAlgorithm(
                    signer_info.digest_algorithm.oid.to_string(),
                )
            })?;

        let signer_certificate = self
            .signer_certificate
            .as_ref()
            .ok_or(CmsError::MissingSignerCertificate)?;
        let public_key = signer_certificate
            .subject_public_key()
            .map_err(|e| CmsError::InvalidSignature(e.to_string()))?;

        verify_pss(
            &public_key,
            hashing_algorithm,
            plaintext,
            signer_info.signature.as_bytes(),
        )
        .map_err(|e| CmsError::InvalidSignature(e.to_string()))?;

        Ok(signer_certificate)
    }

    /// The attached content, when present.
    pub fn plaintext(&self) -> Option<&[u8]> {
        self.content
            .encap_content_info
            .econtent
            .as_ref()
            .map(|content| content.as_bytes())
    }

    /// The certificate of the signer, when it is attached.
    pub fn signer_certificate(&self) -> Option<&Certificate> {
        self.signer_certificate.as_ref()
    }

    /// Every certificate attached to the SignedData, signer included.
    pub fn attached_certificates(&self) -> &[Certificate] {
        &self.attached_certificates
    }
}
