//! CMS EnvelopedData: AES-GCM content encryption under RSA-OAEP key
//! transport.
//!
//! Every call draws a fresh content-encryption key and a fresh 12-byte IV
//! from the OS CSPRNG; neither is ever reused.

use core::cmp::Ordering;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::cipher::consts::U12;
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use der::asn1::{ObjectIdentifier, OctetString, SetOfVec};
use der::{Any, Choice, Decode, Encode, Sequence, ValueOrd};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;
use spki::AlgorithmIdentifierOwned;
use zeroize::Zeroize;

use super::{CmsVersion, ContentInfo, IssuerAndSerialNumber};
use crate::algorithms::oaep_algorithm_identifier;
use crate::certificate::Certificate;
use crate::error::CmsError;
use crate::oids;

type Aes192Gcm = AesGcm<Aes192, U12>;

const IV_LENGTH: usize = 12;
const TAG_LENGTH: usize = 16;

/// Content-encryption cipher for EnvelopedData.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SymmetricCipher {
    #[default]
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
}

impl SymmetricCipher {
    pub fn key_size(self) -> usize {
        match self {
            SymmetricCipher::Aes128Gcm => 16,
            SymmetricCipher::Aes192Gcm => 24,
            SymmetricCipher::Aes256Gcm => 32,
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SymmetricCipher::Aes128Gcm => oids::AES_128_GCM,
            SymmetricCipher::Aes192Gcm => oids::AES_192_GCM,
            SymmetricCipher::Aes256Gcm => oids::AES_256_GCM,
        }
    }

    fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            oids::AES_128_GCM => Some(SymmetricCipher::Aes128Gcm),
            oids::AES_192_GCM => Some(SymmetricCipher::Aes192Gcm),
            oids::AES_256_GCM => Some(SymmetricCipher::Aes256Gcm),
            _ => None,
        }
    }

    fn seal(self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CmsError> {
        let nonce = Nonce::from_slice(iv);
        match self {
            SymmetricCipher::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .encrypt(nonce, plaintext),
            SymmetricCipher::Aes192Gcm => Aes192Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .encrypt(nonce, plaintext),
            SymmetricCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .encrypt(nonce, plaintext),
        }
        .map_err(|_| CmsError::Decryption)
    }

    fn open(self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CmsError> {
        let nonce = Nonce::from_slice(iv);
        match self {
            SymmetricCipher::Aes128Gcm => Aes128Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .decrypt(nonce, ciphertext),
            SymmetricCipher::Aes192Gcm => Aes192Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .decrypt(nonce, ciphertext),
            SymmetricCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key)
                .map_err(|_| CmsError::Decryption)?
                .decrypt(nonce, ciphertext),
        }
        .map_err(|_| CmsError::Decryption)
    }
}

/// GCMParameters (RFC 5084 § 3.2). The ICV length is always written out,
/// even at its 12-octet default, because this crate always uses 16.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct GcmParameters {
    pub nonce: OctetString,
    pub icv_len: u8,
}

/// RecipientIdentifier (RFC 5652 § 6.2.1).
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub(crate) enum RecipientIdentifier {
    IssuerAndSerialNumber(IssuerAndSerialNumber),

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "false")]
    SubjectKeyIdentifier(OctetString),
}

/// KeyTransRecipientInfo (RFC 5652 § 6.2.1), the only RecipientInfo choice
/// this crate produces.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct KeyTransRecipientInfo {
    pub version: CmsVersion,
    pub rid: RecipientIdentifier,
    pub key_encryption_algorithm: AlgorithmIdentifierOwned,
    pub encrypted_key: OctetString,
}

impl ValueOrd for KeyTransRecipientInfo {
    fn value_cmp(&self, other: &Self) -> der::Result<Ordering> {
        Ok(self.to_der()?.cmp(&other.to_der()?))
    }
}

/// EncryptedContentInfo (RFC 5652 § 6.1).
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct EncryptedContentInfo {
    pub content_type: ObjectIdentifier,
    pub content_encryption_algorithm: AlgorithmIdentifierOwned,

    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "false", optional = "true")]
    pub encrypted_content: Option<OctetString>,
}

/// EnvelopedData (RFC 5652 § 6.1), without originator info or unprotected
/// attributes.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct EnvelopedDataContent {
    pub version: CmsVersion,
    pub recipient_infos: SetOfVec<KeyTransRecipientInfo>,
    pub encrypted_content_info: EncryptedContentInfo,
}

/// A CMS EnvelopedData value addressed to a single recipient.
#[derive(Clone, Debug)]
pub struct EnvelopedData {
    content: EnvelopedDataContent,
}

impl EnvelopedData {
    /// Encrypt `plaintext` for the holder of `recipient_certificate`.
    ///
    /// The content-encryption key is wrapped with RSA-OAEP (SHA-256) under
    /// the recipient's public key and discarded afterwards.
    pub fn encrypt(
        plaintext: &[u8],
        recipient_certificate: &Certificate,
        cipher: SymmetricCipher,
    ) -> Result<Self, CmsError> {
        let mut content_encryption_key = vec![0u8; cipher.key_size()];
        OsRng.fill_bytes(&mut content_encryption_key);
        let mut iv = [0u8; IV_LENGTH];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = cipher.seal(&content_encryption_key, &iv, plaintext)?;

        let recipient_public_key = recipient_certificate
            .subject_public_key()
            .map_err(|e| CmsError::KeyEncryption(e.to_string()))?;
        let encrypted_key = recipient_public_key
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &content_encryption_key)
            .map_err(|e| CmsError::KeyEncryption(e.to_string()))?;
        content_encryption_key.zeroize();

        let gcm_parameters = GcmParameters {
            nonce: OctetString::new(iv.to_vec()).map_err(|e| CmsError::Encoding(e.to_string()))?,
            icv_len: TAG_LENGTH as u8,
        };
        let content_encryption_algorithm = AlgorithmIdentifierOwned {
            oid: cipher.oid(),
            parameters: Some(
                Any::from_der(
                    &gcm_parameters
                        .to_der()
                        .map_err(|e| CmsError::Encoding(e.to_string()))?,
                )
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
            ),
        };

        let recipient_info = KeyTransRecipientInfo {
            version: CmsVersion::V0,
            rid: RecipientIdentifier::IssuerAndSerialNumber(
                IssuerAndSerialNumber::of_certificate(recipient_certificate),
            ),
            key_encryption_algorithm: oaep_algorithm_identifier()
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
            encrypted_key: OctetString::new(encrypted_key)
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
        };

        let content = EnvelopedDataContent {
            version: CmsVersion::V0,
            recipient_infos: SetOfVec::try_from(vec![recipient_info])
                .map_err(|e| CmsError::Encoding(e.to_string()))?,
            encrypted_content_info: EncryptedContentInfo {
                content_type: oids::ID_DATA,
                content_encryption_algorithm,
                encrypted_content: Some(
                    OctetString::new(ciphertext).map_err(|e| CmsError::Encoding(e.to_string()))?,
                ),
            },
        };

        Ok(Self { content })
    }

    /// Recover the plaintext with the recipient's private key.
    pub fn decrypt(&self, recipient_private_key: &RsaPrivateKey) -> Result<Vec<u8>, CmsError> {
        let recipient_info = self
            .content
            .recipient_infos
            .iter()
            .next()
            .ok_or(CmsError::UnknownRecipient)?;

        let mut content_encryption_key = recipient_private_key
            .decrypt(
                Oaep::new::<Sha256>(),
                recipient_info.encrypted_key.as_bytes(),
            )
            .map_err(|e| CmsError::KeyDecryption(e.to_string()))?;

        let encrypted_content_info = &self.content.encrypted_content_info;
        let cipher = SymmetricCipher::from_oid(
            &encrypted_content_info.content_encryption_algorithm.oid,
        )
        .ok_or_else(|| {
            CmsError::UnsupportedCipher(
                encrypted_content_info
                    .content_encryption_algorithm
                    .oid
                    .to_string(),
            )
        })?;

        let parameters = encrypted_content_info
            .content_encryption_algorithm
            .parameters
            .as_ref()
            .ok_or(CmsError::Decryption)?;
        let gcm_parameters = GcmParameters::from_der(
            &parameters.to_der().map_err(|_| CmsError::Decryption)?,
        )
        .map_err(|_| CmsError::Decryption)?;

        let ciphertext = encrypted_content_info
            .encrypted_content
            .as_ref()
            .ok_or(CmsError::Decryption)?;

        let plaintext = cipher.open(
            &content_encryption_key,
            gcm_parameters.nonce.as_bytes(),
            ciphertext.as_bytes(),
        );
        content_encryption_key.zeroize();
        plaintext
    }

    /// DER-encode the ContentInfo wrapping this EnvelopedData.
    pub fn serialize(&self) -> Result<Vec<u8>, CmsError> {
        let content_der = self
            .content
            .to_der()
            .map_err(|e| CmsError::Encoding(e.to_string()))?;
        let content_info = ContentInfo {
            content_type: oids::ID_ENVELOPED_DATA,
            content: Any::from_der(&content_der).map_err(|e| CmsError::Encoding(e.to_string()))?,
        };
        content_info
            .to_der()
            .map_err(|e| CmsError::Encoding(e.to_string()))
    }

    /// Parse a ContentInfo wrapping an EnvelopedData value.
    pub fn deserialize(serialization: &[u8]) -> Result<Self, CmsError> {
        let content_info =
            ContentInfo::from_der(serialization).map_err(|_| CmsError::InvalidDer)?;
        if content_info.content_type != oids::ID_ENVELOPED_DATA {
            return Err(CmsError::NotWrappedInEnvelopedContentInfo);
        }
        let content_der = content_info
            .content
            .to_der()
            .map_err(|_| CmsError::InvalidEnvelopedData)?;
        let content = EnvelopedDataContent::from_der(&content_der)
            .map_err(|_| CmsError::InvalidEnvelopedData)?;
        Ok(Self { content })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::IssuanceOptions;
    use crate::keys::RsaKeyPair;
    use chrono::{Duration, Utc};
    use std::sync::OnceLock;

    struct Fixture {
        keys: RsaKeyPair,
        certificate: Certificate,
    }

    fn fixture() -> &'static Fixture {
        static FIXTURE: OnceLock<Fixture> = OnceLock::new();
        FIXTURE.get_or_init(|| {
            let keys = RsaKeyPair::generate().unwrap();
            let certificate = Certificate::issue(
                "recipient",
                &keys.public_key,
                &keys.private_key,
                Utc::now() + Duration::days(1),
                IssuanceOptions::default(),
            )
            .unwrap();
            Fixture { keys, certificate }
        })
    }

    #[test]
    fn encrypt_decrypt_round_trip_for_every_key_size() {
        let fixture = fixture();
        for cipher in [
            SymmetricCipher::Aes128Gcm,
            SymmetricCipher::Aes192Gcm,
            SymmetricCipher::Aes256Gcm,
        ] {
            let enveloped =
                EnvelopedData::encrypt(b"secret payload", &fixture.certificate, cipher).unwrap();
            let serialization = enveloped.serialize().unwrap();
            let deserialized = EnvelopedData::deserialize(&serialization).unwrap();
            let plaintext = deserialized.decrypt(&fixture.keys.private_key).unwrap();
            assert_eq!(plaintext, b"secret payload");
        }
    }

    #[test]
    fn ciphertext_carries_the_gcm_tag() {
        let fixture = fixture();
        let enveloped = EnvelopedData::encrypt(
            b"payload",
            &fixture.certificate,
            SymmetricCipher::default(),
        )
        .unwrap();
        let ciphertext = enveloped
            .content
            .encrypted_content_info
            .encrypted_content
            .as_ref()
            .unwrap();
        assert_eq!(ciphertext.as_bytes().len(), b"payload".len() + TAG_LENGTH);
    }

    #[test]
    fn ivs_are_not_reused_across_calls() {
        let fixture = fixture();
        let first =
            EnvelopedData::encrypt(b"x", &fixture.certificate, SymmetricCipher::default()).unwrap();
        let second =
            EnvelopedData::encrypt(b"x", &fixture.certificate, SymmetricCipher::default()).unwrap();

        let iv_of = |enveloped: &EnvelopedData| {
            let parameters = enveloped
                .content
                .encrypted_content_info
                .content_encryption_algorithm
                .parameters
                .clone()
                .unwrap();
            GcmParameters::from_der(&parameters.to_der().unwrap())
                .unwrap()
                .nonce
                .as_bytes()
                .to_vec()
        };
        assert_ne!(iv_of(&first), iv_of(&second));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let fixture = fixture();
        let enveloped = EnvelopedData::encrypt(
            b"authenticated",
            &fixture.certificate,
            SymmetricCipher::default(),
        )
        .unwrap();
        let mut tampered = enveloped.clone();
        let mut ciphertext = tampered
            .content
            .encrypted_content_info
            .encrypted_content
            .as_ref()
            .unwrap()
            .as_bytes()
            .to_vec();
        ciphertext[0] ^= 0x01;
        tampered.content.encrypted_content_info.encrypted_content =
            Some(OctetString::new(ciphertext).unwrap());

        let error = tampered.decrypt(&fixture.keys.private_key).unwrap_err();
        assert_eq!(error.to_string(), "Invalid ciphertext or authentication tag");
    }

    #[test]
    fn wrong_private_key_cannot_unwrap_the_cek() {
        let fixture = fixture();
        let stranger = RsaKeyPair::generate().unwrap();
        let enveloped = EnvelopedData::encrypt(
            b"payload",
            &fixture.certificate,
            SymmetricCipher::default(),
        )
        .unwrap();
        assert!(enveloped.decrypt(&stranger.private_key).is_err());
    }

    #[test]
    fn wrong_content_type_is_rejected() {
        let fixture = fixture();
        let signed = crate::cms::SignedData::sign(
            b"payload",
            &fixture.keys.private_key,
            &fixture.certificate,
            &[],
            crate::hashing::HashingAlgorithm::Sha256,
        )
        .unwrap();
        let error = EnvelopedData::deserialize(&signed.serialize().unwrap()).unwrap_err();
        assert_eq!(
            error.to_string(),
            "EnvelopedData value is not wrapped in ContentInfo",
        );
    }
}
