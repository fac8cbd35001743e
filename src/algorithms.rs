//! RSASSA-PSS / RSAES-OAEP / MGF1 algorithm identifiers and signing helpers
//! shared by the certificate and CMS layers.

use der::{Any, Decode, Encode, Sequence};
use rand::rngs::OsRng;
use rsa::pss;
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierOwned;

use crate::hashing::HashingAlgorithm;
use crate::oids;

/// RSASSA-PSS-params (RFC 8017 A.2.3). Fields at their RFC defaults are
/// omitted from the encoding, so only the SHA-2 family members appear here.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct RsaPssParameters {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub hash_algorithm: Option<AlgorithmIdentifierOwned>,

    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub mask_gen_algorithm: Option<AlgorithmIdentifierOwned>,

    #[asn1(context_specific = "2", tag_mode = "EXPLICIT", optional = "true")]
    pub salt_length: Option<u8>,

    #[asn1(context_specific = "3", tag_mode = "EXPLICIT", optional = "true")]
    pub trailer_field: Option<u8>,
}

/// RSAES-OAEP-params (RFC 8017 A.2.1), pSourceFunc left at its default.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct RsaOaepParameters {
    #[asn1(context_specific = "0", tag_mode = "EXPLICIT", optional = "true")]
    pub hash_algorithm: Option<AlgorithmIdentifierOwned>,

    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub mask_gen_algorithm: Option<AlgorithmIdentifierOwned>,
}

fn encode_as_any<T: Encode>(value: &T) -> Result<Any, der::Error> {
    Any::from_der(&value.to_der()?)
}

/// AlgorithmIdentifier for a bare hash function, with absent parameters.
pub(crate) fn digest_algorithm_identifier(algorithm: HashingAlgorithm) -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: algorithm.oid(),
        parameters: None,
    }
}

/// MGF1 parameterized with the given hash function.
pub(crate) fn mgf1_algorithm_identifier(
    algorithm: HashingAlgorithm,
) -> Result<AlgorithmIdentifierOwned, der::Error> {
    Ok(AlgorithmIdentifierOwned {
        oid: oids::ID_MGF1,
        parameters: Some(encode_as_any(&digest_algorithm_identifier(algorithm))?),
    })
}

/// id-RSASSA-PSS with hash/MGF1/salt bound to the given hash function.
pub(crate) fn pss_algorithm_identifier(
    algorithm: HashingAlgorithm,
) -> Result<AlgorithmIdentifierOwned, der::Error> {
    let parameters = RsaPssParameters {
        hash_algorithm: Some(digest_algorithm_identifier(algorithm)),
        mask_gen_algorithm: Some(mgf1_algorithm_identifier(algorithm)?),
        salt_length: Some(algorithm.digest_size() as u8),
        trailer_field: None,
    };
    Ok(AlgorithmIdentifierOwned {
        oid: oids::RSASSA_PSS,
        parameters: Some(encode_as_any(&parameters)?),
    })
}

/// id-RSAES-OAEP with SHA-256 hashing and MGF1-SHA-256 masking.
pub(crate) fn oaep_algorithm_identifier() -> Result<AlgorithmIdentifierOwned, der::Error> {
    let parameters = RsaOaepParameters {
        hash_algorithm: Some(digest_algorithm_identifier(HashingAlgorithm::Sha256)),
        mask_gen_algorithm: Some(mgf1_algorithm_identifier(HashingAlgorithm::Sha256)?),
    };
    Ok(AlgorithmIdentifierOwned {
        oid: oids::RSAES_OAEP,
        parameters: Some(encode_as_any(&parameters)?),
    })
}

/// RSASSA-PSS signature over `message`, salted from the OS CSPRNG.
pub(crate) fn sign_pss(
    private_key: &RsaPrivateKey,
    algorithm: HashingAlgorithm,
    message: &[u8],
) -> Vec<u8> {
    match algorithm {
        HashingAlgorithm::Sha256 => pss::SigningKey::<Sha256>::new(private_key.clone())
            .sign_with_rng(&mut OsRng, message)
            .to_vec(),
        HashingAlgorithm::Sha384 => pss::SigningKey::<Sha384>::new(private_key.clone())
            .sign_with_rng(&mut OsRng, message)
            .to_vec(),
        HashingAlgorithm::Sha512 => pss::SigningKey::<Sha512>::new(private_key.clone())
            .sign_with_rng(&mut OsRng, message)
            .to_vec(),
    }
}

/// Verify an RSASSA-PSS signature over `message`.
pub(crate) fn verify_pss(
    public_key: &RsaPublicKey,
    algorithm: HashingAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> Result<(), rsa::signature::Error> {
    let signature = pss::Signature::try_from(signature)?;
    match algorithm {
        HashingAlgorithm::Sha256 => {
            pss::VerifyingKey::<Sha256>::new(public_key.clone()).verify(message, &signature)
        }
        HashingAlgorithm::Sha384 => {
            pss::VerifyingKey::<Sha384>::new(public_key.clone()).verify(message, &signature)
        }
        HashingAlgorithm::Sha512 => {
            pss::VerifyingKey::<Sha512>::new(public_key.clone()).verify(message, &signature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::RsaKeyPair;
    use std::sync::OnceLock;

    fn key_pair() -> &'static RsaKeyPair {
        static KEY_PAIR: OnceLock<RsaKeyPair> = OnceLock::new();
        KEY_PAIR.get_or_init(|| RsaKeyPair::generate().unwrap())
    }

    #[test]
    fn pss_signatures_verify_for_every_hash() {
        let keys = key_pair();
        for algorithm in [
            HashingAlgorithm::Sha256,
            HashingAlgorithm::Sha384,
            HashingAlgorithm::Sha512,
        ] {
            let signature = sign_pss(&keys.private_key, algorithm, b"message");
            verify_pss(&keys.public_key, algorithm, b"message", &signature).unwrap();
            assert!(verify_pss(&keys.public_key, algorithm, b"tampered", &signature).is_err());
        }
    }

    #[test]
    fn pss_parameters_encode_hash_and_salt() {
        let identifier = pss_algorithm_identifier(HashingAlgorithm::Sha384).unwrap();
        assert_eq!(identifier.oid, oids::RSASSA_PSS);

        let parameters =
            RsaPssParameters::from_der(&identifier.parameters.unwrap().to_der().unwrap()).unwrap();
        assert_eq!(parameters.hash_algorithm.unwrap().oid, oids::SHA_384);
        assert_eq!(parameters.mask_gen_algorithm.unwrap().oid, oids::ID_MGF1);
        assert_eq!(parameters.salt_length, Some(48));
        assert_eq!(parameters.trailer_field, None);
    }

    #[test]
    fn oaep_parameters_bind_sha256() {
        let identifier = oaep_algorithm_identifier().unwrap();
        assert_eq!(identifier.oid, oids::RSAES_OAEP);
        let parameters =
            RsaOaepParameters::from_der(&identifier.parameters.unwrap().to_der().unwrap()).unwrap();
        assert_eq!(parameters.hash_algorithm.unwrap().oid, oids::SHA_256);
    }
}
