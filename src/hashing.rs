//! Digest algorithms supported by the certificate and CMS layers.

use der::asn1::ObjectIdentifier;
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::oids;

/// Hash function negotiated for CMS SignedData production.
///
/// Certificates are always signed with SHA-256; CMS signatures may use any of
/// the three.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HashingAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashingAlgorithm {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            HashingAlgorithm::Sha256 => oids::SHA_256,
            HashingAlgorithm::Sha384 => oids::SHA_384,
            HashingAlgorithm::Sha512 => oids::SHA_512,
        }
    }

    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        match *oid {
            oids::SHA_256 => Some(HashingAlgorithm::Sha256),
            oids::SHA_384 => Some(HashingAlgorithm::Sha384),
            oids::SHA_512 => Some(HashingAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Digest size in octets, which doubles as the PSS salt length.
    pub fn digest_size(self) -> usize {
        match self {
            HashingAlgorithm::Sha256 => 32,
            HashingAlgorithm::Sha384 => 48,
            HashingAlgorithm::Sha512 => 64,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashingAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashingAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashingAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// SHA-256 digest of `data`, the hash behind key identifiers and private
/// addresses.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hexadecimal SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
