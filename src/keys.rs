//! RSA key pair generation and serial number randomness.

use log::debug;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::error::KeyError;

/// Smallest RSA modulus accepted for Relaynet nodes.
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Modulus used when the caller does not pick one.
pub const DEFAULT_RSA_MODULUS_BITS: usize = 2048;

/// An RSA key pair, the only key type used by the certificate and CMS layers.
#[derive(Clone, Debug)]
pub struct RsaKeyPair {
    pub private_key: RsaPrivateKey,
    pub public_key: RsaPublicKey,
}

impl RsaKeyPair {
    /// Generate a key pair with the default modulus size.
    pub fn generate() -> Result<Self, KeyError> {
        generate_rsa_keypair(DEFAULT_RSA_MODULUS_BITS)
    }
}

/// Generate an RSA key pair with the requested modulus size.
///
/// Moduli under 2048 bits are rejected. Randomness comes from the operating
/// system CSPRNG.
pub fn generate_rsa_keypair(modulus_bits: usize) -> Result<RsaKeyPair, KeyError> {
    if modulus_bits < MIN_RSA_MODULUS_BITS {
        return Err(KeyError::ModulusTooSmall(modulus_bits));
    }
    let private_key = RsaPrivateKey::new(&mut OsRng, modulus_bits)
        .map_err(|e| KeyError::Generation(e.to_string()))?;
    let public_key = private_key.to_public_key();
    debug!("Generated RSA-{modulus_bits} key pair");
    Ok(RsaKeyPair {
        private_key,
        public_key,
    })
}

/// Cryptographically random, nonzero serial number in the positive 64-bit
/// range.
pub fn generate_random_serial() -> u64 {
    loop {
        let serial = OsRng.next_u64();
        if serial != 0 {
            return serial;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn modulus_under_2048_is_rejected() {
        let error = generate_rsa_keypair(1024).unwrap_err();
        assert_eq!(error.to_string(), "Modulus should be at least 2048 (got 1024)");
    }

    #[test]
    fn default_modulus_is_2048() {
        let key_pair = RsaKeyPair::generate().unwrap();
        assert_eq!(key_pair.public_key.size() * 8, 2048);
    }

    #[test]
    fn serial_numbers_are_nonzero_and_vary() {
        let first = generate_random_serial();
        let second = generate_random_serial();
        assert_ne!(first, 0);
        assert_ne!(second, 0);
        // Two consecutive 64-bit draws colliding means the RNG is broken.
        assert_ne!(first, second);
    }
}
