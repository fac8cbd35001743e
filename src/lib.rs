//! Relaynet data plane: the RAMF wire format and its cryptographic
//! underpinnings.
//!
//! The crate is organized bottom-up:
//!
//! - [`asn1`]: DER sequence helpers with explicit/implicit tagging.
//! - [`hashing`] and [`keys`]: SHA-2 digests, RSA key pairs and random
//!   serial numbers.
//! - [`certificate`]: X.509 v3 issuance, validation and certification-path
//!   building under the Relaynet extension profile.
//! - [`cms`]: CMS SignedData (RSASSA-PSS) and EnvelopedData
//!   (AES-GCM + RSA-OAEP).
//! - [`ramf`]: the RAMF codec, typed message subtypes and the client
//!   registration container.
//!
//! Every value is immutable once constructed and may be shared across
//! threads; all randomness is drawn from the operating system CSPRNG.

mod algorithms;

pub mod asn1;
pub mod certificate;
pub mod cms;
pub mod error;
pub mod hashing;
pub mod keys;
pub mod oids;
pub mod ramf;

pub use certificate::{Certificate, IssuanceOptions, PRIVATE_ADDRESS_PREFIX};
pub use cms::{EnvelopedData, SignedData, SymmetricCipher};
pub use error::{
    Asn1Error, CertificateError, CmsError, InvalidMessageError, KeyError, RamfError,
};
pub use hashing::HashingAlgorithm;
pub use keys::{generate_rsa_keypair, RsaKeyPair};
pub use ramf::{
    Cargo, CargoCollectionAuthorization, ClientRegistration, FieldSet, Message, MessageKind,
    Parcel,
};
