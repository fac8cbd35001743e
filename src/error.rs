//! Error types, one per subsystem.
//!
//! The `Display` strings of the variants below are part of the crate's
//! contract: callers (and the test suite) match on them verbatim.

use thiserror::Error;

/// DER (de)serialization failures from the [`crate::asn1`] helpers.
#[derive(Debug, Error)]
pub enum Asn1Error {
    #[error("Value is empty")]
    EmptyValue,

    #[error("Value is not DER-encoded")]
    InvalidDer,

    #[error("Value is not an ASN.1 sequence")]
    NotASequence,

    #[error("Sequence contains an item of an unexpected type ({0})")]
    UnexpectedItemType(String),

    #[error("Value is not a {0}")]
    UnexpectedValueType(&'static str),
}

/// RSA key generation failures.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Modulus should be at least 2048 (got {0})")]
    ModulusTooSmall(usize),

    #[error("Failed to generate RSA key pair: {0}")]
    Generation(String),
}

/// Certificate issuance, validation, path building and (de)serialization
/// failures.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("Subject should be a CA if pathLenConstraint={0}")]
    NonCaPathLength(i32),

    #[error("pathLenConstraint should be between 0 and 2 (got {0})")]
    PathLengthOutOfRange(i32),

    #[error("The end date must be later than the start date")]
    InvalidValidityWindow,

    #[error("Issuer certificate should have basic constraints extension")]
    IssuerWithoutBasicConstraints,

    #[error("Issuer certificate should be marked as CA")]
    IssuerNotCa,

    #[error("Issuer must have the SubjectKeyIdentifier extension")]
    IssuerWithoutKeyIdentifier,

    #[error("Subject should have a Common Name")]
    MissingCommonName,

    #[error("Certificate is not yet valid")]
    NotYetValid,

    #[error("Certificate already expired")]
    Expired,

    #[error("Failed to initialize path builder; set of trusted CAs might be empty")]
    EmptyTrustedSet,

    #[error("No certification path could be found")]
    NoPathFound,

    #[error("Value should be a DER-encoded, X.509 v3 certificate")]
    InvalidDer,

    #[error("Invalid subject public key: {0}")]
    InvalidPublicKey(String),

    #[error("Failed to encode certificate: {0}")]
    Encoding(String),
}

/// CMS SignedData and EnvelopedData failures.
#[derive(Debug, Error)]
pub enum CmsError {
    #[error("Value is not DER-encoded")]
    InvalidDer,

    #[error("SignedData value is not wrapped in ContentInfo")]
    NotWrappedInContentInfo,

    #[error("ContentInfo wraps invalid SignedData value")]
    InvalidSignedData,

    #[error("EnvelopedData value is not wrapped in ContentInfo")]
    NotWrappedInEnvelopedContentInfo,

    #[error("ContentInfo wraps invalid EnvelopedData value")]
    InvalidEnvelopedData,

    #[error("SignedData should contain exactly one SignerInfo (got {0})")]
    SignerCount(usize),

    #[error("Certificate of the signer should be attached")]
    MissingSignerCertificate,

    #[error("Signed plaintext should be attached")]
    MissingPlaintext,

    #[error("Unsupported hashing algorithm ({0})")]
    UnsupportedHashingAlgorithm(String),

    #[error("Unsupported content encryption algorithm ({0})")]
    UnsupportedCipher(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Plaintext does not match attached content")]
    PlaintextMismatch,

    #[error("EnvelopedData should have at least one recipient")]
    UnknownRecipient,

    #[error("Failed to encrypt content-encryption key: {0}")]
    KeyEncryption(String),

    #[error("Failed to decrypt content-encryption key: {0}")]
    KeyDecryption(String),

    #[error("Invalid ciphertext or authentication tag")]
    Decryption,

    #[error("Failed to encode CMS value: {0}")]
    Encoding(String),

    #[error("Invalid certificate attached to CMS value: {0}")]
    AttachedCertificate(#[source] CertificateError),
}

/// RAMF serialization and deserialization failures.
#[derive(Debug, Error)]
pub enum RamfError {
    #[error("Recipient address should not span more than 1024 characters (got {0})")]
    RecipientAddressTooLong(usize),

    #[error("Recipient address should only contain printable ASCII characters")]
    MalformedRecipientAddress,

    #[error("Message id should not span more than 64 characters (got {0})")]
    IdTooLong(usize),

    #[error("Message id should only contain printable ASCII characters")]
    MalformedId,

    #[error("TTL should not exceed 15552000 seconds (got {0})")]
    TtlTooLong(u64),

    #[error("Payload should not span more than 8388608 octets (got {0})")]
    PayloadTooLong(usize),

    #[error("Serialization is too short to contain format signature")]
    TooShortForFormatSignature,

    #[error("Format signature should start with magic constant 'Relaynet'")]
    InvalidMagic,

    #[error("Message type should be 0x{expected:02x} (got 0x{actual:02x})")]
    UnexpectedMessageType { expected: u8, actual: u8 },

    #[error("Message version should be 0x{expected:02x} (got 0x{actual:02x})")]
    UnexpectedMessageVersion { expected: u8, actual: u8 },

    #[error("Message fields are not a DER-encoded")]
    FieldsNotDer,

    #[error("Message fields are not a ASN.1 sequence")]
    FieldsNotASequence,

    #[error("Field sequence should contain 5 items (got {0})")]
    FieldCount(usize),

    #[error("Creation time should be an ASN.1 DATE-TIME value")]
    MalformedCreationTime,

    #[error("Message field {0} is malformed")]
    MalformedField(&'static str),

    #[error(transparent)]
    Envelope(#[from] CmsError),
}

/// Failures decoding a message subtype, wrapping the underlying cause.
#[derive(Debug, Error)]
pub enum InvalidMessageError {
    #[error("Client registration is not a DER sequence")]
    RegistrationNotASequence,

    #[error("Client registration sequence should have at least two items (got {0})")]
    RegistrationFieldCount(usize),

    #[error("Client registration contains invalid client certificate")]
    InvalidClientCertificate(#[source] CertificateError),

    #[error("Client registration contains invalid server certificate")]
    InvalidServerCertificate(#[source] CertificateError),
}
