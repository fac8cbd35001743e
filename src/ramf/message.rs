//! Typed RAMF messages.
//!
//! Each registered message subtype is a marker carrying its
//! (concrete type, concrete version) pair; the codec itself treats payloads
//! as opaque bytes.

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;

use super::serialization::{self, FieldSet};
use crate::certificate::Certificate;
use crate::error::RamfError;
use crate::hashing::HashingAlgorithm;

/// A registered RAMF message subtype.
pub trait MessageKind {
    const CONCRETE_MESSAGE_TYPE: u8;
    const CONCRETE_MESSAGE_VERSION: u8;
}

/// Parcel (0x50, 0x00).
pub enum ParcelKind {}

impl MessageKind for ParcelKind {
    const CONCRETE_MESSAGE_TYPE: u8 = 0x50;
    const CONCRETE_MESSAGE_VERSION: u8 = 0x00;
}

/// Cargo (0x43, 0x00).
pub enum CargoKind {}

impl MessageKind for CargoKind {
    const CONCRETE_MESSAGE_TYPE: u8 = 0x43;
    const CONCRETE_MESSAGE_VERSION: u8 = 0x00;
}

/// Cargo Collection Authorization (0x44, 0x00).
pub enum CargoCollectionAuthorizationKind {}

impl MessageKind for CargoCollectionAuthorizationKind {
    const CONCRETE_MESSAGE_TYPE: u8 = 0x44;
    const CONCRETE_MESSAGE_VERSION: u8 = 0x00;
}

/// A RAMF message: the field set bound to the sender certificate that signs
/// its envelope.
pub struct Message<K: MessageKind> {
    fields: FieldSet,
    sender_certificate: Certificate,
    kind: PhantomData<K>,
}

impl<K: MessageKind> std::fmt::Debug for Message<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("fields", &self.fields)
            .field("sender_certificate", &self.sender_certificate)
            .finish()
    }
}

pub type Parcel = Message<ParcelKind>;
pub type Cargo = Message<CargoKind>;
pub type CargoCollectionAuthorization = Message<CargoCollectionAuthorizationKind>;

impl<K: MessageKind> Message<K> {
    pub fn new(
        recipient_address: impl Into<String>,
        id: impl Into<String>,
        creation_date: DateTime<Utc>,
        ttl: u32,
        payload: Vec<u8>,
        sender_certificate: Certificate,
    ) -> Self {
        Self {
            fields: FieldSet {
                recipient_address: recipient_address.into(),
                id: id.into(),
                creation_date,
                ttl,
                payload,
            },
            sender_certificate,
            kind: PhantomData,
        }
    }

    /// Sign and serialize the message with the sender's private key.
    pub fn serialize(
        &self,
        sender_private_key: &RsaPrivateKey,
        hashing_algorithm: HashingAlgorithm,
    ) -> Result<Vec<u8>, RamfError> {
        serialization::serialize(
            &self.fields,
            K::CONCRETE_MESSAGE_TYPE,
            K::CONCRETE_MESSAGE_VERSION,
            sender_private_key,
            &self.sender_certificate,
            hashing_algorithm,
        )
    }

    /// Verify and parse a serialized message of this subtype.
    pub fn deserialize(serialization: &[u8]) -> Result<Self, RamfError> {
        let (fields, sender_certificate) = serialization::deserialize(
            serialization,
            K::CONCRETE_MESSAGE_TYPE,
            K::CONCRETE_MESSAGE_VERSION,
        )?;
        Ok(Self {
            fields,
            sender_certificate,
            kind: PhantomData,
        })
    }

    pub fn recipient_address(&self) -> &str {
        &self.fields.recipient_address
    }

    pub fn id(&self) -> &str {
        &self.fields.id
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.fields.creation_date
    }

    pub fn ttl(&self) -> u32 {
        self.fields.ttl
    }

    /// When the message stops being valid.
    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.fields.creation_date + chrono::Duration::seconds(self.fields.ttl as i64)
    }

    pub fn payload(&self) -> &[u8] {
        &self.fields.payload
    }

    pub fn sender_certificate(&self) -> &Certificate {
        &self.sender_certificate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::IssuanceOptions;
    use crate::keys::RsaKeyPair;
    use chrono::{Duration, Timelike};
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
                "courier",
                &keys.public_key,
                &keys.private_key,
                Utc::now() + Duration::days(1),
                IssuanceOptions::default(),
            )
            .unwrap();
            Fixture { keys, certificate }
        })
    }

    fn new_parcel() -> Parcel {
        Parcel::new(
            "https://gb.relaycorp.tech",
            "parcel-1",
            Utc::now().with_nanosecond(0).unwrap(),
            3600,
            b"service message".to_vec(),
            fixture().certificate.clone(),
        )
    }

    #[test]
    fn parcel_round_trip_binds_the_sender_certificate() {
        let fixture = fixture();
        let parcel = new_parcel();
        let serialization = parcel
            .serialize(&fixture.keys.private_key, HashingAlgorithm::Sha256)
            .unwrap();

        let parsed = Parcel::deserialize(&serialization).unwrap();
        assert_eq!(parsed.id(), "parcel-1");
        assert_eq!(parsed.payload(), b"service message");
        assert_eq!(parsed.sender_certificate(), &fixture.certificate);
    }

    #[test]
    fn subtype_constants_are_enforced() {
        let fixture = fixture();
        let parcel = new_parcel();
        let serialization = parcel
            .serialize(&fixture.keys.private_key, HashingAlgorithm::Sha256)
            .unwrap();

        let error = Cargo::deserialize(&serialization).unwrap_err();
        assert_eq!(error.to_string(), "Message type should be 0x43 (got 0x50)");
    }

    #[test]
    fn expiry_date_adds_the_ttl() {
        let parcel = new_parcel();
        assert_eq!(
            parcel.expiry_date() - parcel.creation_date(),
            Duration::seconds(3600),
        );
    }
}
