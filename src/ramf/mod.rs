//! Relaynet Abstract Message Format: the signed, store-and-forward message
//! envelope.

pub mod client_registration;
pub mod message;
pub mod serialization;

pub use client_registration::ClientRegistration;
pub use message::{
    Cargo, CargoCollectionAuthorization, CargoCollectionAuthorizationKind, CargoKind, Message,
    MessageKind, Parcel, ParcelKind,
};
pub use serialization::{
    deserialize, serialize, FieldSet, MAX_ID_LENGTH, MAX_PAYLOAD_LENGTH,
    MAX_RECIPIENT_ADDRESS_LENGTH, MAX_TTL_SECONDS, RELAYNET_MAGIC,
};
