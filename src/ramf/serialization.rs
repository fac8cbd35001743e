//! The RAMF wire format.
//!
//! A message is the 10-byte format signature ("Relaynet" + type + version)
//! followed by a DER SEQUENCE of five implicitly tagged fields, the whole
//! envelope wrapped in a CMS SignedData with the sender certificate
//! attached.

use chrono::{DateTime, NaiveDateTime, Utc};
use rsa::RsaPrivateKey;

use crate::asn1;
use crate::certificate::Certificate;
use crate::cms::SignedData;
use crate::error::{Asn1Error, CmsError, RamfError};
use crate::hashing::HashingAlgorithm;

/// Magic constant opening every RAMF serialization.
pub const RELAYNET_MAGIC: &[u8; 8] = b"Relaynet";

/// Length of magic + concrete message type + concrete message version.
pub const FORMAT_SIGNATURE_LENGTH: usize = 10;

pub const MAX_RECIPIENT_ADDRESS_LENGTH: usize = 1024;
pub const MAX_ID_LENGTH: usize = 64;
pub const MAX_TTL_SECONDS: u32 = 15_552_000;
pub const MAX_PAYLOAD_LENGTH: usize = 8 * 1024 * 1024;

const DATE_TIME_FORMAT: &str = "%Y%m%d%H%M%S";
const DATE_TIME_LENGTH: usize = 14;

/// The five RAMF fields, in wire order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldSet {
    /// Where the message is bound, as a VisibleString of up to 1024
    /// characters.
    pub recipient_address: String,
    /// Sender-chosen identifier of up to 64 VisibleString characters.
    pub id: String,
    /// When the message was created. Stored in UTC without sub-second
    /// precision.
    pub creation_date: DateTime<Utc>,
    /// Seconds the message remains valid for, capped at 180 days.
    pub ttl: u32,
    /// Opaque payload of up to 8 MiB.
    pub payload: Vec<u8>,
}

/// Serialize and sign a RAMF message.
pub fn serialize(
    fields: &FieldSet,
    concrete_message_type: u8,
    concrete_message_version: u8,
    sender_private_key: &RsaPrivateKey,
    sender_certificate: &Certificate,
    hashing_algorithm: HashingAlgorithm,
) -> Result<Vec<u8>, RamfError> {
    validate_fields(fields)?;

    let field_set_der = encode_field_set(fields);
    let mut envelope = Vec::with_capacity(FORMAT_SIGNATURE_LENGTH + field_set_der.len());
    envelope.extend_from_slice(RELAYNET_MAGIC);
    envelope.push(concrete_message_type);
    envelope.push(concrete_message_version);
    envelope.extend_from_slice(&field_set_der);

    let signed_data = SignedData::sign(
        &envelope,
        sender_private_key,
        sender_certificate,
        &[],
        hashing_algorithm,
    )?;
    Ok(signed_data.serialize()?)
}

/// Verify and parse a RAMF message, returning its fields and the sender
/// certificate attached to the envelope.
pub fn deserialize(
    serialization: &[u8],
    expected_message_type: u8,
    expected_message_version: u8,
) -> Result<(FieldSet, Certificate), RamfError> {
    let signed_data = SignedData::deserialize(serialization)?;
    let sender_certificate = signed_data.verify(None)?.clone();
    let envelope = signed_data.plaintext().ok_or(CmsError::MissingPlaintext)?;

    if envelope.len() < FORMAT_SIGNATURE_LENGTH {
        return Err(RamfError::TooShortForFormatSignature);
    }
    if &envelope[..RELAYNET_MAGIC.len()] != RELAYNET_MAGIC {
        return Err(RamfError::InvalidMagic);
    }
    let actual_type = envelope[8];
    if actual_type != expected_message_type {
        return Err(RamfError::UnexpectedMessageType {
            expected: expected_message_type,
            actual: actual_type,
        });
    }
    let actual_version = envelope[9];
    if actual_version != expected_message_version {
        return Err(RamfError::UnexpectedMessageVersion {
            expected: expected_message_version,
            actual: actual_version,
        });
    }

    let fields = decode_field_set(&envelope[FORMAT_SIGNATURE_LENGTH..])?;
    Ok((fields, sender_certificate))
}

fn validate_fields(fields: &FieldSet) -> Result<(), RamfError> {
    let address_length = fields.recipient_address.chars().count();
    if address_length > MAX_RECIPIENT_ADDRESS_LENGTH {
        return Err(RamfError::RecipientAddressTooLong(address_length));
    }
    if !is_visible(&fields.recipient_address) {
        return Err(RamfError::MalformedRecipientAddress);
    }
    let id_length = fields.id.chars().count();
    if id_length > MAX_ID_LENGTH {
        return Err(RamfError::IdTooLong(id_length));
    }
    if !is_visible(&fields.id) {
        return Err(RamfError::MalformedId);
    }
    if fields.ttl > MAX_TTL_SECONDS {
        return Err(RamfError::TtlTooLong(fields.ttl as u64));
    }
    if fields.payload.len() > MAX_PAYLOAD_LENGTH {
        return Err(RamfError::PayloadTooLong(fields.payload.len()));
    }
    Ok(())
}

fn is_visible(value: &str) -> bool {
    value.bytes().all(|byte| (0x20..=0x7e).contains(&byte))
}

/// DER SEQUENCE of the five fields under implicit context tags [0]..[4].
fn encode_field_set(fields: &FieldSet) -> Vec<u8> {
    let creation_date = fields
        .creation_date
        .with_timezone(&Utc)
        .format(DATE_TIME_FORMAT)
        .to_string();

    let mut content = Vec::new();
    asn1::write_tlv(&mut content, 0x80, fields.recipient_address.as_bytes());
    asn1::write_tlv(&mut content, 0x81, fields.id.as_bytes());
    asn1::write_tlv(&mut content, 0x82, creation_date.as_bytes());
    asn1::write_tlv(
        &mut content,
        0x83,
        &asn1::encode_integer_content(fields.ttl as u64),
    );
    asn1::write_tlv(&mut content, 0x84, &fields.payload);

    let mut serialization = Vec::with_capacity(content.len() + 4);
    asn1::write_tlv(&mut serialization, 0x30, &content);
    serialization
}

fn decode_field_set(serialization: &[u8]) -> Result<FieldSet, RamfError> {
    let items = asn1::deserialize_heterogeneous_sequence(serialization).map_err(
        |error| match error {
            Asn1Error::NotASequence => RamfError::FieldsNotASequence,
            _ => RamfError::FieldsNotDer,
        },
    )?;
    if items.len() != 5 {
        return Err(RamfError::FieldCount(items.len()));
    }

    let recipient_address = asn1::visible_string_content(&items[0])
        .map_err(|_| RamfError::MalformedField("recipientAddress"))?;
    let id =
        asn1::visible_string_content(&items[1]).map_err(|_| RamfError::MalformedField("id"))?;
    let creation_date = decode_creation_date(items[2].value())?;
    let ttl = asn1::decode_integer_content(items[3].value())
        .ok_or(RamfError::MalformedField("ttl"))?;
    if ttl > MAX_TTL_SECONDS as u64 {
        return Err(RamfError::TtlTooLong(ttl));
    }
    let payload = asn1::octet_string_content(&items[4])
        .map_err(|_| RamfError::MalformedField("payload"))?
        .to_vec();
    if payload.len() > MAX_PAYLOAD_LENGTH {
        return Err(RamfError::PayloadTooLong(payload.len()));
    }

    Ok(FieldSet {
        recipient_address,
        id,
        creation_date,
        ttl: ttl as u32,
        payload,
    })
}

/// Parse the DATE-TIME content. GeneralizedTime values (which carry a
/// trailing "Z" or sub-second digits) do not fit the 14-character shape and
/// are rejected.
fn decode_creation_date(content: &[u8]) -> Result<DateTime<Utc>, RamfError> {
    if content.len() != DATE_TIME_LENGTH {
        return Err(RamfError::MalformedCreationTime);
    }
    let text =
        std::str::from_utf8(content).map_err(|_| RamfError::MalformedCreationTime)?;
    let naive = NaiveDateTime::parse_from_str(text, DATE_TIME_FORMAT)
        .map_err(|_| RamfError::MalformedCreationTime)?;
    Ok(naive.and_utc())
}
