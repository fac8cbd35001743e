//! DER sequence helpers.
//!
//! Heterogeneous SEQUENCEs are modeled as slices of [`der::Any`]. Serializing
//! with implicit tagging replaces each child's tag with the positional
//! context tag `[0]..[n]`, preserving the constructed bit; explicit tagging
//! leaves the children untouched.

use der::asn1::ObjectIdentifier;
use der::{Any, Decode, DecodeOwned, Encode, Reader, SliceReader, Tag, Tagged};

use crate::error::Asn1Error;

const SEQUENCE_TAG: u8 = 0x30;
const CONTEXT_TAG_BASE: u8 = 0x80;
const CONSTRUCTED_BIT: u8 = 0x20;

/// DER-encode a SEQUENCE of the given items.
///
/// With `explicit_tagging` the items keep their own tags. Without it, each
/// item is retagged with the implicit context tag matching its position.
pub fn serialize_sequence(items: &[Any], explicit_tagging: bool) -> Result<Vec<u8>, Asn1Error> {
    let mut content = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if explicit_tagging {
            let encoded = item.to_der().map_err(|_| Asn1Error::InvalidDer)?;
            content.extend_from_slice(&encoded);
        } else {
            let constructed = if item.tag().is_constructed() {
                CONSTRUCTED_BIT
            } else {
                0
            };
            let tag = CONTEXT_TAG_BASE | constructed | (index as u8);
            write_tlv(&mut content, tag, item.value());
        }
    }
    let mut serialization = Vec::with_capacity(content.len() + 4);
    write_tlv(&mut serialization, SEQUENCE_TAG, &content);
    Ok(serialization)
}

/// Write one TLV with a definite, minimal DER length.
pub(crate) fn write_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    let length = content.len();
    if length < 0x80 {
        out.push(length as u8);
    } else {
        let length_bytes = length.to_be_bytes();
        let skip = length_bytes.iter().take_while(|&&b| b == 0).count();
        out.push(0x80 | (length_bytes.len() - skip) as u8);
        out.extend_from_slice(&length_bytes[skip..]);
    }
    out.extend_from_slice(content);
}

/// Parse a DER SEQUENCE into its child items, whatever their types.
pub fn deserialize_heterogeneous_sequence(serialization: &[u8]) -> Result<Vec<Any>, Asn1Error> {
    if serialization.is_empty() {
        return Err(Asn1Error::EmptyValue);
    }
    let outer = Any::from_der(serialization).map_err(|_| Asn1Error::InvalidDer)?;
    if outer.tag() != Tag::Sequence {
        return Err(Asn1Error::NotASequence);
    }
    let mut reader = SliceReader::new(outer.value()).map_err(|_| Asn1Error::InvalidDer)?;
    let mut items = Vec::new();
    while !reader.is_finished() {
        let item = reader.decode::<Any>().map_err(|_| Asn1Error::InvalidDer)?;
        items.push(item);
    }
    Ok(items)
}

/// Parse a DER SEQUENCE whose children must all decode as `T`.
pub fn deserialize_homogeneous_sequence<T: DecodeOwned>(
    serialization: &[u8],
) -> Result<Vec<T>, Asn1Error> {
    let items = deserialize_heterogeneous_sequence(serialization)?;
    let mut values = Vec::with_capacity(items.len());
    for item in &items {
        let encoded = item.to_der().map_err(|_| Asn1Error::InvalidDer)?;
        let value = T::from_der(&encoded).map_err(|_| {
            Asn1Error::UnexpectedItemType(std::any::type_name::<T>().to_string())
        })?;
        values.push(value);
    }
    Ok(values)
}

/// Reinterpret an implicitly tagged item as a VisibleString.
pub fn visible_string_content(item: &Any) -> Result<String, Asn1Error> {
    let bytes = item.value();
    if !bytes.iter().all(|&b| (0x20..=0x7e).contains(&b)) {
        return Err(Asn1Error::UnexpectedValueType("VisibleString"));
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| Asn1Error::UnexpectedValueType("VisibleString"))
}

/// Reinterpret an implicitly tagged item as an OCTET STRING.
pub fn octet_string_content(item: &Any) -> Result<&[u8], Asn1Error> {
    if item.tag().is_constructed() {
        return Err(Asn1Error::UnexpectedValueType("OCTET STRING"));
    }
    Ok(item.value())
}

/// Reinterpret an implicitly tagged item as an OBJECT IDENTIFIER.
pub fn oid_content(item: &Any) -> Result<ObjectIdentifier, Asn1Error> {
    ObjectIdentifier::from_bytes(item.value())
        .map_err(|_| Asn1Error::UnexpectedValueType("OBJECT IDENTIFIER"))
}

/// Minimal two's-complement content octets of a non-negative INTEGER.
pub(crate) fn encode_integer_content(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes
        .iter()
        .take_while(|&&b| b == 0)
        .count()
        .min(bytes.len() - 1);
    let mut content = bytes[skip..].to_vec();
    if content[0] & 0x80 != 0 {
        content.insert(0, 0);
    }
    content
}

/// Parse the content octets of a non-negative INTEGER.
pub(crate) fn decode_integer_content(content: &[u8]) -> Option<u64> {
    if content.is_empty() || content.len() > 9 {
        return None;
    }
    if content[0] & 0x80 != 0 {
        return None; // negative
    }
    let mut value: u64 = 0;
    for &byte in content {
        value = value.checked_mul(256)?.checked_add(byte as u64)?;
    }
    Some(value)
}
