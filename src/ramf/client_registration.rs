//! Client registration: the DER container delivering a newly issued client
//! certificate together with the server's own certificate.

use crate::asn1;
use crate::certificate::Certificate;
use crate::error::{CertificateError, InvalidMessageError};

/// The two certificates exchanged when a client registers with a server.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientRegistration {
    pub client_certificate: Certificate,
    pub server_certificate: Certificate,
}

impl ClientRegistration {
    pub fn new(client_certificate: Certificate, server_certificate: Certificate) -> Self {
        Self {
            client_certificate,
            server_certificate,
        }
    }

    /// DER SEQUENCE of the two certificates as implicitly tagged OCTET
    /// STRINGs: [0] client, [1] server.
    pub fn serialize(&self) -> Vec<u8> {
        let mut content = Vec::new();
        asn1::write_tlv(&mut content, 0x80, self.client_certificate.der());
        asn1::write_tlv(&mut content, 0x81, self.server_certificate.der());

        let mut serialization = Vec::with_capacity(content.len() + 4);
        asn1::write_tlv(&mut serialization, 0x30, &content);
        serialization
    }

    pub fn deserialize(serialization: &[u8]) -> Result<Self, InvalidMessageError> {
        let items = asn1::deserialize_heterogeneous_sequence(serialization)
            .map_err(|_| InvalidMessageError::RegistrationNotASequence)?;
        if items.len() < 2 {
            return Err(InvalidMessageError::RegistrationFieldCount(items.len()));
        }

        let client_der = asn1::octet_string_content(&items[0])
            .map_err(|_| InvalidMessageError::InvalidClientCertificate(CertificateError::InvalidDer))?;
        let client_certificate = Certificate::deserialize(client_der)
            .map_err(InvalidMessageError::InvalidClientCertificate)?;

        let server_der = asn1::octet_string_content(&items[1])
            .map_err(|_| InvalidMessageError::InvalidServerCertificate(CertificateError::InvalidDer))?;
        let server_certificate = Certificate::deserialize(server_der)
            .map_err(InvalidMessageError::InvalidServerCertificate)?;

        Ok(Self {
            client_certificate,
            server_certificate,
        })
    }
}
