//! End-to-end certification workflow: root CA, intermediate CA and
//! end-entity issuance, followed by path building against a trusted set.

use std::sync::OnceLock;

use chrono::{Duration, Utc};
use relaynet_core::certificate::{Certificate, IssuanceOptions};
use relaynet_core::hashing;
use relaynet_core::keys::RsaKeyPair;
use rsa::traits::PublicKeyParts;

struct Pki {
    root_keys: RsaKeyPair,
    intermediate_keys: RsaKeyPair,
    end_entity_keys: RsaKeyPair,
    root: Certificate,
    intermediate: Certificate,
    end_entity: Certificate,
}

fn pki() -> &'static Pki {
    static PKI: OnceLock<Pki> = OnceLock::new();
    PKI.get_or_init(|| {
        let expiry = Utc::now() + Duration::days(30);
        let root_keys = RsaKeyPair::generate().unwrap();
        let intermediate_keys = RsaKeyPair::generate().unwrap();
        let end_entity_keys = RsaKeyPair::generate().unwrap();

        let root = Certificate::issue(
            "root",
            &root_keys.public_key,
            &root_keys.private_key,
            expiry,
            IssuanceOptions {
                is_ca: true,
                path_length: 2,
                ..Default::default()
            },
        )
        .unwrap();

        let intermediate = Certificate::issue(
            "intermediate",
            &intermediate_keys.public_key,
            &root_keys.private_key,
            expiry,
            IssuanceOptions {
                issuer_certificate: Some(&root),
                is_ca: true,
                path_length: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let end_entity = Certificate::issue(
            "end-entity",
            &end_entity_keys.public_key,
            &intermediate_keys.private_key,
            expiry,
            IssuanceOptions {
                issuer_certificate: Some(&intermediate),
                ..Default::default()
            },
        )
        .unwrap();

        Pki {
            root_keys,
            intermediate_keys,
            end_entity_keys,
            root,
            intermediate,
            end_entity,
        }
    })
}

#[test]
fn self_signed_root_carries_the_full_extension_profile() {
    let pki = pki();

    assert!(pki.root.is_ca());
    assert_eq!(pki.root.path_length(), Some(2));
    assert_eq!(pki.root.common_name().unwrap(), "root");

    // Self-issued: the authority digest is the subject's own digest.
    let ski = pki.root.subject_key_identifier().unwrap();
    let aki = pki.root.authority_key_identifier().unwrap();
    assert_eq!(ski, aki);
    assert_eq!(ski.len(), 32);
}

#[test]
fn issued_certificates_chain_through_key_identifiers() {
    let pki = pki();

    assert_eq!(
        pki.intermediate.authority_key_identifier().unwrap(),
        pki.root.subject_key_identifier().unwrap(),
    );
    assert_eq!(
        pki.end_entity.authority_key_identifier().unwrap(),
        pki.intermediate.subject_key_identifier().unwrap(),
    );
    assert!(!pki.end_entity.is_ca());
}

#[test]
fn path_runs_from_end_entity_to_trust_anchor() {
    let pki = pki();

    let path = pki
        .end_entity
        .get_certification_path(
            std::slice::from_ref(&pki.intermediate),
            std::slice::from_ref(&pki.root),
        )
        .unwrap();

    assert_eq!(path.len(), 3);
    assert_eq!(path[0], pki.end_entity);
    assert_eq!(path[1], pki.intermediate);
    assert_eq!(path[2], pki.root);
}

#[test]
fn path_building_requires_a_trusted_set() {
    let pki = pki();
    let error = pki.end_entity.get_certification_path(&[], &[]).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Failed to initialize path builder; set of trusted CAs might be empty",
    );
}

#[test]
fn unrelated_roots_yield_no_path() {
    let pki = pki();
    let stranger_keys = RsaKeyPair::generate().unwrap();
    let stranger = Certificate::issue(
        "stranger",
        &stranger_keys.public_key,
        &stranger_keys.private_key,
        Utc::now() + Duration::days(30),
        IssuanceOptions {
            is_ca: true,
            ..Default::default()
        },
    )
    .unwrap();

    let error = pki
        .end_entity
        .get_certification_path(
            std::slice::from_ref(&pki.intermediate),
            std::slice::from_ref(&stranger),
        )
        .unwrap_err();
    assert_eq!(error.to_string(), "No certification path could be found");
}

#[test]
fn a_trusted_ca_among_the_intermediates_does_not_short_circuit() {
    let pki = pki();

    // The root also appears in the intermediate store; the path must still
    // be the real issuing chain ending at the trusted anchor.
    let intermediates = vec![pki.root.clone(), pki.intermediate.clone()];
    let path = pki
        .end_entity
        .get_certification_path(&intermediates, std::slice::from_ref(&pki.root))
        .unwrap();

    assert_eq!(path.len(), 3);
    assert_eq!(path[1], pki.intermediate);
    assert_eq!(path[2], pki.root);
}

#[test]
fn private_addresses_digest_the_public_key() {
    use rsa::pkcs8::EncodePublicKey;

    let pki = pki();
    let address = pki.end_entity.subject_private_address().unwrap();

    assert!(address.starts_with('0'));
    assert_eq!(address.len(), 65);
    let spki_der = pki
        .end_entity
        .subject_public_key()
        .unwrap()
        .to_public_key_der()
        .unwrap();
    assert_eq!(&address[1..], hashing::sha256_hex(spki_der.as_bytes()));
}

#[test]
fn keys_stay_usable_across_the_pki() {
    // The caller-supplied key material must not be consumed by issuance.
    let pki = pki();
    assert_eq!(pki.root_keys.public_key.size() * 8, 2048);
    assert_eq!(pki.intermediate_keys.public_key.size() * 8, 2048);
    assert_eq!(pki.end_entity_keys.public_key.size() * 8, 2048);
}
