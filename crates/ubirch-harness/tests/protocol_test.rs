//! End-to-end tests of the protocol façade with real and failing keys.

use std::sync::Arc;

use ubirch_core::{
    ChainStore, Error, Format, MemoryChainStore, Payload, Protocol, ProtocolError,
    ProtocolMessage, Version,
};
use ubirch_harness::{
    Ed25519Keys, init_tracing,
    stubs::{FailingKeys, ZeroKeys},
};
use uuid::Uuid;

/// First and second chained "hi!" envelopes of the `[42; 32]` test key
const FIRST_LINK: &str = "9623c4106eac4d0b16e645088c4622e7451ea5a1c4400000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000a3686921c44097ddd5b7f2c01b9dd951aa00e599914e0e64206712e707fc1e9a400b734831bda6e148586baac65bf3b704e5ae941978c646f699447d567bbda7b02f771eda01";
const SECOND_LINK: &str = "9623c4106eac4d0b16e645088c4622e7451ea5a1c44097ddd5b7f2c01b9dd951aa00e599914e0e64206712e707fc1e9a400b734831bda6e148586baac65bf3b704e5ae941978c646f699447d567bbda7b02f771eda0100a3686921c440312826b4e0bd44d044624f657bd5d4e27f34010980349fb3a8e16c41c5f7c7b81641f62d3003a6022feaaa8a9323daa09b3cba8e4baeb1020a424df720385501";

fn device() -> Uuid {
    Uuid::parse_str("6eac4d0b-16e6-4508-8c46-22e7451ea5a1").unwrap()
}

fn protocol() -> Protocol<Ed25519Keys> {
    init_tracing();
    Protocol::with_memory_chain(Ed25519Keys::from_secret(&[42; 32]))
}

#[test]
fn chained_sequence_matches_known_bytes() {
    let protocol = protocol();

    let mut first = ProtocolMessage::new(Version::CHAINED, device(), 0x00, "hi!");
    let bytes = protocol.encode_sign(&mut first, Format::MsgPackV1).unwrap();
    assert_eq!(hex::encode(&bytes), FIRST_LINK);

    let mut second = ProtocolMessage::new(Version::CHAINED, device(), 0x00, "hi!");
    let bytes = protocol.encode_sign(&mut second, Format::MsgPackV1).unwrap();
    assert_eq!(hex::encode(&bytes), SECOND_LINK);

    assert_eq!(second.chain, first.signature);
    assert_eq!(protocol.chain_store().last_signature(&device()), second.signature);
}

#[test]
fn chained_sequence_verifies_in_order() {
    let protocol = protocol();
    let mut previous = vec![0; 64];

    for n in 0..5 {
        let mut msg = ProtocolMessage::new(Version::CHAINED, device(), 0x00, n);
        let bytes = protocol.encode_sign(&mut msg, Format::MsgPackV1).unwrap();
        let decoded = protocol.decode_verify(&bytes).unwrap();

        assert_eq!(decoded.chain.as_ref(), Some(&previous));
        assert_eq!(decoded.payload, Payload::Int(n));
        previous = decoded.signature.unwrap();
    }
}

#[test]
fn devices_have_independent_chains() {
    let protocol = protocol();
    let other = Uuid::from_u128(1);

    let mut a = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 1);
    protocol.encode_sign(&mut a, Format::MsgPackV1).unwrap();
    let mut b = ProtocolMessage::new(Version::CHAINED, other, 0x00, 1);
    protocol.encode_sign(&mut b, Format::MsgPackV1).unwrap();

    assert_eq!(b.chain, Some(vec![0; 64]));
    assert_eq!(protocol.chain_store().len(), 2);
}

#[test]
fn signed_messages_are_recorded_but_not_linked() {
    let protocol = protocol();

    let mut signed = ProtocolMessage::new(Version::SIGNED, device(), 0x00, 1);
    protocol.encode_sign(&mut signed, Format::MsgPackV1).unwrap();
    assert_eq!(signed.chain, None);

    let mut chained = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 2);
    protocol.encode_sign(&mut chained, Format::MsgPackV1).unwrap();
    assert_eq!(chained.chain, signed.signature);
}

#[test]
fn shared_chain_store_links_across_formats() {
    init_tracing();
    let store = Arc::new(MemoryChainStore::new());
    let binary = Protocol::new(Ed25519Keys::from_secret(&[42; 32]), Arc::clone(&store));
    let text = Protocol::new(Ed25519Keys::from_secret(&[42; 32]), Arc::clone(&store));

    let mut first = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 1);
    binary.encode_sign(&mut first, Format::MsgPackV1).unwrap();
    let mut second = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 2);
    let json = text.encode_sign(&mut second, Format::JsonV1).unwrap();

    assert_eq!(second.chain, first.signature);
    let decoded = binary.decode_verify_as(&json, Format::JsonV1).unwrap();
    assert_eq!(decoded.chain, first.signature);
}

#[test]
fn tampered_bytes_fail_verification() {
    let protocol = protocol();
    let mut msg = ProtocolMessage::new(Version::SIGNED, device(), 0xEF, "hi!");
    let mut bytes = protocol.encode_sign(&mut msg, Format::MsgPackV1).unwrap();
    // last payload byte
    bytes[25] ^= 0x01;

    let err = protocol.decode_verify(&bytes).unwrap_err();
    assert!(err.is_verification_failure());
    assert!(matches!(err, Error::Protocol(ProtocolError::VerificationFailed(_))));
}

#[test]
fn malformed_bytes_are_not_verification_failures() {
    let protocol = protocol();
    for bytes in [&[][..], &[0x90], &[0x95, 0x22], &[0xc1]] {
        let err = protocol.decode_verify(bytes).unwrap_err();
        assert!(!err.is_verification_failure());
        assert!(matches!(&err, Error::Protocol(e) if e.is_format_error()), "{err}");
    }
}

#[test]
fn signer_failure_leaves_chain_untouched() {
    init_tracing();
    let protocol = Protocol::with_memory_chain(FailingKeys::new("hsm offline"));
    let mut msg = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 1);

    let err = protocol.encode_sign(&mut msg, Format::MsgPackV1).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::Signing(ref reason)) if reason.contains("hsm offline")));
    assert!(protocol.chain_store().is_empty());
    assert_eq!(msg.signature, None);
}

#[test]
fn verifier_failure_is_distinct_from_mismatch() {
    let signer = Protocol::with_memory_chain(ZeroKeys);
    let mut msg = ProtocolMessage::new(Version::SIGNED, device(), 0x00, 1);
    let bytes = signer.encode_sign(&mut msg, Format::MsgPackV1).unwrap();

    let verifier = Protocol::with_memory_chain(FailingKeys::new("key store down"));
    let err = verifier.decode_verify(&bytes).unwrap_err();
    assert!(matches!(err, Error::Protocol(ProtocolError::Verification(_))));
    assert!(!err.is_verification_failure());
}

#[test]
fn unknown_format_name_is_rejected() {
    let err = "protobuf".parse::<Format>().unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(ref name) if name == "protobuf"));
    assert!(err.to_string().contains("protobuf"));
}

#[test]
fn envelope_carries_raw_bytes() {
    let protocol = protocol();
    let mut msg = ProtocolMessage::new(Version::SIGNED, device(), 0x00, vec![1u8, 2, 3]);
    let bytes = protocol.encode_sign(&mut msg, Format::MsgPackV1).unwrap();

    let envelope = protocol.decode_verify_envelope(&bytes, Format::MsgPackV1).unwrap();
    assert_eq!(envelope.raw, Some(bytes));
    assert_eq!(envelope.message.payload, Payload::Binary(vec![1, 2, 3]));
}
