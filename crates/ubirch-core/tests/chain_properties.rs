//! Property-based tests for chain linking in the protocol façade.
//!
//! These tests use proptest to verify invariants hold for any interleaving of
//! devices and formats:
//! - Every chained message links to its device's previous signature
//! - A device's first chained message links to 64 zero bytes
//! - Every encoded envelope decodes and verifies

use std::collections::HashMap;

use proptest::prelude::*;
use ubirch_core::{
    Format, Protocol, ProtocolMessage, ProtocolSigner, ProtocolVerifier, SigningError,
    VerificationError, Version,
};
use uuid::Uuid;

/// Signature folds the signed bytes into 64 bytes
struct FoldKeys;

impl FoldKeys {
    fn fold(data: &[u8]) -> Vec<u8> {
        let mut sig = vec![0u8; 64];
        for (i, b) in data.iter().enumerate() {
            sig[i % 64] = sig[i % 64].rotate_left(3) ^ b;
        }
        sig
    }
}

impl ProtocolSigner for FoldKeys {
    fn sign(&self, _: &Uuid, data: &[u8], offset: usize, len: usize) -> Result<Vec<u8>, SigningError> {
        Ok(Self::fold(&data[offset..offset + len]))
    }
}

impl ProtocolVerifier for FoldKeys {
    fn verify(&self, _: &Uuid, data: &[u8], offset: usize, len: usize, signature: &[u8]) -> Result<bool, VerificationError> {
        Ok(Self::fold(&data[offset..offset + len]) == signature)
    }
}

fn format_strategy() -> impl Strategy<Value = Format> {
    prop_oneof![Just(Format::MsgPackV1), Just(Format::JsonV1)]
}

fn step_strategy() -> impl Strategy<Value = (u8, Format, i64)> {
    (0u8..4, format_strategy(), any::<i64>())
}

#[test]
fn prop_chain_links_previous_signature() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    proptest!(|(steps in prop::collection::vec(step_strategy(), 1..24))| {
        let protocol = Protocol::with_memory_chain(FoldKeys);
        let mut last: HashMap<Uuid, Vec<u8>> = HashMap::new();

        for (device, format, value) in steps {
            let uuid = Uuid::from_u128(u128::from(device));
            let mut msg = ProtocolMessage::new(Version::CHAINED, uuid, 0x00, value);
            let bytes = protocol.encode_sign(&mut msg, format).unwrap();

            let expected = last.get(&uuid).cloned().unwrap_or_else(|| vec![0; 64]);
            prop_assert_eq!(msg.chain.as_ref(), Some(&expected));

            let decoded = protocol.decode_verify_as(&bytes, format).unwrap();
            prop_assert_eq!(&decoded.chain, &msg.chain);

            last.insert(uuid, msg.signature.clone().unwrap());
        }

        prop_assert_eq!(protocol.chain_store().len(), last.len());
    });
}

#[test]
fn prop_signed_messages_never_carry_a_link() {
    proptest!(|(value in any::<i64>(), format in format_strategy())| {
        let protocol = Protocol::with_memory_chain(FoldKeys);
        let mut msg = ProtocolMessage::new(Version::SIGNED, Uuid::nil(), 0x00, value);
        let bytes = protocol.encode_sign(&mut msg, format).unwrap();
        let decoded = protocol.decode_verify_as(&bytes, format).unwrap();

        prop_assert_eq!(msg.chain, None);
        prop_assert_eq!(decoded.chain, None);
    });
}
