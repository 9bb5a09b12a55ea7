//! Exhaustive positive space fuzzer for envelope encoding/decoding
//!
//! Every supported version is combined with edge-case identifiers, hints and
//! payload sizes. The fuzzer input picks the combination and supplies the
//! payload bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ubirch_proto::{
    MsgPackDecoder, MsgPackEncoder, Payload, ProtocolDecoder, ProtocolEncoder, ProtocolMessage,
    ProtocolSigner, SigningError, Version, hints,
};
use uuid::Uuid;

const VERSIONS: &[Version] =
    &[Version::SIGNED, Version::CHAINED, Version::LEGACY_SIGNED, Version::LEGACY_CHAINED];

const UUIDS: &[u128] = &[0, 1, u64::MAX as u128, u128::MAX];

const HINTS: &[u8] = &[hints::BINARY_OR_UNKNOWN, hints::KEY_REGISTRATION, hints::TRACKLE, hints::HASHED_PAYLOAD, 0x7F, 0x80, 0xFF];

// Crosses the bin8/bin16 and fixstr/str16 header boundaries
const PAYLOAD_SIZES: &[usize] = &[0, 1, 31, 32, 255, 256];

/// Signature length taken from the input, crossing marker boundaries
struct SizedSigner(usize);

impl ProtocolSigner for SizedSigner {
    fn sign(&self, _: &Uuid, _: &[u8], _: usize, _: usize) -> Result<Vec<u8>, SigningError> {
        Ok(vec![0xA5; self.0])
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let version = VERSIONS[data[0] as usize % VERSIONS.len()];
    let uuid = Uuid::from_u128(UUIDS[data[1] as usize % UUIDS.len()]);
    let hint = HINTS[data[2] as usize % HINTS.len()];
    let signer = SizedSigner([0, 31, 32, 64, 300][data[3] as usize % 5]);

    for &size in PAYLOAD_SIZES {
        let payload = if size <= data.len() - 4 { data[4..4 + size].to_vec() } else { vec![0u8; size] };

        let mut msg = ProtocolMessage::new(version, uuid, hint, Payload::Binary(payload.clone()));

        // INVARIANT 1: encoding must succeed
        let bytes = MsgPackEncoder::new()
            .encode_sign(&mut msg, &signer)
            .expect("encode should never fail for a binary payload");

        // INVARIANT 2: decoding must succeed
        let decoded = MsgPackDecoder::new().decode(&bytes).expect("decode should succeed for valid encoding");

        // INVARIANT 3: round trip is identity
        assert_eq!(decoded.version, version);
        assert_eq!(decoded.uuid, uuid);
        assert_eq!(decoded.hint, hint);
        assert_eq!(decoded.payload.as_binary(), Some(&payload[..]), "payload mismatch for size={size}");
        assert_eq!(decoded.signed, msg.signed);
        assert_eq!(decoded.signature, msg.signature);

        // INVARIANT 4: hashed payloads sign the payload bytes alone
        if hint == hints::HASHED_PAYLOAD {
            assert_eq!(decoded.signed.as_deref(), Some(&payload[..]));
        }
    }
});
