//! Random-input fuzzer for binary envelope decoding
//!
//! Arbitrary bytes must never panic, and whenever a full decode succeeds the
//! cheap signed-span extraction must return the same bytes and re-assembly
//! must reproduce the frame.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ubirch_proto::{MsgPackDecoder, MsgPackEncoder, ProtocolDecoder, ProtocolEncoder};

fuzz_target!(|data: &[u8]| {
    let decoder = MsgPackDecoder::new();
    let fast = decoder.data_to_verify_and_signature(data);
    let hashed = decoder.is_hashed_payload(data);

    let Ok(msg) = decoder.decode(data) else {
        return;
    };

    // INVARIANT 1: fast path agrees with the full decode
    let (signed, signature) = fast.expect("fast path must accept what decode accepts");
    assert_eq!(Some(signed), msg.signed);
    assert_eq!(Some(signature), msg.signature);

    // INVARIANT 2: hashed-payload check agrees with the decoded hint
    assert_eq!(hashed, msg.is_hashed_payload());

    // INVARIANT 3: re-assembly reproduces the decoded frame byte for byte
    let bytes = MsgPackEncoder::new().encode(&msg).expect("decoded envelope must re-assemble");
    assert!(data.starts_with(&bytes), "re-assembled frame differs from input");
});
