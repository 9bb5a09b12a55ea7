//! Snapshot tests for wire format stability.
//!
//! Every envelope here is signed with fixed keys, so the bytes never change.
//! If one of these fails, deployed devices and backends stop understanding
//! each other.

use insta::assert_snapshot;
use ubirch_harness::{Ed25519Keys, stubs::ZeroKeys};
use ubirch_proto::{
    JsonEncoder, MsgPackEncoder, Payload, ProtocolEncoder, ProtocolMessage, Version,
};
use uuid::Uuid;

fn binary_hex(mut msg: ProtocolMessage) -> String {
    hex::encode(MsgPackEncoder::new().encode_sign(&mut msg, &ZeroKeys).expect("encoding should succeed"))
}

#[test]
fn snapshot_signed_current() {
    let msg = ProtocolMessage::new(Version::SIGNED, Uuid::nil(), 0xEF, 1);
    assert_snapshot!(binary_hex(msg), @"9522c41000000000000000000000000000000000ccef01c44000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000");
}

#[test]
fn snapshot_signed_legacy() {
    let msg = ProtocolMessage::new(Version::LEGACY_SIGNED, Uuid::nil(), 0xEF, 1);
    assert_snapshot!(binary_hex(msg), @"9512c41000000000000000000000000000000000ccef01da004000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000");
}

#[test]
fn snapshot_chained_without_link() {
    let msg = ProtocolMessage::new(Version::CHAINED, Uuid::nil(), 0x00, Payload::Null);
    assert_snapshot!(binary_hex(msg), @"9623c41000000000000000000000000000000000c4400000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000c0c44000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000");
}

#[test]
fn snapshot_signed_ed25519() {
    let device = Uuid::parse_str("6eac4d0b-16e6-4508-8c46-22e7451ea5a1").expect("valid uuid");
    let mut msg = ProtocolMessage::new(Version::SIGNED, device, 0xEF, 1);
    let bytes = MsgPackEncoder::new()
        .encode_sign(&mut msg, &Ed25519Keys::from_secret(&[42; 32]))
        .expect("encoding should succeed");
    assert_snapshot!(hex::encode(bytes), @"9522c4106eac4d0b16e645088c4622e7451ea5a1ccef01c4406876d88f3c12ee406b0d74454f729d7375faccf6d5cd2930417a66e6b6cfc252ce74f4ad103441199470b38b3ccde1fd9bbcc4db960a622883b95aaa231b0209");
}

#[test]
fn snapshot_chained_json() {
    let payload = Payload::map([("on", Payload::Bool(true)), ("n", Payload::Int(1))]);
    let mut msg = ProtocolMessage::new(Version::CHAINED, Uuid::nil(), 0x00, payload);
    msg.chain = Some(vec![0; 64]);
    let json = JsonEncoder::new().encode_sign(&mut msg, &ZeroKeys).expect("encoding should succeed");
    assert_snapshot!(json, @r#"{"chain":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==","hint":0,"payload":{"n":1,"on":true},"signature":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==","uuid":"00000000-0000-0000-0000-000000000000","version":35}"#);
}
