//! Text (JSON) envelope codec.
//!
//! ```json
//! {"chain":"<b64>","hint":0,"payload":{...},"signature":"<b64>","uuid":"...","version":35}
//! ```
//!
//! Keys are always emitted in alphabetical order. `chain`, `payload` and
//! `signature` are omitted when absent. The signature covers the canonical
//! JSON of the payload alone (see [`canonical_json`]), not the envelope.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProtocolDecoder, ProtocolEncoder};
use crate::{
    ProtocolMessage,
    errors::{ProtocolError, Result},
    payload::{
        Payload,
        json::{canonical_json, from_json, to_json},
    },
    message::CHAIN_LEN,
    signer::ProtocolSigner,
    version::{MessageType, Version},
};

/// Wire shape of the text envelope. Fields are declared alphabetically so
/// serialization order is the key order.
#[derive(Debug, Serialize, Deserialize)]
struct JsonEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    chain: Option<Vec<u8>>,
    #[serde(default)]
    hint: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    signature: Option<Vec<u8>>,
    uuid: Uuid,
    version: u8,
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| STANDARD.decode(text).map_err(D::Error::custom))
            .transpose()
    }
}

/// Text envelope encoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl JsonEncoder {
    /// Encoder instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProtocolEncoder for JsonEncoder {
    type Output = String;

    fn encode_sign<S: ProtocolSigner + ?Sized>(
        &self,
        message: &mut ProtocolMessage,
        signer: &S,
    ) -> Result<String> {
        let (_, ty) = message.version.validate()?;
        chain_for(ty, message.chain.as_deref())?;

        let signed = canonical_json(&message.payload)?;
        let signature = signer.sign(&message.uuid, &signed, 0, signed.len())?;
        message.signed = Some(signed);
        message.signature = Some(signature);

        self.encode(message)
    }

    fn encode(&self, message: &ProtocolMessage) -> Result<String> {
        let signature = message.signature.clone().ok_or(ProtocolError::MissingSignature)?;
        if message.signed.is_none() {
            return Err(ProtocolError::MissingSignedData);
        }
        let (_, ty) = message.version.validate()?;

        let envelope = JsonEnvelope {
            chain: chain_for(ty, message.chain.as_deref())?,
            hint: message.hint,
            payload: match &message.payload {
                Payload::Null => None,
                payload => Some(to_json(payload)?),
            },
            signature: Some(signature),
            uuid: message.uuid,
            version: message.version.to_byte(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

/// Chain value to serialize: chained messages always carry one (64 zero
/// bytes when absent), signed messages never do.
fn chain_for(ty: MessageType, chain: Option<&[u8]>) -> Result<Option<Vec<u8>>> {
    match (ty, chain) {
        (MessageType::Chained, Some(link)) => Ok(Some(link.to_vec())),
        (MessageType::Chained, None) => Ok(Some(vec![0; CHAIN_LEN])),
        (_, None) => Ok(None),
        (_, Some(_)) => Err(ProtocolError::format("only chained messages carry a chain link")),
    }
}

/// Text envelope decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Decoder instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode from a string
    ///
    /// # Errors
    ///
    /// See [`ProtocolDecoder::decode`].
    pub fn decode_str(&self, input: &str) -> Result<ProtocolMessage> {
        self.decode(input.as_bytes())
    }
}

impl ProtocolDecoder for JsonDecoder {
    fn decode(&self, input: &[u8]) -> Result<ProtocolMessage> {
        let envelope: JsonEnvelope = serde_json::from_slice(input)?;
        let version = Version::from_byte(envelope.version);
        match (version.validate()?, &envelope.chain) {
            ((_, MessageType::Chained), None) => {
                return Err(ProtocolError::format("chained envelope without chain"));
            },
            ((_, MessageType::Signed), Some(_)) => {
                return Err(ProtocolError::format("signed envelope with chain"));
            },
            _ => {},
        }

        let payload = match envelope.payload {
            Some(value) => from_json(value)?,
            None => Payload::Null,
        };
        let signed = if payload.is_null() { None } else { Some(canonical_json(&payload)?) };

        Ok(ProtocolMessage {
            version,
            uuid: envelope.uuid,
            chain: envelope.chain,
            hint: envelope.hint,
            payload,
            signed,
            signature: envelope.signature,
            ..ProtocolMessage::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SigningError;

    struct FixedSigner;

    impl ProtocolSigner for FixedSigner {
        fn sign(&self, _: &Uuid, _: &[u8], _: usize, _: usize) -> std::result::Result<Vec<u8>, SigningError> {
            Ok(vec![1, 2, 3])
        }
    }

    fn device() -> Uuid {
        Uuid::parse_str("6eac4d0b-16e6-4508-8c46-22e7451ea5a1").unwrap()
    }

    #[test]
    fn keys_alphabetical_and_optional_fields_omitted() {
        let mut msg = ProtocolMessage::new(
            Version::SIGNED,
            device(),
            0xEF,
            Payload::map([("b", Payload::Int(1)), ("a", Payload::from("x"))]),
        );
        let json = JsonEncoder.encode_sign(&mut msg, &FixedSigner).unwrap();
        assert_eq!(
            json,
            r#"{"hint":239,"payload":{"a":"x","b":1},"signature":"AQID","uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1","version":34}"#
        );
        assert_eq!(msg.signed.as_deref(), Some(&br#"{"a":"x","b":1}"#[..]));
    }

    #[test]
    fn round_trip_chained() {
        let mut msg = ProtocolMessage::chained(Version::CHAINED, device(), vec![7; 64], 0x00, vec![1u8, 2]);
        let json = JsonEncoder.encode_sign(&mut msg, &FixedSigner).unwrap();
        let decoded = JsonDecoder.decode_str(&json).unwrap();

        assert_eq!(decoded.chain, msg.chain);
        assert_eq!(decoded.signature, msg.signature);
        assert_eq!(decoded.signed, msg.signed);
        // binaries come back as their base64 text
        assert_eq!(decoded.payload, Payload::from("AQI="));
        assert_eq!(JsonEncoder.encode(&decoded).unwrap(), json);
    }

    #[test]
    fn missing_payload_leaves_signed_unset() {
        let json = r#"{"uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1","version":34,"hint":1}"#;
        let msg = JsonDecoder.decode_str(json).unwrap();
        assert!(msg.payload.is_null());
        assert_eq!(msg.signed, None);
        assert_eq!(msg.signature, None);
    }

    #[test]
    fn version_and_uuid_required() {
        assert!(matches!(JsonDecoder.decode_str(r#"{"version":34}"#), Err(ProtocolError::Json(_))));
        assert!(matches!(
            JsonDecoder.decode_str(r#"{"uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1"}"#),
            Err(ProtocolError::Json(_))
        ));
    }

    #[test]
    fn unsupported_versions_rejected() {
        for version in [0x21u8, 0x30, 0x11] {
            let mut msg = ProtocolMessage::new(version, device(), 0x00, 1);
            assert!(matches!(JsonEncoder.encode_sign(&mut msg, &FixedSigner), Err(ProtocolError::Format(_))));
        }
    }

    #[test]
    fn decode_rejects_unsupported_versions() {
        for version in [0x21u8, 0x30, 0x11, 0x00] {
            let json = format!(
                r#"{{"hint":0,"payload":1,"signature":"AQID","uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1","version":{version}}}"#
            );
            assert!(matches!(JsonDecoder.decode_str(&json), Err(ProtocolError::Format(_))), "{version:#x}");
        }
    }

    #[test]
    fn chain_only_on_chained_messages() {
        let mut signed = ProtocolMessage::chained(Version::SIGNED, device(), vec![1; 64], 0x00, 1);
        assert!(matches!(JsonEncoder.encode_sign(&mut signed, &FixedSigner), Err(ProtocolError::Format(_))));

        let mut unlinked = ProtocolMessage::new(Version::CHAINED, device(), 0x00, 1);
        let json = JsonEncoder.encode_sign(&mut unlinked, &FixedSigner).unwrap();
        assert_eq!(JsonDecoder.decode_str(&json).unwrap().chain, Some(vec![0; 64]));

        let signed_with_chain = r#"{"chain":"AAAA","hint":0,"payload":1,"signature":"AQID","uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1","version":34}"#;
        assert!(matches!(JsonDecoder.decode_str(signed_with_chain), Err(ProtocolError::Format(_))));
        let chained_without = r#"{"hint":0,"payload":1,"signature":"AQID","uuid":"6eac4d0b-16e6-4508-8c46-22e7451ea5a1","version":35}"#;
        assert!(matches!(JsonDecoder.decode_str(chained_without), Err(ProtocolError::Format(_))));
    }

    #[test]
    fn reassembly_requires_signature_and_signed() {
        let msg = ProtocolMessage::new(Version::SIGNED, device(), 0x00, 1);
        assert_eq!(JsonEncoder.encode(&msg), Err(ProtocolError::MissingSignature));
        let msg = ProtocolMessage { signature: Some(vec![1]), ..msg };
        assert_eq!(JsonEncoder.encode(&msg), Err(ProtocolError::MissingSignedData));
    }
}
