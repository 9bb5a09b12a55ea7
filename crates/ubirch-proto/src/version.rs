//! Protocol version byte.
//!
//! The version byte packs two values:
//!
//! - High nibble: protocol major version (`1` legacy, `2` current)
//! - Low nibble: message type ([`MessageType`])
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────────────┬───────────────┐
//! │ major version │ message type  │
//! └───────────────┴───────────────┘
//! ```
//!
//! Version 2 signed is therefore `0x22`, legacy chained `0x13`.

use std::fmt;

use crate::errors::{ProtocolError, Result};

/// Message type carried in the low nibble of the version byte
///
/// `Plain` is a representable value but no codec supports it; every encode or
/// decode path rejects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Unsigned message (reserved)
    Plain = 0x01,
    /// Signed message
    Signed = 0x02,
    /// Signed message linked to its predecessor's signature
    Chained = 0x03,
}

impl MessageType {
    /// Convert from the low nibble (returns `None` for unknown values)
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Plain),
            0x02 => Some(Self::Signed),
            0x03 => Some(Self::Chained),
            _ => None,
        }
    }

    /// Convert to the low-nibble value
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Protocol major versions understood by the codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorVersion {
    /// Legacy format: raw-string markers, heterogeneous payload encodings
    Legacy = 1,
    /// Current format
    Current = 2,
}

/// The version byte of an envelope
///
/// Parsing is infallible: all 256 byte values are representable so that a
/// decoded message can be displayed even when its version is unknown.
/// Validation happens in [`Version::validate`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version(u8);

impl Version {
    /// Current major version number
    pub const CURRENT_MAJOR: u8 = 2;

    /// Version 2 plain (reserved, rejected by all codecs)
    pub const PLAIN: Self = Self::new(Self::CURRENT_MAJOR, MessageType::Plain);

    /// Version 2 signed message (`0x22`)
    pub const SIGNED: Self = Self::new(Self::CURRENT_MAJOR, MessageType::Signed);

    /// Version 2 chained message (`0x23`)
    pub const CHAINED: Self = Self::new(Self::CURRENT_MAJOR, MessageType::Chained);

    /// Legacy signed message (`0x12`)
    pub const LEGACY_SIGNED: Self = Self::new(1, MessageType::Signed);

    /// Legacy chained message (`0x13`)
    pub const LEGACY_CHAINED: Self = Self::new(1, MessageType::Chained);

    /// Combine a major version and a message type
    #[must_use]
    pub const fn new(major: u8, message_type: MessageType) -> Self {
        Self((major << 4) | message_type.to_u8())
    }

    /// Create from the raw version byte
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    /// Raw version byte
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// High nibble
    #[must_use]
    pub const fn major(self) -> u8 {
        self.0 >> 4
    }

    /// Low nibble
    #[must_use]
    pub const fn type_nibble(self) -> u8 {
        self.0 & 0x0F
    }

    /// Message type, if the low nibble is known
    #[must_use]
    pub const fn message_type(self) -> Option<MessageType> {
        MessageType::from_u8(self.type_nibble())
    }

    /// Major version, if supported
    #[must_use]
    pub const fn major_version(self) -> Option<MajorVersion> {
        match self.major() {
            1 => Some(MajorVersion::Legacy),
            2 => Some(MajorVersion::Current),
            _ => None,
        }
    }

    /// True for legacy (major version 1) messages
    #[must_use]
    pub const fn is_legacy(self) -> bool {
        self.major() == 1
    }

    /// Check that this version can be encoded or decoded.
    ///
    /// Returns the major version and the message type, which is always
    /// [`MessageType::Signed`] or [`MessageType::Chained`].
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Format`] for an unknown major version, an unknown
    /// type nibble, or the reserved `Plain` type.
    pub fn validate(self) -> Result<(MajorVersion, MessageType)> {
        let major = self
            .major_version()
            .ok_or_else(|| ProtocolError::format(format!("unknown protocol version: {}", self.major())))?;

        match self.message_type() {
            Some(ty @ (MessageType::Signed | MessageType::Chained)) => Ok((major, ty)),
            _ => Err(ProtocolError::format(format!(
                "unknown protocol type: {:#06x}",
                self.type_nibble()
            ))),
        }
    }
}

impl From<u8> for Version {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Version({:#04x})", self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}
