//! Bounded application payloads
#[cfg(feature = "std")]
use core::fmt;
use core::str::FromStr;

use heapless::Vec;

use crate::MAX_DATA_SIZE;

pub type Payload = Vec<u8, MAX_DATA_SIZE>;

#[derive(PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum ParsePayloadError {
    Empty,
    PayloadTooLong,
    InvalidHex(base16::DecodeError),
}

impl From<base16::DecodeError> for ParsePayloadError {
    fn from(e: base16::DecodeError) -> ParsePayloadError {
        ParsePayloadError::InvalidHex(e)
    }
}

#[cfg(feature = "std")]
impl fmt::Display for ParsePayloadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParsePayloadError::Empty => f.write_str("empty payload"),
            ParsePayloadError::PayloadTooLong => {
                write!(f, "payload longer than {} bytes", MAX_DATA_SIZE)
            }
            ParsePayloadError::InvalidHex(e) => write!(f, "invalid hex: {:?}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParsePayloadError {}

/// Payload written as hex digits, optionally prefixed with `0x`
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct HexPayload(pub Payload);

impl FromStr for HexPayload {
    type Err = ParsePayloadError;

    fn from_str(s: &str) -> Result<Self, ParsePayloadError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.is_empty() {
            return Err(ParsePayloadError::Empty);
        }
        if digits.len() / 2 > MAX_DATA_SIZE {
            return Err(ParsePayloadError::PayloadTooLong);
        }

        let mut data = Payload::new();
        data.resize_default(digits.len() / 2)
            .map_err(|_| ParsePayloadError::PayloadTooLong)?;
        let len = base16::decode_slice(digits, &mut data)?;
        data.truncate(len);
        Ok(HexPayload(data))
    }
}

impl HexPayload {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}
