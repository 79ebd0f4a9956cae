//! Text encoding for frames and responses.
//!
//! The wire charset is fixed per server. Decoding is strict: an invalid
//! byte sequence is an error, never replaced with a substitute character.

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Character encoding used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    /// 7-bit US-ASCII.
    Ascii,
    /// ISO-8859-1, one byte per code point up to U+00FF.
    Latin1,
}

/// Bytes that are not valid text under the wire charset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {charset} byte sequence at offset {valid_up_to}")]
pub struct DecodeError {
    pub charset: Charset,
    pub valid_up_to: usize,
}

/// Text that cannot be represented in the wire charset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("character {ch:?} cannot be encoded as {charset}")]
pub struct EncodeError {
    pub charset: Charset,
    pub ch: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown charset '{0}'")]
pub struct UnknownCharset(String);

impl Charset {
    /// Decode one frame into text.
    pub fn decode(&self, frame: &[u8]) -> Result<String, DecodeError> {
        match self {
            Charset::Utf8 => match std::str::from_utf8(frame) {
                Ok(s) => Ok(s.to_owned()),
                Err(e) => Err(DecodeError {
                    charset: *self,
                    valid_up_to: e.valid_up_to(),
                }),
            },
            Charset::Ascii => match frame.iter().position(|b| !b.is_ascii()) {
                Some(pos) => Err(DecodeError {
                    charset: *self,
                    valid_up_to: pos,
                }),
                // All bytes are ASCII, hence valid UTF-8.
                None => Ok(frame.iter().map(|&b| b as char).collect()),
            },
            Charset::Latin1 => Ok(frame.iter().map(|&b| b as char).collect()),
        }
    }

    /// Encode response text. No terminator is appended.
    pub fn encode(&self, text: &str) -> Result<Bytes, EncodeError> {
        match self {
            Charset::Utf8 => Ok(Bytes::copy_from_slice(text.as_bytes())),
            Charset::Ascii => Self::encode_narrow(*self, text, 0x7f),
            Charset::Latin1 => Self::encode_narrow(*self, text, 0xff),
        }
    }

    fn encode_narrow(charset: Charset, text: &str, max: u32) -> Result<Bytes, EncodeError> {
        let mut out = Vec::with_capacity(text.len());
        for ch in text.chars() {
            if ch as u32 > max {
                return Err(EncodeError { charset, ch });
            }
            out.push(ch as u8);
        }
        Ok(Bytes::from(out))
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Charset::Utf8 => "UTF-8",
            Charset::Ascii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
        };
        f.write_str(name)
    }
}

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Charset::Utf8),
            "us-ascii" | "ascii" => Ok(Charset::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" => Ok(Charset::Latin1),
            _ => Err(UnknownCharset(s.to_string())),
        }
    }
}
