use serde::{Deserialize, Serialize};
use std::fmt;

pub type Tick = i64; // musical time, monotonic in score

/// How an input artifact stores its notation payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Plain,
    Archive,
}

/// Byte-to-text policy applied to a payload before repair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingPolicy {
    /// Single-byte, total: byte `b` becomes `U+00b`.
    #[default]
    Latin1,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
    /// UTF-8, invalid input is an error.
    Utf8Strict,
}

impl EncodingPolicy {
    pub fn name(self) -> &'static str {
        match self {
            EncodingPolicy::Latin1 => "latin1",
            EncodingPolicy::Utf8Lossy => "utf8-lossy",
            EncodingPolicy::Utf8Strict => "utf8-strict",
        }
    }
}

impl fmt::Display for EncodingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotationFormat {
    MusicXml,
}

impl NotationFormat {
    pub fn extension(self) -> &'static str {
        match self {
            NotationFormat::MusicXml => "xml",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderFormat {
    Midi,
}

impl RenderFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RenderFormat::Midi => "mid",
        }
    }
}

/// Failure classes reported per artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputNotFound,
    UnsupportedFormat,
    NoPayloadFound,
    CorruptArchive,
    DecodeError,
    ConversionError,
    OutputWriteFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InputNotFound => "InputNotFound",
            ErrorKind::UnsupportedFormat => "UnsupportedFormat",
            ErrorKind::NoPayloadFound => "NoPayloadFound",
            ErrorKind::CorruptArchive => "CorruptArchive",
            ErrorKind::DecodeError => "DecodeError",
            ErrorKind::ConversionError => "ConversionError",
            ErrorKind::OutputWriteFailed => "OutputWriteFailed",
        };
        f.write_str(name)
    }
}
