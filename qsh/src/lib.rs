//! # `qsh`
//!
//! A decoder for the QScalp History (QSH) tick data format, version 4, as
//! recorded by QScalp-compatible trading terminals for the Russian market.
//!
//! Aside from covering the header, stream-descriptor, and per-frame record
//! layout of the format, this crate exposes the variable-length integer
//! codec (ULEB128/SLEB128) and the three stateful delta decoders
//! ([`Relative`], [`Growing`], [`GrowingDateTime`]) the wire format is built
//! from, since a single frame's fields are meaningless without the running
//! state carried from every prior frame.
//!
//! Usage is simple:
//! ```no_run
//! use qsh::{Config, Parser};
//!
//! let mut parser = Parser::open("recording.qsh", Config::default())?;
//! for frame in parser.frames() {
//!     let frame = frame?;
//!     // ...
//! }
//! # Ok::<(), qsh::Error>(())
//! ```
#[deny(rustdoc::broken_intra_doc_links)]
mod config;
mod decoder;
mod iter;
mod leb128;
mod numeric;
mod reader;
mod record;

pub use config::{Config, TZ_ENV_VAR};
pub use decoder::{Header, Parser, ParserState, StreamDescriptor, StreamKind};
pub use iter::{Frame, FramePayload, Frames};
pub use record::{Quote, StockFrame, TradeRecord, TradeType};

pub use leb128::{decode_signed, decode_unsigned, encode_signed, encode_unsigned, SLEB_MAX_WIDTH, ULEB_MAX_WIDTH};

/// A UTC instant as decoded from a `DateTime` primitive or a
/// [`GrowingDateTime`] accumulator, before being presented in a [`Config`]'s
/// zone.
pub(crate) type Instant = chrono::DateTime<chrono::Utc>;

/// A calendar timestamp as presented to callers, localized to a [`Config`]'s
/// configured zone.
pub type Timestamp = chrono::DateTime<chrono_tz::Tz>;

/// The closed taxonomy of ways a QSH file can fail to decode.
///
/// Kinds carry the values needed to render their own message, following
/// the shape of a hand-written `thiserror` enum rather than a generic
/// "parse error" string.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The path passed to [`Parser::open`] does not resolve to a file.
    #[error("file not found")]
    FileNotFound,

    /// The first 19 bytes of the file are not `"QScalp History Data"`.
    #[error("bad signature")]
    BadSignature,

    /// `format_version` is not one of the versions this core supports ({4}).
    #[error("unsupported format version: {0}")]
    UnsupportedVersion(u8),

    /// `stream_count` in the header is not 1.
    #[error("multi-stream files are not supported (stream_count = {0})")]
    MultiStreamUnsupported(u8),

    /// The stream descriptor's `kind` byte is not `0x10` (Stock) or `0x20`
    /// (Deals).
    #[error("unsupported stream kind: {0:#04x}")]
    UnsupportedStreamKind(u8),

    /// A trade record's mask byte sets both direction bits (`M & 0x03 ==
    /// 3`), which is not a valid [`TradeType`].
    #[error("invalid trade direction bits: {0:#04b}")]
    InvalidTradeDirection(u8),

    /// A LEB128 value needed more than the configured maximum number of
    /// 7-bit groups to represent.
    #[error("LEB128 value exceeds the maximum width of {0} bytes")]
    Overflow(usize),

    /// The underlying source ran out of bytes mid-value or mid-frame.
    #[error("unexpected end of stream")]
    Truncated,

    /// A length-prefixed string field was not valid UTF-8.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A frame read was attempted before the header and stream descriptor
    /// had been parsed. Unreachable through the public constructors, which
    /// parse both eagerly, but kept as a reachable kind for API misuse and
    /// future incremental-construction use.
    #[error("parser used before initialization")]
    NotInitialized,
}

/// An error produced while decoding a QSH file, with enough context
/// (originating file and byte offset) to locate the failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} (file: {file}, offset: {offset})")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Error {
    /// What went wrong.
    pub kind: ErrorKind,

    /// Label of the file or stream being decoded, as passed to
    /// [`Parser::open`]/[`Parser::new`].
    pub file: String,

    /// Number of bytes consumed from the source before the failure.
    pub offset: u64,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, file: &str, offset: u64) -> Self {
        Error { kind, file: file.to_string(), offset }
    }
}
