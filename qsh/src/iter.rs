//! The per-frame iterator handed out by [`crate::Parser::frames`] (§4.6).
//!
//! Grounded on `itm::Timestamps`/`itm::Singles`: both wrap a `&mut
//! Decoder` and implement `Iterator<Item = Result<_, Error>>`, stopping
//! cleanly at a clean end of stream and surfacing decode errors as `Some(Err(_))`
//! rather than panicking. `Frames` follows the same shape, one level up:
//! it always yields a fully-assembled [`Frame`] (timestamp plus payload)
//! since QSH, unlike ITM, never needs a raw/cooked two-pass split.

use std::io::BufRead;

use crate::record::{StockFrame, TradeRecord};
use crate::{Error, Parser, Timestamp};

/// A frame's payload, dispatched by the stream's [`crate::StreamKind`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FramePayload {
    Trade(TradeRecord),
    Stock(StockFrame),
}

/// One decoded frame: a timestamp (localized to the parser's
/// [`crate::Config`]) plus its payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub timestamp: Timestamp,
    pub payload: FramePayload,
}

/// Iterator over a [`Parser`]'s remaining frames.
///
/// Ends (`None`) the moment the underlying source reports a clean end of
/// file at a frame boundary. A truncated frame — the source running out
/// partway through a timestamp or payload — surfaces as `Some(Err(_))`
/// rather than being swallowed as a clean end.
pub struct Frames<'a, R: BufRead> {
    parser: &'a mut Parser<R>,
}

impl<'a, R: BufRead> Frames<'a, R> {
    pub(crate) fn new(parser: &'a mut Parser<R>) -> Self {
        Frames { parser }
    }
}

impl<'a, R: BufRead> Iterator for Frames<'a, R> {
    type Item = Result<Frame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_frame()
    }
}
