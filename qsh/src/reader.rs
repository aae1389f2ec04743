//! The positioned byte source every decoder in this crate pulls from, and
//! the fixed-width primitive reads built on top of it (§4.2).
//!
//! Grounded on `itm::Buffer<R>`: a private struct that owns the `Read`
//! instance and does all the low-level pulling, so the rest of the crate
//! only ever sees a handful of `pop_*`-style methods. This version works at
//! byte granularity (QSH has no sub-byte fields) and additionally tracks
//! how many bytes have been consumed, so every [`Error`](crate::Error) can
//! report where in the stream it happened.

use std::io::{self, BufRead};

use chrono::{NaiveDate, TimeZone, Utc};

use crate::{leb128, Error, ErrorKind, Instant};

/// Number of bytes a ULEB128-prefixed string's length may occupy, same
/// as any other unsigned LEB128 field (§4.2).
const STRING_LEN_MAX_WIDTH: usize = leb128::ULEB_MAX_WIDTH;

pub(crate) struct Source<R: BufRead> {
    reader: R,
    file: String,
    offset: u64,
}

impl<R: BufRead> Source<R> {
    pub(crate) fn new(reader: R, file: impl Into<String>) -> Self {
        Source { reader, file: file.into(), offset: 0 }
    }

    pub(crate) fn file(&self) -> &str {
        &self.file
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset
    }

    pub(crate) fn error(&self, kind: ErrorKind) -> Error {
        Error::new(kind, &self.file, self.offset)
    }

    /// True if there is nothing left to read. Used at frame boundaries to
    /// distinguish a clean end of file from a truncated frame.
    pub(crate) fn eof(&mut self) -> Result<bool, Error> {
        self.reader.fill_buf().map(|buf| buf.is_empty()).map_err(|_| self.error(ErrorKind::Truncated))
    }

    pub(crate) fn byte(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.fill_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; n];
        self.fill_exact(&mut buf)?;
        Ok(buf)
    }

    fn fill_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        match self.reader.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(self.error(ErrorKind::Truncated)),
            Err(_) => Err(self.error(ErrorKind::Truncated)),
        }
    }

    pub(crate) fn uint16(&mut self) -> Result<u16, Error> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn uint32(&mut self) -> Result<u32, Error> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn int64(&mut self) -> Result<i64, Error> {
        let b = self.bytes(8)?;
        Ok(i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    pub(crate) fn double(&mut self) -> Result<f64, Error> {
        let b = self.bytes(8)?;
        Ok(f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
    }

    /// Reads a .NET-ticks timestamp and converts it to a UTC instant.
    /// Presentation in the configured zone happens at the API boundary
    /// (`Header::record_start_time`, `Frame::timestamp`), not here.
    pub(crate) fn datetime(&mut self) -> Result<Instant, Error> {
        let ticks = self.int64()?;
        Ok(ticks_to_instant(ticks))
    }

    pub(crate) fn string(&mut self) -> Result<String, Error> {
        let len = leb128::read_unsigned(self, STRING_LEN_MAX_WIDTH)?;
        let bytes = self.bytes(len as usize)?;
        String::from_utf8(bytes).map_err(|_| self.error(ErrorKind::InvalidUtf8))
    }
}

/// 0001-01-01 00:00:00 UTC, the epoch both .NET ticks and `GrowingDateTime`
/// baselines are measured from.
pub(crate) fn epoch() -> Instant {
    Utc.from_utc_datetime(&NaiveDate::from_ymd_opt(1, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
}

/// Converts a signed count of 100ns intervals since [`epoch`] (.NET Ticks)
/// to microsecond precision, per §3's `DateTime primitive`.
pub(crate) fn ticks_to_instant(ticks: i64) -> Instant {
    epoch() + chrono::Duration::microseconds(ticks / 10)
}
