//! The three stateful delta decoders the wire format layers its LEB128
//! codec on top of (§4.3): [`Relative`], [`Growing`], and
//! [`GrowingDateTime`]. None of these are public — a lone `Relative`
//! value is meaningless without the accumulator it was read against, so
//! the only thing this crate exposes is the fully-decoded record types in
//! [`crate::record`] that own them.
//!
//! Each decoder owns its running state and is meant to live for exactly as
//! long as the field it tracks does: one per field per stream, never
//! shared across unrelated fields, but persisted across every frame and
//! (for `Relative`) across every quote within a stock frame too.

use std::io::BufRead;

use chrono::Duration;

use crate::leb128;
use crate::reader::{epoch, Source};
use crate::{Error, Instant, ULEB_MAX_WIDTH};

/// `u == 268_435_455` is the escape sentinel: the largest value a 4-byte
/// ULEB128 group (`ULEB_MAX_WIDTH`) can represent. At this width the two
/// ways of stating the escape condition in the format description (`u ==
/// sentinel` and `u > sentinel - 1`) coincide.
const GROWING_ESCAPE: u64 = 268_435_455;

/// Reads the raw wire value a `Growing`-family field is built from: a
/// ULEB128 group, or — when that group equals [`GROWING_ESCAPE`] — a
/// plain SLEB128 value read in its place. This step carries no state of
/// its own; [`Growing`] and [`GrowingDateTime`] each layer their own
/// accumulation rule on top of it.
///
/// Grounded on `2dav-qsh-rs`'s `growing()`, which is exactly this
/// stateless read (no running total): `match uleb()? { SENTINEL => leb(),
/// x => Ok(x) }`.
fn read_raw<R: BufRead>(source: &mut Source<R>) -> Result<i64, Error> {
    let u = leb128::read_unsigned(source, ULEB_MAX_WIDTH)?;
    if u == GROWING_ESCAPE {
        leb128::read_signed(source, crate::SLEB_MAX_WIDTH)
    } else {
        Ok(u as i64)
    }
}

/// A signed running accumulator: each read adds a signed LEB128 delta to
/// the last value produced and returns the new total.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Relative {
    last: i64,
}

impl Relative {
    pub(crate) fn new() -> Self {
        Relative { last: 0 }
    }

    pub(crate) fn read<R: BufRead>(&mut self, source: &mut Source<R>) -> Result<i64, Error> {
        let delta = leb128::read_signed(source, crate::SLEB_MAX_WIDTH)?;
        self.last += delta;
        Ok(self.last)
    }
}

/// An unsigned running accumulator: each read adds [`read_raw`]'s value
/// (a small ULEB128 delta, or an escaped SLEB128 value) to the last total
/// produced and returns the new total.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Growing {
    last: i64,
}

impl Growing {
    pub(crate) fn new() -> Self {
        Growing { last: 0 }
    }

    pub(crate) fn read<R: BufRead>(&mut self, source: &mut Source<R>) -> Result<u64, Error> {
        self.last += read_raw(source)?;
        Ok(self.last as u64)
    }
}

/// An accumulator over wall-clock instants.
///
/// Each read takes [`read_raw`]'s value as a millisecond count `g`. If
/// `g` converted to a duration spans more than one calendar day, `g` is
/// reinterpreted as an *absolute* count of milliseconds since
/// 0001-01-01 and the baseline is reset to that instant. Otherwise `g`
/// is a small offset from the current (unmoved) baseline. A file's
/// encoder keeps every ordinary frame's `g` small by measuring it from
/// the last reset rather than compounding it frame over frame, which is
/// exactly what lets the day-span check double as "was this an absolute
/// resync or an ordinary small step".
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowingDateTime {
    baseline: Instant,
}

impl GrowingDateTime {
    pub(crate) fn new(baseline: Instant) -> Self {
        GrowingDateTime { baseline }
    }

    pub(crate) fn read<R: BufRead>(&mut self, source: &mut Source<R>) -> Result<Instant, Error> {
        let g = read_raw(source)?;
        let delta = Duration::milliseconds(g);
        if delta.num_days().abs() > 1 {
            self.baseline = epoch() + delta;
            Ok(self.baseline)
        } else {
            Ok(self.baseline + delta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leb128::{encode_signed, encode_unsigned};
    use chrono::TimeZone;

    fn source(bytes: Vec<u8>) -> Source<std::io::Cursor<Vec<u8>>> {
        Source::new(std::io::Cursor::new(bytes), "t")
    }

    #[test]
    fn relative_accumulates_signed_deltas() {
        let mut bytes = encode_signed(10, crate::SLEB_MAX_WIDTH).unwrap();
        bytes.extend(encode_signed(-3, crate::SLEB_MAX_WIDTH).unwrap());
        let mut src = source(bytes);
        let mut r = Relative::new();
        assert_eq!(r.read(&mut src).unwrap(), 10);
        assert_eq!(r.read(&mut src).unwrap(), 7);
    }

    #[test]
    fn growing_accumulates_unsigned_deltas() {
        let mut bytes = encode_unsigned(100, ULEB_MAX_WIDTH).unwrap();
        bytes.extend(encode_unsigned(50, ULEB_MAX_WIDTH).unwrap());
        let mut src = source(bytes);
        let mut g = Growing::new();
        assert_eq!(g.read(&mut src).unwrap(), 100);
        assert_eq!(g.read(&mut src).unwrap(), 150);
    }

    #[test]
    fn growing_escapes_to_signed_value_and_still_accumulates() {
        let mut bytes = encode_unsigned(GROWING_ESCAPE, ULEB_MAX_WIDTH).unwrap();
        bytes.extend(encode_signed(9_000_000_000, crate::SLEB_MAX_WIDTH).unwrap());
        bytes.extend(encode_unsigned(5, ULEB_MAX_WIDTH).unwrap());
        let mut src = source(bytes);
        let mut g = Growing::new();
        assert_eq!(g.read(&mut src).unwrap(), 9_000_000_000);
        assert_eq!(g.read(&mut src).unwrap(), 9_000_000_005);
    }

    #[test]
    fn growing_date_time_applies_small_delta_without_moving_baseline() {
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let mut bytes = encode_unsigned(1_000, ULEB_MAX_WIDTH).unwrap();
        bytes.extend(encode_unsigned(2_000, ULEB_MAX_WIDTH).unwrap());
        let mut src = source(bytes);
        let mut g = GrowingDateTime::new(baseline);

        let first = g.read(&mut src).unwrap();
        assert_eq!(first, baseline + Duration::seconds(1));

        // Both offsets are measured from the same unmoved baseline, not
        // compounded onto the previous read.
        let second = g.read(&mut src).unwrap();
        assert_eq!(second, baseline + Duration::seconds(2));
    }

    #[test]
    fn growing_date_time_rebaselines_on_escaped_absolute_value() {
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let absolute = chrono::Utc.with_ymd_and_hms(2015, 3, 5, 0, 0, 0).unwrap();
        let absolute_ms = (absolute - epoch()).num_milliseconds();

        let mut bytes = encode_unsigned(GROWING_ESCAPE, ULEB_MAX_WIDTH).unwrap();
        bytes.extend(encode_signed(absolute_ms, crate::SLEB_MAX_WIDTH).unwrap());
        // A small follow-up offset, now measured from the new baseline.
        bytes.extend(encode_unsigned(500, ULEB_MAX_WIDTH).unwrap());

        let mut src = source(bytes);
        let mut g = GrowingDateTime::new(baseline);

        let first = g.read(&mut src).unwrap();
        assert_eq!(first, absolute);

        let second = g.read(&mut src).unwrap();
        assert_eq!(second, absolute + Duration::milliseconds(500));
    }
}
