//! Per-frame payload types and their decoders (§4.4): trade ("Deals")
//! records and stock ("Stock") quote batches.
//!
//! The public types here ([`TradeType`], [`TradeRecord`], [`Quote`],
//! [`StockFrame`]) are plain data — all the running state needed to decode
//! them lives in the private `TradesDecoder`/`StockDecoder` the
//! [`crate::decoder::Parser`] owns one of, selected once by the stream
//! descriptor's [`crate::StreamKind`] and never recreated afterward.

use std::io::BufRead;

use crate::numeric::{Growing, GrowingDateTime, Relative};
use crate::reader::Source;
use crate::{Error, ErrorKind, Timestamp};

/// Direction of a trade, decoded from the low two bits of a
/// [`TradeRecord`]'s mask byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TradeType {
    Unknown,
    Ask,
    Bid,
}

/// A single decoded trade ("Deals" stream) record.
///
/// Every field beyond the mandatory direction is optional: the mask byte's
/// high bits independently select which of them are present in this
/// particular record.
///
/// `exchange_date_time`, like [`crate::Frame::timestamp`], is presented in
/// the parser's configured zone rather than as a raw UTC instant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TradeRecord {
    pub trade_type: TradeType,
    pub exchange_date_time: Option<Timestamp>,
    pub exchange_trade_number: Option<u64>,
    pub bid_number: Option<i64>,
    pub transaction_price: Option<i64>,
    pub transaction_volume: Option<i64>,
    pub open_interest: Option<i64>,
}

/// One quote within a [`StockFrame`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quote {
    pub rate: i64,
    pub volume: i64,
}

/// A batch of order-book quotes ("Stock" stream) sharing one frame
/// timestamp.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StockFrame {
    pub quotes: Vec<Quote>,
}

const MASK_DIRECTION: u8 = 0b0000_0011;
const MASK_EXCHANGE_DATE_TIME: u8 = 0b0000_0100;
const MASK_EXCHANGE_TRADE_NUMBER: u8 = 0b0000_1000;
const MASK_BID_NUMBER: u8 = 0b0001_0000;
const MASK_TRANSACTION_PRICE: u8 = 0b0010_0000;
const MASK_TRANSACTION_VOLUME: u8 = 0b0100_0000;
const MASK_OPEN_INTEREST: u8 = 0b1000_0000;

/// Running state for the "Deals" stream: one independent accumulator per
/// optional delta-coded field, persisted across every trade record in the
/// stream.
pub(crate) struct TradesDecoder {
    exchange_date_time: GrowingDateTime,
    exchange_trade_number: Growing,
    bid_number: Relative,
    transaction_price: Relative,
    open_interest: Relative,
}

impl TradesDecoder {
    pub(crate) fn new(baseline: Instant) -> Self {
        TradesDecoder {
            exchange_date_time: GrowingDateTime::new(baseline),
            exchange_trade_number: Growing::new(),
            bid_number: Relative::new(),
            transaction_price: Relative::new(),
            open_interest: Relative::new(),
        }
    }

    /// `tz` is the parser's configured presentation zone (§6, Environment);
    /// `exchange_date_time` is localized to it the same way
    /// `Frame::timestamp` is, rather than handed back as a raw UTC instant.
    pub(crate) fn read<R: BufRead>(&mut self, source: &mut Source<R>, tz: chrono_tz::Tz) -> Result<TradeRecord, Error> {
        let mask = source.byte()?;
        let trade_type = match mask & MASK_DIRECTION {
            0 => TradeType::Unknown,
            1 => TradeType::Ask,
            2 => TradeType::Bid,
            _ => return Err(source.error(ErrorKind::InvalidTradeDirection(mask))),
        };

        let exchange_date_time = if mask & MASK_EXCHANGE_DATE_TIME != 0 {
            Some(self.exchange_date_time.read(source)?.with_timezone(&tz))
        } else {
            None
        };
        let exchange_trade_number = if mask & MASK_EXCHANGE_TRADE_NUMBER != 0 {
            Some(self.exchange_trade_number.read(source)?)
        } else {
            None
        };
        let bid_number = if mask & MASK_BID_NUMBER != 0 {
            Some(self.bid_number.read(source)?)
        } else {
            None
        };
        let transaction_price = if mask & MASK_TRANSACTION_PRICE != 0 {
            Some(self.transaction_price.read(source)?)
        } else {
            None
        };
        let transaction_volume = if mask & MASK_TRANSACTION_VOLUME != 0 {
            Some(crate::leb128::read_signed(source, crate::SLEB_MAX_WIDTH)?)
        } else {
            None
        };
        let open_interest = if mask & MASK_OPEN_INTEREST != 0 {
            Some(self.open_interest.read(source)?)
        } else {
            None
        };

        Ok(TradeRecord {
            trade_type,
            exchange_date_time,
            exchange_trade_number,
            bid_number,
            transaction_price,
            transaction_volume,
            open_interest,
        })
    }
}

/// Running state for the "Stock" stream: `rate`'s accumulator is shared
/// across every quote in every frame, per §4.4's note that `Relative`'s
/// `last` is never reset at a frame boundary.
pub(crate) struct StockDecoder {
    rate: Relative,
}

impl StockDecoder {
    pub(crate) fn new() -> Self {
        StockDecoder { rate: Relative::new() }
    }

    pub(crate) fn read<R: BufRead>(&mut self, source: &mut Source<R>) -> Result<StockFrame, Error> {
        let count = crate::leb128::read_signed(source, crate::SLEB_MAX_WIDTH)?;
        if count < 0 {
            return Err(source.error(ErrorKind::Truncated));
        }
        let mut quotes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let rate = self.rate.read(source)?;
            let volume = crate::leb128::read_signed(source, crate::SLEB_MAX_WIDTH)?;
            quotes.push(Quote { rate, volume });
        }
        Ok(StockFrame { quotes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leb128::encode_signed;
    use chrono::TimeZone;

    fn source(bytes: Vec<u8>) -> Source<std::io::Cursor<Vec<u8>>> {
        Source::new(std::io::Cursor::new(bytes), "t")
    }

    #[test]
    fn trade_record_decodes_minimal_mask() {
        let bytes = vec![0b0000_0010]; // Bid, no optional fields
        let mut src = source(bytes);
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let mut dec = TradesDecoder::new(baseline);
        let record = dec.read(&mut src, chrono_tz::Tz::UTC).unwrap();
        assert_eq!(record.trade_type, TradeType::Bid);
        assert!(record.exchange_date_time.is_none());
        assert!(record.transaction_volume.is_none());
    }

    #[test]
    fn trade_record_rejects_invalid_direction_bits() {
        let bytes = vec![0b0000_0011];
        let mut src = source(bytes);
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let mut dec = TradesDecoder::new(baseline);
        let err = dec.read(&mut src, chrono_tz::Tz::UTC).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTradeDirection(0b0000_0011));
    }

    #[test]
    fn trade_record_decodes_transaction_volume_as_raw_sleb() {
        let mut bytes = vec![MASK_TRANSACTION_VOLUME];
        bytes.extend(encode_signed(-42, crate::SLEB_MAX_WIDTH).unwrap());
        let mut src = source(bytes);
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let mut dec = TradesDecoder::new(baseline);
        let record = dec.read(&mut src, chrono_tz::Tz::UTC).unwrap();
        assert_eq!(record.transaction_volume, Some(-42));
    }

    #[test]
    fn trade_record_localizes_exchange_date_time_to_configured_zone() {
        let mut bytes = vec![MASK_EXCHANGE_DATE_TIME];
        bytes.extend(encode_signed(0, crate::SLEB_MAX_WIDTH).unwrap()); // no delta from baseline
        let mut src = source(bytes);
        let baseline = chrono::Utc.with_ymd_and_hms(2015, 3, 2, 6, 59, 50).unwrap();
        let mut dec = TradesDecoder::new(baseline);
        let record = dec.read(&mut src, chrono_tz::Tz::Europe__Moscow).unwrap();
        let exchange_date_time = record.exchange_date_time.unwrap();
        assert_eq!(exchange_date_time.timezone(), chrono_tz::Tz::Europe__Moscow);
        assert_eq!(exchange_date_time.with_timezone(&chrono::Utc), baseline);
    }

    #[test]
    fn stock_frame_decodes_quotes_and_shares_relative_state() {
        let mut bytes = encode_signed(2, crate::SLEB_MAX_WIDTH).unwrap(); // count
        bytes.extend(encode_signed(100, crate::SLEB_MAX_WIDTH).unwrap()); // rate delta
        bytes.extend(encode_signed(5, crate::SLEB_MAX_WIDTH).unwrap()); // volume
        bytes.extend(encode_signed(-20, crate::SLEB_MAX_WIDTH).unwrap()); // rate delta
        bytes.extend(encode_signed(-5, crate::SLEB_MAX_WIDTH).unwrap()); // volume
        let mut src = source(bytes);
        let mut dec = StockDecoder::new();
        let frame = dec.read(&mut src).unwrap();
        assert_eq!(frame.quotes, vec![Quote { rate: 100, volume: 5 }, Quote { rate: 80, volume: -5 }]);
    }

    #[test]
    fn stock_decoder_relative_state_persists_across_frames() {
        let mut dec = StockDecoder::new();
        let first = encode_signed(1, crate::SLEB_MAX_WIDTH)
            .unwrap()
            .into_iter()
            .chain(encode_signed(10, crate::SLEB_MAX_WIDTH).unwrap())
            .chain(encode_signed(1, crate::SLEB_MAX_WIDTH).unwrap())
            .collect();
        let mut src = source(first);
        let frame1 = dec.read(&mut src).unwrap();
        assert_eq!(frame1.quotes[0].rate, 10);

        let second = encode_signed(1, crate::SLEB_MAX_WIDTH)
            .unwrap()
            .into_iter()
            .chain(encode_signed(5, crate::SLEB_MAX_WIDTH).unwrap())
            .chain(encode_signed(1, crate::SLEB_MAX_WIDTH).unwrap())
            .collect();
        let mut src = source(second);
        let frame2 = dec.read(&mut src).unwrap();
        assert_eq!(frame2.quotes[0].rate, 15);
    }
}
