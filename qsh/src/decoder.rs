//! File-level structure: signature, header, stream descriptor, and the
//! [`Parser`] that ties reading a header to iterating its frames (§4.5,
//! §4.6).
//!
//! Grounded on `itm::Decoder`'s role as the crate's single entry point,
//! generalized from ITM's byte-stream-only constructor to two
//! constructors (`open` for a file path, `new` for an arbitrary
//! `BufRead`) since QSH files are read from disk far more often than from
//! an in-memory buffer, following the split itm-decode's own CLI needs
//! between file and stream use.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::reader::Source;
use crate::record::{StockDecoder, TradesDecoder};
use crate::{Config, Error, ErrorKind, Instant, Timestamp, Frame, Frames};

const SIGNATURE: &[u8] = b"QScalp History Data";
const SUPPORTED_FORMAT_VERSION: u8 = 4;

const STREAM_KIND_STOCK: u8 = 0x10;
const STREAM_KIND_DEALS: u8 = 0x20;

/// Which record shape a stream's frames decode to, selected by the
/// stream descriptor's `kind` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamKind {
    Stock,
    Deals,
}

impl StreamKind {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            STREAM_KIND_STOCK => Some(StreamKind::Stock),
            STREAM_KIND_DEALS => Some(StreamKind::Deals),
            _ => None,
        }
    }
}

/// The fixed preamble common to every QSH v4 file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    pub format_version: u8,
    pub app_name: String,
    pub user_comment: String,
    pub record_start_time: Timestamp,
}

/// The single stream descriptor every QSH v4 file carries (multi-stream
/// files are rejected before this is produced; see
/// [`ErrorKind::MultiStreamUnsupported`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    pub instrument: String,
}

enum RecordDecoder {
    Deals(TradesDecoder),
    Stock(StockDecoder),
}

/// How far along the file-level state machine a [`Parser`] has gotten.
/// Exposed only because the component design names these states; both
/// public constructors parse through `Framing` eagerly, so callers never
/// observe `Initial` or `HeaderRead` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    Initial,
    HeaderRead,
    StreamDescriptorRead,
    Framing,
    Closed,
}

/// Decodes one QSH v4 file: its header, its single stream descriptor, and
/// then its sequence of frames via [`Parser::frames`].
pub struct Parser<R: BufRead = BufReader<File>> {
    source: Source<R>,
    config: Config,
    header: Header,
    descriptor: StreamDescriptor,
    state: ParserState,
    frame_timestamp: crate::numeric::GrowingDateTime,
    record_decoder: RecordDecoder,
}

impl Parser<BufReader<File>> {
    /// Opens `path` and parses its header and stream descriptor eagerly.
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self, Error> {
        let path = path.as_ref();
        let label = path.to_string_lossy().into_owned();
        let file = File::open(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                Error::new(ErrorKind::FileNotFound, &label, 0)
            } else {
                Error::new(ErrorKind::Truncated, &label, 0)
            }
        })?;
        Self::new(BufReader::new(file), label)
    }
}

impl<R: BufRead> Parser<R> {
    /// Wraps an already-open reader, labeling it `file` for diagnostics,
    /// and parses its header and stream descriptor eagerly.
    pub fn new(reader: R, file: impl Into<String>) -> Result<Self, Error> {
        Self::with_config(reader, file, Config::default())
    }

    /// As [`Parser::new`], but with an explicit [`Config`] rather than the
    /// default.
    pub fn with_config(reader: R, file: impl Into<String>, config: Config) -> Result<Self, Error> {
        let mut source = Source::new(reader, file);
        let header = read_header(&mut source, &config)?;
        let descriptor = read_stream_descriptor(&mut source)?;

        let baseline = header.record_start_time.with_timezone(&chrono::Utc);
        let record_decoder = match descriptor.kind {
            StreamKind::Deals => RecordDecoder::Deals(TradesDecoder::new(baseline)),
            StreamKind::Stock => RecordDecoder::Stock(StockDecoder::new()),
        };

        Ok(Parser {
            source,
            config,
            header,
            descriptor,
            state: ParserState::Framing,
            frame_timestamp: crate::numeric::GrowingDateTime::new(baseline),
            record_decoder,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn stream_descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns an iterator over this parser's remaining frames. Each call
    /// consumes frames from the same underlying source as any prior call;
    /// there is no rewind.
    pub fn frames(&mut self) -> Frames<'_, R> {
        Frames::new(self)
    }

    pub(crate) fn next_frame(&mut self) -> Option<Result<Frame, Error>> {
        if self.state != ParserState::Framing {
            return Some(Err(self.source.error(ErrorKind::NotInitialized)));
        }
        match self.source.eof() {
            Ok(true) => {
                self.state = ParserState::Closed;
                None
            }
            Ok(false) => Some(self.read_one_frame()),
            Err(e) => Some(Err(e)),
        }
    }

    fn read_one_frame(&mut self) -> Result<Frame, Error> {
        let timestamp = self.frame_timestamp.read(&mut self.source)?;
        let payload = match &mut self.record_decoder {
            RecordDecoder::Deals(dec) => crate::FramePayload::Trade(dec.read(&mut self.source, self.config.tz)?),
            RecordDecoder::Stock(dec) => crate::FramePayload::Stock(dec.read(&mut self.source)?),
        };
        Ok(Frame { timestamp: localize(timestamp, &self.config), payload })
    }
}

fn localize(instant: Instant, config: &Config) -> Timestamp {
    instant.with_timezone(&config.tz)
}

fn read_header<R: BufRead>(source: &mut Source<R>, config: &Config) -> Result<Header, Error> {
    let signature = source.bytes(SIGNATURE.len())?;
    if signature != SIGNATURE {
        return Err(source.error(ErrorKind::BadSignature));
    }

    let format_version = source.byte()?;
    if format_version != SUPPORTED_FORMAT_VERSION {
        return Err(source.error(ErrorKind::UnsupportedVersion(format_version)));
    }

    let app_name = source.string()?;
    let user_comment = source.string()?;
    let record_start_time = source.datetime()?;

    let stream_count = source.byte()?;
    if stream_count != 1 {
        return Err(source.error(ErrorKind::MultiStreamUnsupported(stream_count)));
    }

    Ok(Header {
        format_version,
        app_name,
        user_comment,
        record_start_time: localize(record_start_time, config),
    })
}

fn read_stream_descriptor<R: BufRead>(source: &mut Source<R>) -> Result<StreamDescriptor, Error> {
    let kind_byte = source.byte()?;
    let kind = StreamKind::from_byte(kind_byte).ok_or_else(|| source.error(ErrorKind::UnsupportedStreamKind(kind_byte)))?;
    let instrument = source.string()?;
    Ok(StreamDescriptor { kind, instrument })
}
