//! Error types produced while decoding a MIDI byte stream

use thiserror::Error;

/// A fatal decode failure, carrying the absolute byte offset at which it was detected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Decoding at offset {offset}, {kind}")]
pub struct DecodeError {
    /// Byte offset into the original input
    offset: usize,
    /// What went wrong
    kind: DecodeErrorKind,
}

impl DecodeError {
    /// Create a decode error from an offset and a kind
    pub const fn new(offset: usize, kind: DecodeErrorKind) -> Self {
        Self { offset, kind }
    }

    /// Returns the byte offset where the error occurred
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the kind of error
    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// True if the input ended before a required field
    pub const fn is_truncated(&self) -> bool {
        matches!(
            self.kind,
            DecodeErrorKind::Truncated | DecodeErrorKind::UnexpectedEndOfFile
        )
    }
}

/// Every way a decode can fail. None of these are recoverable
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Input ended before a required field
    #[error("input truncated")]
    Truncated,
    /// Input ended while searching for a declared track
    #[error("unexpected end of file")]
    UnexpectedEndOfFile,
    /// Container or header tag mismatch
    #[error("invalid file format")]
    InvalidFormat,
    /// Leading tag is neither `MThd` nor `RIFF`
    #[error("not a Standard MIDI File")]
    UnrecognizedContainer,
    /// SMF format type other than 0 or 1
    #[error("type {0} format is not supported")]
    UnsupportedFormatType(u16),
    /// Declared track count outside `[1, 1000]`
    #[error("invalid number of tracks ({0})")]
    InvalidTrackCount(u16),
    /// SMPTE frame rate is not 24, 25, 29 or 30
    #[error("invalid number of SMPTE frames per second ({0})")]
    InvalidSmpteRate(u8),
    /// RIFF `data` chunk is absent
    #[error("data chunk not found")]
    ChunkNotFound,
    /// Variable-length quantity longer than four bytes or cut short
    #[error("malformed variable-length quantity")]
    MalformedVarint,
    /// A track event's delta-time could not be decoded
    #[error("malformed track event")]
    MalformedEvent,
    /// Data byte seen before any channel status byte
    #[error("data byte without running status")]
    MissingRunningStatus,
    /// Unrecognized status byte
    #[error("invalid status byte {0:#04X}")]
    InvalidStatusByte(u8),
    /// Meta-event payload shorter than its type requires
    #[error("meta event {meta_type:#04X} has invalid length {length}")]
    MalformedMetaEvent {
        /// Meta-event type byte
        meta_type: u8,
        /// Declared payload length
        length: u32,
    },
    /// Chunk declares a negative or too large length
    #[error("invalid chunk length {0}")]
    InvalidChunkLength(u32),
}

/// Error type for loading and decoding a MIDI file from some source
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading the source failed
    #[error("Failed to read MIDI source: {0}")]
    Io(#[from] std::io::Error),
    /// The bytes could not be decoded
    #[error("Failed to decode MIDI data: {0}")]
    Decode(#[from] DecodeError),
}

impl From<std::convert::Infallible> for LoadError {
    fn from(value: std::convert::Infallible) -> Self {
        match value {}
    }
}

/// The decode result type (see [`DecodeError`])
pub type DecodeResult<T> = Result<T, DecodeError>;
