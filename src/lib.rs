//! # midi-timeline
//!
//! A Standard MIDI File decoder that turns a `.mid` (or RIFF wrapped `.rmi`) file into a single,
//! globally tick-ordered event timeline along with the timing metadata a player needs: pulses per
//! quarter note, the tempo map and the total song duration.
//!
//! ## Overview
//!
//! MIDI files are structured as a series of chunks. Each chunk contains a 4-character ASCII
//! type identifier and a 32-bit length that specifies how many bytes of data follow. The header
//! chunk (`MThd`) declares the format, the number of tracks and the time division; each track
//! chunk (`MTrk`) holds delta-timed channel messages, system exclusive packets and meta-events.
//!
//! Decoding is all or nothing. Any structural violation (truncated input, a malformed
//! variable-length quantity, a data byte with no running status, ...) aborts the decode with a
//! [`DecodeError`] naming the problem and the byte offset it was found at. No partial timeline is
//! ever returned.
//!
//! ## Example Usage
//!
//! ```rust
//! use midi_timeline::{decode, EventKind};
//!
//! let bytes = [
//!     b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96, // format 0, one track, 96 ppq
//!     b'M', b'T', b'r', b'k', 0, 0, 0, 12,
//!     0x00, 0x90, 60, 64, // note on
//!     0x60, 0x80, 60, 64, // note off 96 ticks later
//!     0x00, 0xFF, 0x2F, 0x00, // end of track
//! ];
//!
//! let timeline = decode(&bytes).expect("Decode a tiny song");
//!
//! assert_eq!(timeline.ppq(), 96);
//! assert_eq!(timeline.events().len(), 2);
//! assert!(matches!(timeline.events()[0].kind, EventKind::NoteOn(0, _)));
//! assert!((timeline.total_duration_seconds() - 0.5).abs() < 1e-9);
//! ```
//!
//! ## Library Structure
//!
//! - **[`reader`]**: the [`reader::ByteCursor`] every stage reads through, and the
//!   [`reader::MidiReadable`] trait for loading bytes from a path or buffer.
//! - **[`chunk`]**: container detection, RIFF unwrapping, the header chunk and the track decoder.
//! - **[`timeline`]**: the decoded [`Timeline`] and its events.
//! - **[`display`]**: presentation helpers (key names, BPM, durations) for front ends.
//! - **[`error`]**: [`DecodeError`] and [`LoadError`].
//!
//! A decode holds no global state: the same bytes always produce the same timeline, and decodes
//! may run concurrently on separate threads.

pub mod chunk;
#[cfg(feature = "cli")]
pub mod config;
pub mod display;
pub mod error;
pub mod reader;
pub mod timeline;

pub use chunk::header::Format;
pub use error::{DecodeError, DecodeErrorKind, LoadError};
pub use timeline::{
    ControlChange, Event, EventKind, KeySignature, NoteMeta, PitchBend, TempoChange, Timeline,
};

use log::info;
use reader::{ByteCursor, MidiReadable};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a raw MIDI Chunk header.
/// A MIDI Chunk consists of a 4-character ASCII type identifier and a 32-bit unsigned integer
/// specifying the length of its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Chunk {
    /// 4 character ASCII chunk type
    pub chunk_type: [u8; 4],
    /// Length of the data that follows
    length: u32,
}

impl Chunk {
    /// Reads a chunk type and its big-endian length
    pub fn read(cursor: &mut ByteCursor<'_>) -> error::DecodeResult<Self> {
        let chunk_type = cursor.read_tag()?;
        let length = cursor.read_u32_be()?;
        Ok(Self { chunk_type, length })
    }

    /// Gets the length of the chunk as a usize
    pub fn len(&self) -> usize {
        self.length as usize
    }

    /// Gets the declared length
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Returns if the chunk has no attributed data
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Decodes a complete MIDI file image into a [`Timeline`]
pub fn decode(bytes: &[u8]) -> Result<Timeline, DecodeError> {
    chunk::decode_container(&mut ByteCursor::new(bytes))
}

/// Loads a MIDI source (a path, or [`reader::MidiData`]) and decodes it
pub fn decode_file<SOURCE>(source: SOURCE) -> Result<Timeline, LoadError>
where
    SOURCE: MidiReadable,
    LoadError: From<SOURCE::Error>,
{
    let bytes = source.get_midi_bytes()?;
    let timeline = decode(&bytes)?;

    info!(
        "Decoded {} events from {} bytes, {:.3}s long",
        timeline.events().len(),
        bytes.len(),
        timeline.total_duration_seconds()
    );

    Ok(timeline)
}
