//! Header chunk parsing and time-division resolution

use log::debug;

use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
    timeline::DEFAULT_TEMPO,
};

use super::MAX_CHUNK_LENGTH;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest legal header chunk body: format, ntrks and division
const MIN_HEADER_LENGTH: u32 = 6;

/// Largest number of tracks a file may declare
pub const MAX_TRACKS: u16 = 1000;

/// Header chunk data, including format, ntrks and division as 3 16 bit unsigned integers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderChunk {
    /// The MIDI format
    format: Format,
    /// Number of tracks
    ntrks: u16,
    /// Raw time division
    division: Division,
    /// Division resolved into quarter-note units
    timing: Timing,
}

impl HeaderChunk {
    /// Reads the header chunk body. The cursor must sit just after the `MThd` tag.
    ///
    /// Header bytes past the six standard ones are skipped.
    pub fn read(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let length_offset = cursor.position();
        let length = cursor.read_u32_be()?;
        if length < MIN_HEADER_LENGTH {
            return Err(DecodeError::new(length_offset, DecodeErrorKind::InvalidFormat));
        }
        if length >= MAX_CHUNK_LENGTH {
            return Err(DecodeError::new(
                length_offset,
                DecodeErrorKind::InvalidChunkLength(length),
            ));
        }

        let mut body = cursor.take(length as usize)?;

        let format_offset = body.position();
        let format = Format::try_from(body.read_u16_be()?)
            .map_err(|kind| DecodeError::new(format_offset, kind))?;

        let ntrks_offset = body.position();
        let ntrks = body.read_u16_be()?;
        if !(1..=MAX_TRACKS).contains(&ntrks) {
            return Err(DecodeError::new(
                ntrks_offset,
                DecodeErrorKind::InvalidTrackCount(ntrks),
            ));
        }

        let division_offset = body.position();
        let division = Division::from(body.read_u16_be()?);
        let timing = division
            .resolve()
            .map_err(|kind| DecodeError::new(division_offset, kind))?;

        debug!(
            "MIDI format: {:?}, tracks: {}, division: {:?}, ppq: {}, tempo: {} us/qn",
            format, ntrks, division, timing.ppq, timing.tempo
        );

        Ok(Self {
            format,
            ntrks,
            division,
            timing,
        })
    }

    /// The file's format type
    pub fn format(&self) -> Format {
        self.format
    }

    /// Declared number of tracks
    pub fn ntrks(&self) -> u16 {
        self.ntrks
    }

    /// Raw time division
    pub fn division(&self) -> Division {
        self.division
    }

    /// Timing resolved from the division
    pub fn timing(&self) -> Timing {
        self.timing
    }
}

/// The overall organization of the MIDI file. Only formats 0 and 1 can be laid on one timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Format {
    /// The file contains a single multi-channel track
    Zero,
    /// The file contains one or more simultaneous tracks (or MIDI outputs) of a sequence
    One,
}

impl TryFrom<u16> for Format {
    type Error = DecodeErrorKind;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Format::Zero),
            1 => Ok(Format::One),
            other => Err(DecodeErrorKind::UnsupportedFormatType(other)),
        }
    }
}

/// The meaning of the delta-times in the MIDI sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    /// When bit 15 is a 0, bits 14-0 represent ticks per quarter note
    Metrical(u16),
    /// When bit 15 is 1, bits 14-8 represent the negative SMPTE format,
    /// and bits 7-0 represent ticks per frame
    TimeCodeBased(SmpteTicks),
}

/// Division defined by time-code-based time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmpteTicks {
    /// Upper division byte, the frame rate as a two's complement negative number
    smpte: u8,
    /// 8 bits of ticks per frame
    tpf: u8,
}

impl SmpteTicks {
    /// Frames per second encoded in the upper byte
    pub fn frames_per_second(&self) -> u8 {
        0x80 - (self.smpte & 0x7F)
    }

    /// Ticks per frame
    pub fn ticks_per_frame(&self) -> u8 {
        self.tpf
    }
}

impl From<u16> for Division {
    fn from(value: u16) -> Self {
        if value & 0x8000 == 0 {
            Division::Metrical(value)
        } else {
            let [smpte, tpf] = value.to_be_bytes();
            Division::TimeCodeBased(SmpteTicks { smpte, tpf })
        }
    }
}

/// The four frame rates a MIDI file may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmpteFps {
    /// 24 frames per second, film
    TwentyFour,
    /// 25 frames per second, PAL/SECAM
    TwentyFive,
    /// 29.97 frames per second, NTSC drop-frame
    TwentyNine,
    /// 30 frames per second
    Thirty,
}

impl TryFrom<u8> for SmpteFps {
    type Error = DecodeErrorKind;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            24 => Ok(Self::TwentyFour),
            25 => Ok(Self::TwentyFive),
            29 => Ok(Self::TwentyNine),
            30 => Ok(Self::Thirty),
            other => Err(DecodeErrorKind::InvalidSmpteRate(other)),
        }
    }
}

impl SmpteFps {
    /// Synthetic tempo and ppq multiplier that make frame timing look quarter-note based
    fn quarter_note_equivalent(&self) -> (u32, u32) {
        match self {
            Self::TwentyFour => (500_000, 12),
            Self::TwentyFive => (400_000, 10),
            Self::TwentyNine => (100_000_000, 2997),
            Self::Thirty => (500_000, 15),
        }
    }
}

/// Time division resolved into quarter-note-equivalent units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Pulses per quarter note
    pub ppq: u32,
    /// Initial tempo in microseconds per quarter note
    pub tempo: u32,
    /// Tempo is frozen for SMPTE files
    pub is_smpte: bool,
}

impl Division {
    /// Resolves the division into a ppq and an initial tempo
    pub fn resolve(&self) -> Result<Timing, DecodeErrorKind> {
        let timing = match self {
            Self::Metrical(ppq) => Timing {
                ppq: u32::from(*ppq),
                tempo: DEFAULT_TEMPO,
                is_smpte: false,
            },
            Self::TimeCodeBased(ticks) => {
                let fps = SmpteFps::try_from(ticks.frames_per_second())?;
                let (tempo, multiplier) = fps.quarter_note_equivalent();
                Timing {
                    ppq: multiplier * u32::from(ticks.ticks_per_frame()),
                    tempo,
                    is_smpte: true,
                }
            }
        };

        if timing.ppq == 0 {
            return Err(DecodeErrorKind::InvalidFormat);
        }

        Ok(timing)
    }
}
