//! Meta Event Structs and Parsing

use log::trace;

use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
    timeline::KeySignature,
};

/// MIDI port meta-event tag
pub const MIDI_PORT: u8 = 0x21;
/// End of track meta-event tag
pub const END_OF_TRACK: u8 = 0x2F;
/// Tempo meta-event tag
pub const TEMPO: u8 = 0x51;
/// Key signature meta-event tag
pub const KEY_SIGNATURE: u8 = 0x59;

/// A meta event the track decoder acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaEvent {
    /// Logical port for the following events, tag 0x21
    MidiPort(u8),
    /// End of Track Identifier, tag 0x2F
    EndOfTrack,
    /// Tempo in microseconds per quarter note, tag 0x51
    Tempo(u32),
    /// Key Signature, tag 0x59
    KeySignature(KeySignature),
    /// Any other meta event, its payload skipped
    Ignored(u8),
}

impl MetaEvent {
    /// Reads a meta event. The cursor must sit just after the 0xFF status byte.
    ///
    /// Exactly the declared payload length is consumed, whatever the event needs of it.
    pub fn read(cursor: &mut ByteCursor<'_>) -> DecodeResult<Self> {
        let event_tag = cursor.read_byte()?;
        let length = cursor.read_variable_length()?;
        let payload_offset = cursor.position();

        // Advances the outer cursor past the payload up front, leftovers are never read
        let mut data = cursor.take(length as usize)?;

        macro_rules! require {
            ($len: expr) => {
                if length < $len {
                    return Err(DecodeError::new(
                        payload_offset,
                        DecodeErrorKind::MalformedMetaEvent {
                            meta_type: event_tag,
                            length,
                        },
                    ));
                }
            };
        }

        let event = match event_tag {
            MIDI_PORT => {
                require!(1);
                MetaEvent::MidiPort(data.read_byte()?)
            }
            END_OF_TRACK => MetaEvent::EndOfTrack,
            TEMPO => {
                require!(3);
                MetaEvent::Tempo(data.read_fixed(3)?)
            }
            KEY_SIGNATURE => {
                require!(2);
                let sharps_flats = data.read_byte()? as i8;
                let minor = data.read_byte()? != 0;
                MetaEvent::KeySignature(KeySignature::new(sharps_flats, minor))
            }
            other => {
                trace!("Skipping meta event {other:#04X} ({length} bytes)");
                MetaEvent::Ignored(other)
            }
        };

        Ok(event)
    }
}
