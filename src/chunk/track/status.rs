//! Channel voice message parsing

use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
    timeline::{ControlChange, EventKind, NoteMeta, PitchBend},
};

/// Strips the top bit, channel message data is 7 bit no matter what was on the wire
const DATA_MASK: u8 = 0x7F;

/// Reads one masked data byte
fn data_byte(cursor: &mut ByteCursor<'_>) -> DecodeResult<u8> {
    cursor.read_byte().map(|byte| byte & DATA_MASK)
}

/// Reads a key and velocity pair
fn note_meta(cursor: &mut ByteCursor<'_>) -> DecodeResult<NoteMeta> {
    Ok(NoteMeta {
        key: data_byte(cursor)?,
        velocity: data_byte(cursor)?,
    })
}

/// Reads the data bytes for a channel voice `status` (0x80..=0xEF) whose status byte has
/// already been consumed or is implied by running status
pub fn read_channel_message(status: u8, cursor: &mut ByteCursor<'_>) -> DecodeResult<EventKind> {
    let channel = status & 0x0F;

    let kind = match status >> 4 {
        0x8 => EventKind::NoteOff(channel, note_meta(cursor)?),
        0x9 => EventKind::NoteOn(channel, note_meta(cursor)?),
        0xA => EventKind::KeyPressure(channel, note_meta(cursor)?),
        0xB => EventKind::ControlChange(
            channel,
            ControlChange {
                controller_number: data_byte(cursor)?,
                new_value: data_byte(cursor)?,
            },
        ),
        0xC => EventKind::ProgramChange(channel, data_byte(cursor)?),
        0xD => EventKind::ChannelPressure(channel, data_byte(cursor)?),
        0xE => EventKind::PitchBend(
            channel,
            PitchBend {
                lsb: data_byte(cursor)?,
                msb: data_byte(cursor)?,
            },
        ),
        _ => {
            return Err(DecodeError::new(
                cursor.position(),
                DecodeErrorKind::InvalidStatusByte(status),
            ))
        }
    };

    Ok(kind)
}
