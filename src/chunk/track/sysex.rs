//! System Exclusive Messages

use crate::{error::DecodeResult, reader::ByteCursor};

/// Start of a complete system exclusive message
pub const SYSEX_START: u8 = 0xF0;
/// Continuation packet, or an escaped arbitrary message
pub const SYSEX_CONTINUATION: u8 = 0xF7;

/// Universal non-realtime General MIDI System On
const GM_SYSTEM_ON: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
/// Universal non-realtime General MIDI System Off
const GM_SYSTEM_OFF: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x09, 0x02, 0xF7];

/// Reads a length-prefixed sysex payload following `status`.
///
/// A 0xF0 packet keeps its status byte in front of the payload so the result can be sent to a
/// device as is; a 0xF7 packet is taken verbatim.
pub fn read_sysex(status: u8, cursor: &mut ByteCursor<'_>) -> DecodeResult<Vec<u8>> {
    let len = cursor.read_variable_length()? as usize;
    let data = cursor.read_slice(len)?;

    let mut payload = Vec::with_capacity(len + 1);
    if status == SYSEX_START {
        payload.push(SYSEX_START);
    }
    payload.extend_from_slice(data);

    Ok(payload)
}

/// `Some(true)` for GM System On, `Some(false)` for GM System Off, `None` for anything else
pub fn general_midi_mode(payload: &[u8]) -> Option<bool> {
    if payload == GM_SYSTEM_ON {
        Some(true)
    } else if payload == GM_SYSTEM_OFF {
        Some(false)
    } else {
        None
    }
}
