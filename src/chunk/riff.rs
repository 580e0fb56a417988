//! RMID support: a Standard MIDI File embedded in the `data` chunk of a RIFF container.
//!
//! RIFF lengths are little-endian and chunk bodies are padded to an even length.

use log::debug;

use super::chunk_types::{HEADER_CHUNK, RIFF_DATA_CHUNK, RMID_FORM};
use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
};

/// Strips the RIFF wrapper. The cursor must sit just after the `RIFF` tag.
///
/// Returns a cursor over the `data` chunk, positioned just after its leading `MThd` tag.
pub fn unwrap<'a>(cursor: &mut ByteCursor<'a>) -> DecodeResult<ByteCursor<'a>> {
    // The outer length is not trusted
    let length_offset = cursor.position();
    cursor
        .skip(4)
        .map_err(|_| DecodeError::new(length_offset, DecodeErrorKind::ChunkNotFound))?;

    let form_offset = cursor.position();
    let form = cursor.read_tag()?;
    if form != RMID_FORM {
        return Err(DecodeError::new(form_offset, DecodeErrorKind::InvalidFormat));
    }

    loop {
        let chunk_offset = cursor.position();
        let not_found = || DecodeError::new(chunk_offset, DecodeErrorKind::ChunkNotFound);

        let id = cursor.read_tag().map_err(|_| not_found())?;
        let len = cursor.read_u32_le().map_err(|_| not_found())?;

        if id == RIFF_DATA_CHUNK {
            let mut data = cursor
                .take(len as usize)
                .map_err(|_| DecodeError::new(chunk_offset, DecodeErrorKind::Truncated))?;
            let smf_offset = data.position();
            match data.read_tag() {
                Ok(HEADER_CHUNK) => return Ok(data),
                _ => return Err(DecodeError::new(smf_offset, DecodeErrorKind::InvalidFormat)),
            }
        }

        // Lengths with the sign bit set were negative to the writer
        if len > i32::MAX as u32 {
            return Err(not_found());
        }

        debug!(
            "Skipping RIFF {:?} chunk of {} bytes",
            String::from_utf8_lossy(&id),
            len
        );
        let padded = (len as usize + 1) & !1;
        cursor.skip(padded).map_err(|_| not_found())?;
    }
}
