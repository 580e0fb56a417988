//! Chunk level decoding: container detection, the header chunk and the track chunks that follow

use header::HeaderChunk;
use log::debug;
use track::TrackDecoder;

use crate::{
    chunk::chunk_types::{HEADER_CHUNK, RIFF_CHUNK, TRACK_DATA_CHUNK},
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
    timeline::{Timeline, TimelineBuilder},
    Chunk,
};

pub mod chunk_types;
pub mod header;
pub mod riff;
pub mod track;

/// Chunk lengths at or above 256 MiB are rejected
pub const MAX_CHUNK_LENGTH: u32 = 0x1000_0000;

/// Decodes a complete file image, bare SMF or RIFF wrapped
pub fn decode_container(cursor: &mut ByteCursor<'_>) -> DecodeResult<Timeline> {
    let tag_offset = cursor.position();
    let tag = cursor
        .read_tag()
        .map_err(|_| DecodeError::new(tag_offset, DecodeErrorKind::UnrecognizedContainer))?;

    match tag {
        HEADER_CHUNK => decode_smf(cursor),
        RIFF_CHUNK => {
            let mut smf = riff::unwrap(cursor)?;
            decode_smf(&mut smf)
        }
        _ => Err(DecodeError::new(
            tag_offset,
            DecodeErrorKind::UnrecognizedContainer,
        )),
    }
}

/// Decodes SMF data. The cursor must sit just after the `MThd` tag
pub fn decode_smf(cursor: &mut ByteCursor<'_>) -> DecodeResult<Timeline> {
    let header = HeaderChunk::read(cursor)?;
    let timing = header.timing();
    let mut builder = TimelineBuilder::new(header.format(), header.ntrks(), timing);

    for index in 0..header.ntrks() {
        let mut track = next_track(cursor)?;
        let decoded = TrackDecoder::new(timing.is_smpte).decode(&mut track)?;
        debug!("Track {} decoded {} events", index, decoded.events.len());
        builder.push_track(decoded);
    }

    Ok(builder.finish())
}

/// Finds the next `MTrk` chunk, skipping any other chunk types in between, and returns a cursor
/// over its declared contents
fn next_track<'a>(cursor: &mut ByteCursor<'a>) -> DecodeResult<ByteCursor<'a>> {
    loop {
        let chunk_offset = cursor.position();
        let chunk = Chunk::read(cursor).map_err(|_| {
            DecodeError::new(chunk_offset, DecodeErrorKind::UnexpectedEndOfFile)
        })?;

        if chunk.length() >= MAX_CHUNK_LENGTH {
            return Err(DecodeError::new(
                chunk_offset + 4,
                DecodeErrorKind::InvalidChunkLength(chunk.length()),
            ));
        }

        if chunk.chunk_type == TRACK_DATA_CHUNK {
            return cursor
                .take(chunk.len())
                .map_err(|_| DecodeError::new(chunk_offset, DecodeErrorKind::Truncated));
        }

        debug!(
            "Skipping {} byte {:?} chunk at offset {}",
            chunk.len(),
            String::from_utf8_lossy(&chunk.chunk_type),
            chunk_offset
        );
        cursor
            .skip(chunk.len())
            .map_err(|e| DecodeError::new(e.offset(), DecodeErrorKind::UnexpectedEndOfFile))?;
    }
}
