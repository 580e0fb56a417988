//! Track chunk decoding: delta-times, running status and event dispatch

use log::{debug, trace, warn};
use meta::MetaEvent;

use crate::{
    error::{DecodeError, DecodeErrorKind, DecodeResult},
    reader::ByteCursor,
    timeline::{DecodedTrack, Event, EventKind},
};

pub mod meta;
pub mod status;
pub mod sysex;

/// Meta-event status byte
const META_EVENT: u8 = 0xFF;

/// Whether the track continues after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Keep reading events
    Continue,
    /// An end-of-track meta-event was read
    EndOfTrack,
}

/// State machine over one `MTrk` chunk
#[derive(Debug)]
pub struct TrackDecoder {
    /// SMPTE timed files ignore tempo meta-events
    is_smpte: bool,
    /// Absolute tick of the current event
    tick: u64,
    /// Last channel voice status byte, reused when a status byte is omitted
    running_status: Option<u8>,
    /// Port set by the last port meta-event
    port: u8,
    /// Output collected so far
    track: DecodedTrack,
}

impl TrackDecoder {
    /// Creates a decoder at tick 0 on port 0
    pub fn new(is_smpte: bool) -> Self {
        Self {
            is_smpte,
            tick: 0,
            running_status: None,
            port: 0,
            track: DecodedTrack::default(),
        }
    }

    /// Decodes every event in `cursor`, which must cover exactly the chunk contents.
    ///
    /// Stops at end-of-track, skipping whatever the chunk declares after it.
    pub(crate) fn decode(mut self, cursor: &mut ByteCursor<'_>) -> DecodeResult<DecodedTrack> {
        while !cursor.is_at_end() {
            if self.step(cursor)? == Step::EndOfTrack {
                if !cursor.is_at_end() {
                    trace!("Skipping {} bytes after end of track", cursor.remaining());
                }
                cursor.skip_to_end();
                break;
            }
        }

        trace!(
            "Track ends at tick {} with {} events",
            self.tick,
            self.track.events.len()
        );

        Ok(self.track)
    }

    /// Reads one delta-time and event
    fn step(&mut self, cursor: &mut ByteCursor<'_>) -> DecodeResult<Step> {
        let delta_offset = cursor.position();
        let delta = cursor.read_variable_length().map_err(|e| match e.kind() {
            DecodeErrorKind::MalformedVarint => {
                DecodeError::new(delta_offset, DecodeErrorKind::MalformedEvent)
            }
            _ => e,
        })?;
        self.tick = self.tick.saturating_add(u64::from(delta));

        let status_offset = cursor.position();
        let status = match cursor.peek_byte() {
            Some(byte) if byte & 0x80 != 0 => {
                cursor.skip(1)?;
                if byte < 0xF0 {
                    self.running_status = Some(byte);
                }
                byte
            }
            // A data byte, left in place for the message to read
            Some(_) => self
                .running_status
                .ok_or_else(|| cursor.error(DecodeErrorKind::MissingRunningStatus))?,
            None => return Err(cursor.error(DecodeErrorKind::Truncated)),
        };

        match status {
            0x80..=0xEF => {
                let kind = status::read_channel_message(status, cursor)?;
                self.push(kind);
            }
            sysex::SYSEX_START | sysex::SYSEX_CONTINUATION => {
                let payload = sysex::read_sysex(status, cursor)?;
                if let Some(mode) = sysex::general_midi_mode(&payload) {
                    debug!("General MIDI mode {} at tick {}", mode, self.tick);
                    self.track.general_midi = Some(mode);
                }
                self.push(EventKind::SysEx(payload));
            }
            META_EVENT => return self.meta_event(cursor),
            other => {
                return Err(DecodeError::new(
                    status_offset,
                    DecodeErrorKind::InvalidStatusByte(other),
                ))
            }
        }

        Ok(Step::Continue)
    }

    /// Applies a meta event to the track state
    fn meta_event(&mut self, cursor: &mut ByteCursor<'_>) -> DecodeResult<Step> {
        match MetaEvent::read(cursor)? {
            MetaEvent::MidiPort(port) => {
                trace!("Port {} from tick {}", port, self.tick);
                self.port = port;
            }
            MetaEvent::EndOfTrack => return Ok(Step::EndOfTrack),
            MetaEvent::Tempo(tempo) if self.is_smpte => {
                trace!("Ignoring tempo {} us/qn under SMPTE timing", tempo);
            }
            MetaEvent::Tempo(tempo) => {
                debug!("Tempo change at tick {} -> {} us/qn", self.tick, tempo);
                self.push(EventKind::TempoChange(tempo));
            }
            MetaEvent::KeySignature(key) => {
                if !key.is_standard() {
                    warn!(
                        "Key signature with {} sharps/flats is outside -7..=7, keeping it anyway",
                        key.sharps_flats()
                    );
                }
                self.track.key_signature = Some(key);
            }
            MetaEvent::Ignored(_) => {}
        }

        Ok(Step::Continue)
    }

    /// Records an event at the current tick and port
    fn push(&mut self, kind: EventKind) {
        self.track.events.push(Event {
            tick: self.tick,
            port: self.port,
            kind,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::TrackDecoder;
    use crate::{
        error::DecodeErrorKind,
        reader::ByteCursor,
        timeline::{ControlChange, DecodedTrack, Event, EventKind, KeySignature, NoteMeta},
    };

    fn decode(bytes: &[u8]) -> Result<DecodedTrack, DecodeErrorKind> {
        TrackDecoder::new(false)
            .decode(&mut ByteCursor::new(bytes))
            .map_err(|e| e.kind())
    }

    fn note_on(tick: u64, channel: u8, key: u8, velocity: u8) -> Event {
        Event {
            tick,
            port: 0,
            kind: EventKind::NoteOn(channel, NoteMeta { key, velocity }),
        }
    }

    #[test]
    fn running_status_repeats_note_on() {
        let bytes = [0x00, 0x90, 0x3C, 0x40, 0x10, 0x3C, 0x41, 0x00, 0xFF, 0x2F, 0x00];
        let track = decode(&bytes).expect("Decode track");

        assert_eq!(
            track.events,
            vec![note_on(0, 0, 0x3C, 0x40), note_on(0x10, 0, 0x3C, 0x41)]
        );
    }

    #[test]
    fn running_status_survives_meta_and_sysex() {
        let bytes = [
            0x00, 0xB2, 0x07, 0x64, // controller
            0x00, 0xFF, 0x01, 0x01, b'x', // text meta
            0x00, 0xF0, 0x01, 0xF7, // sysex
            0x05, 0x0A, 0x50, // running status controller
        ];
        let track = decode(&bytes).expect("Decode track");

        assert_eq!(track.events.len(), 3);
        assert_eq!(
            track.events[2],
            Event {
                tick: 5,
                port: 0,
                kind: EventKind::ControlChange(
                    2,
                    ControlChange {
                        controller_number: 0x0A,
                        new_value: 0x50
                    }
                )
            }
        );
    }

    #[test]
    fn data_byte_without_status_fails() {
        assert_eq!(
            decode(&[0x00, 0x3C, 0x40]),
            Err(DecodeErrorKind::MissingRunningStatus)
        );
        // Meta and sysex statuses never become running status
        assert_eq!(
            decode(&[0x00, 0xF0, 0x00, 0x00, 0x3C, 0x40]),
            Err(DecodeErrorKind::MissingRunningStatus)
        );
    }

    #[test]
    fn system_common_bytes_are_invalid() {
        for status in [0xF1, 0xF2, 0xF3, 0xF6, 0xF8, 0xFA, 0xFE] {
            assert_eq!(
                decode(&[0x00, status, 0x00, 0x00]),
                Err(DecodeErrorKind::InvalidStatusByte(status))
            );
        }
    }

    #[test]
    fn malformed_delta_aborts_the_track() {
        assert_eq!(
            decode(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x90, 0x3C, 0x40]),
            Err(DecodeErrorKind::MalformedEvent)
        );
    }

    #[test]
    fn end_of_track_skips_trailing_bytes() {
        let bytes = [0x00, 0xFF, 0x2F, 0x00, 0x00, 0x90, 0x3C, 0x40];
        let mut cursor = ByteCursor::new(&bytes);

        let track = TrackDecoder::new(false)
            .decode(&mut cursor)
            .expect("Decode track");
        assert!(track.events.is_empty());
        assert!(cursor.is_at_end());
    }

    #[test]
    fn track_without_end_marker_stops_at_chunk_end() {
        let track = decode(&[0x00, 0x90, 0x3C, 0x40]).expect("Decode track");
        assert_eq!(track.events, vec![note_on(0, 0, 0x3C, 0x40)]);
    }

    #[test]
    fn event_crossing_chunk_end_is_truncated() {
        assert_eq!(decode(&[0x00, 0x90, 0x3C]), Err(DecodeErrorKind::Truncated));
    }

    #[test]
    fn port_meta_applies_to_later_events() {
        let bytes = [
            0x00, 0x90, 0x3C, 0x40, // port 0
            0x00, 0xFF, 0x21, 0x01, 0x03, // port 3
            0x00, 0x3E, 0x40, // running status on port 3
        ];
        let track = decode(&bytes).expect("Decode track");

        assert_eq!(track.events[0].port, 0);
        assert_eq!(track.events[1].port, 3);
    }

    #[test]
    fn tempo_and_key_signature_are_recorded() {
        let bytes = [
            0x00, 0xFF, 0x59, 0x02, 0x02, 0x00, // D major
            0x60, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, // 1,000,000 us/qn at tick 96
            0x00, 0xFF, 0x59, 0x02, 0xFF, 0x01, // d minor replaces it
        ];
        let track = decode(&bytes).expect("Decode track");

        assert_eq!(
            track.events,
            vec![Event {
                tick: 96,
                port: 0,
                kind: EventKind::TempoChange(1_000_000)
            }]
        );
        assert_eq!(track.key_signature, Some(KeySignature::new(-1, true)));
    }

    #[test]
    fn smpte_tracks_ignore_tempo() {
        let bytes = [0x00, 0xFF, 0x51, 0x03, 0x0F, 0x42, 0x40, 0x00, 0x90, 0x3C, 0x40];
        let track = TrackDecoder::new(true)
            .decode(&mut ByteCursor::new(&bytes))
            .expect("Decode track");

        assert_eq!(track.events, vec![note_on(0, 0, 0x3C, 0x40)]);
    }

    #[test]
    fn gm_system_on_is_detected() {
        let bytes = [0x00, 0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7];
        let track = decode(&bytes).expect("Decode track");

        assert_eq!(track.general_midi, Some(true));
        assert_eq!(
            track.events[0].kind,
            EventKind::SysEx(vec![0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7])
        );
    }
}
