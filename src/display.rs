//! Human readable renderings of timeline data for front ends.
//!
//! Nothing in here is used by the decoder itself.

use std::fmt;

use crate::timeline::{EventKind, KeySignature};

/// Major keys from seven flats to seven sharps
const MAJOR_KEYS: [&str; 15] = [
    "Cb major", "Gb major", "Db major", "Ab major", "Eb major", "Bb major", "F major", "C major",
    "G major", "D major", "A major", "E major", "B major", "F# major", "C# major",
];

/// Minor keys from seven flats to seven sharps
const MINOR_KEYS: [&str; 15] = [
    "Ab minor", "Eb minor", "Bb minor", "F minor", "C minor", "G minor", "D minor", "A minor",
    "E minor", "B minor", "F# minor", "C# minor", "G# minor", "D# minor", "A# minor",
];

/// Name of a key signature, `None` when the sharps/flats count is outside -7..=7
pub fn key_name(key: KeySignature) -> Option<&'static str> {
    if !key.is_standard() {
        return None;
    }
    let index = (i16::from(key.sharps_flats()) + 7) as usize;
    if key.is_minor() {
        Some(MINOR_KEYS[index])
    } else {
        Some(MAJOR_KEYS[index])
    }
}

/// Beats per minute for a tempo in microseconds per quarter note
pub fn bpm(microseconds_per_quarter: u32) -> f64 {
    60_000_000.0 / f64::from(microseconds_per_quarter)
}

/// Formats seconds as `m:ss.mmm`
pub fn format_duration(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    format!(
        "{}:{:02}.{:03}",
        millis / 60_000,
        (millis / 1000) % 60,
        millis % 1000
    )
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoteOff(ch, note) => write![f, "NoteOff ch{ch} key={} vel={}", note.key, note.velocity],
            Self::NoteOn(ch, note) => write![f, "NoteOn ch{ch} key={} vel={}", note.key, note.velocity],
            Self::KeyPressure(ch, note) => {
                write![f, "KeyPressure ch{ch} key={} pressure={}", note.key, note.velocity]
            }
            Self::ControlChange(ch, cc) => write![
                f,
                "ControlChange ch{ch} controller={} value={}",
                cc.controller_number, cc.new_value
            ],
            Self::ProgramChange(ch, program) => write![f, "ProgramChange ch{ch} program={program}"],
            Self::ChannelPressure(ch, pressure) => {
                write![f, "ChannelPressure ch{ch} pressure={pressure}"]
            }
            Self::PitchBend(ch, bend) => write![f, "PitchBend ch{ch} offset={}", bend.offset()],
            Self::SysEx(payload) => write![f, "SysEx {payload:02X?}"],
            Self::TempoChange(tempo) => write![f, "Tempo {tempo} us/qn ({:.2} bpm)", bpm(*tempo)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{bpm, format_duration, key_name};
    use crate::timeline::{EventKind, KeySignature, NoteMeta};

    #[test]
    fn key_names_follow_circle_of_fifths() {
        assert_eq!(key_name(KeySignature::new(0, false)), Some("C major"));
        assert_eq!(key_name(KeySignature::new(0, true)), Some("A minor"));
        assert_eq!(key_name(KeySignature::new(3, false)), Some("A major"));
        assert_eq!(key_name(KeySignature::new(-3, true)), Some("C minor"));
        assert_eq!(key_name(KeySignature::new(7, false)), Some("C# major"));
        assert_eq!(key_name(KeySignature::new(-7, true)), Some("Ab minor"));
        assert_eq!(key_name(KeySignature::new(-5, false)), Some("Db major"));
    }

    #[test]
    fn nonstandard_key_has_no_name() {
        assert_eq!(key_name(KeySignature::new(11, false)), None);
        assert_eq!(key_name(KeySignature::new(-128, true)), None);
    }

    #[test]
    fn tempo_to_bpm() {
        assert_eq!(bpm(500_000), 120.0);
        assert_eq!(bpm(400_000), 150.0);
    }

    #[test]
    fn durations_format_as_minutes() {
        assert_eq!(format_duration(0.0), "0:00.000");
        assert_eq!(format_duration(0.5), "0:00.500");
        assert_eq!(format_duration(125.25), "2:05.250");
    }

    #[test]
    fn events_render() {
        let event = EventKind::NoteOn(
            1,
            NoteMeta {
                key: 60,
                velocity: 64,
            },
        );
        assert_eq!(event.to_string(), "NoteOn ch1 key=60 vel=64");
        assert_eq!(
            EventKind::TempoChange(500_000).to_string(),
            "Tempo 500000 us/qn (120.00 bpm)"
        );
        assert_eq!(EventKind::SysEx(vec![0xF0, 0xF7]).to_string(), "SysEx [F0, F7]");
    }
}
