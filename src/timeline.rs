//! The decoded, globally tick-ordered event timeline and the assembler that builds it

use log::debug;

use crate::chunk::header::{Format, Timing};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tempo assumed until a tempo meta-event says otherwise, 120 BPM
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Microseconds in one minute, for BPM conversion
const MICROSECONDS_PER_MINUTE: f64 = 60_000_000.0;

/// Metadata for a note's relative info, key and velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NoteMeta {
    /// Note key
    pub key: u8,
    /// Note velocity, or pressure for polyphonic key pressure
    pub velocity: u8,
}

/// A controller number and its new value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControlChange {
    /// Controller being changed
    pub controller_number: u8,
    /// The controller's new value
    pub new_value: u8,
}

/// The two 7 bit halves of a pitch wheel position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PitchBend {
    /// Least significant 7 bits
    pub lsb: u8,
    /// Most significant 7 bits
    pub msb: u8,
}

impl PitchBend {
    /// The 14 bit wheel position, 0x2000 is centered
    pub fn value(&self) -> u16 {
        (u16::from(self.msb) << 7) | u16::from(self.lsb)
    }

    /// Signed offset from the centered position
    pub fn offset(&self) -> i16 {
        self.value() as i16 - 0x2000
    }
}

/// What a timeline event does
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EventKind {
    /// Note released on a channel
    NoteOff(u8, NoteMeta),
    /// Note depressed on a channel
    NoteOn(u8, NoteMeta),
    /// Polyphonic key pressure
    KeyPressure(u8, NoteMeta),
    /// Controller value change
    ControlChange(u8, ControlChange),
    /// Patch change
    ProgramChange(u8, u8),
    /// Channel wide pressure
    ChannelPressure(u8, u8),
    /// Pitch wheel change
    PitchBend(u8, PitchBend),
    /// System exclusive payload, as it would go out on the wire
    SysEx(Vec<u8>),
    /// New tempo in microseconds per quarter note
    TempoChange(u32),
}

impl EventKind {
    /// The channel for channel-voice events
    pub fn channel(&self) -> Option<u8> {
        match self {
            Self::NoteOff(channel, _)
            | Self::NoteOn(channel, _)
            | Self::KeyPressure(channel, _)
            | Self::ControlChange(channel, _)
            | Self::ProgramChange(channel, _)
            | Self::ChannelPressure(channel, _)
            | Self::PitchBend(channel, _) => Some(*channel),
            Self::SysEx(_) | Self::TempoChange(_) => None,
        }
    }

    /// True for messages addressed to a MIDI channel
    pub fn is_channel_voice(&self) -> bool {
        self.channel().is_some()
    }
}

/// One decoded MIDI occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Absolute pulse count from the start of the song
    pub tick: u64,
    /// Logical output port, set by the port meta-event
    pub port: u8,
    /// The event itself
    pub kind: EventKind,
}

/// A tempo change, only ever produced under quarter-note timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TempoChange {
    /// Tick at which the new tempo takes effect
    pub tick: u64,
    /// Microseconds per quarter note
    pub microseconds_per_quarter: u32,
}

/// A key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeySignature {
    /// Positive for sharps, negative for flats. Stored verbatim, so it may fall outside -7..=7
    sharps_flats: i8,
    /// True if minor, false if major
    minor: bool,
}

impl KeySignature {
    /// Creates a key signature
    pub const fn new(sharps_flats: i8, minor: bool) -> Self {
        Self {
            sharps_flats,
            minor,
        }
    }

    /// Number of sharps (positive) or flats (negative)
    pub const fn sharps_flats(&self) -> i8 {
        self.sharps_flats
    }

    /// True if the key is minor
    pub const fn is_minor(&self) -> bool {
        self.minor
    }

    /// True if the sharps/flats count is one a notation program can represent
    pub const fn is_standard(&self) -> bool {
        self.sharps_flats >= -7 && self.sharps_flats <= 7
    }
}

/// The decoder's final output: every event in tick order plus timing metadata
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timeline {
    /// SMF format type
    format: Format,
    /// Number of tracks declared by the header
    track_count: u16,
    /// Pulses per quarter note, quarter-note-equivalent even for SMPTE files
    ppq: u32,
    /// Whether the file used frame-based timing
    is_smpte: bool,
    /// Tempo in effect at tick 0
    initial_tempo_microseconds: u32,
    /// All events, stably sorted by tick
    events: Vec<Event>,
    /// Song length in seconds
    total_duration_seconds: f64,
    /// Last key signature seen
    key_signature: Option<KeySignature>,
    /// Last General MIDI system mode message seen, true for GM on
    general_midi: Option<bool>,
}

impl Timeline {
    /// The SMF format type of the source
    pub fn format(&self) -> Format {
        self.format
    }

    /// Number of tracks the header declared
    pub fn track_count(&self) -> u16 {
        self.track_count
    }

    /// Pulses per quarter note
    pub fn ppq(&self) -> u32 {
        self.ppq
    }

    /// True if the source used SMPTE frame-based timing, in which case tempo is fixed
    pub fn is_smpte(&self) -> bool {
        self.is_smpte
    }

    /// Tempo in effect at the start of the song, in microseconds per quarter note.
    ///
    /// Only a tempo change at tick 0 sets this. When the first tempo change comes later, the song
    /// starts at the 500000 default (or the synthetic SMPTE tempo) and the change shows up in
    /// [`Timeline::tempo_changes`] instead.
    pub fn initial_tempo_microseconds(&self) -> u32 {
        self.initial_tempo_microseconds
    }

    /// Every event across every track, in tick order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consumes the timeline, yielding its events
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Total song length in seconds
    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    /// The last key signature in the file, if any
    pub fn key_signature(&self) -> Option<KeySignature> {
        self.key_signature
    }

    /// `Some(true)` if the file switches General MIDI on, `Some(false)` if it switches it off
    pub fn general_midi(&self) -> Option<bool> {
        self.general_midi
    }

    /// Tick of the last event, 0 for an empty timeline
    pub fn last_tick(&self) -> u64 {
        self.events.last().map_or(0, |event| event.tick)
    }

    /// True if no events were decoded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The tempo map, in tick order
    pub fn tempo_changes(&self) -> impl Iterator<Item = TempoChange> + '_ {
        self.events.iter().filter_map(|event| match event.kind {
            EventKind::TempoChange(microseconds_per_quarter) => Some(TempoChange {
                tick: event.tick,
                microseconds_per_quarter,
            }),
            _ => None,
        })
    }

    /// Tempo in effect at `tick`, in microseconds per quarter note
    pub fn tempo_at(&self, tick: u64) -> u32 {
        self.tempo_changes()
            .take_while(|change| change.tick <= tick)
            .last()
            .map_or(self.initial_tempo_microseconds, |change| {
                change.microseconds_per_quarter
            })
    }

    /// Tempo in effect at `tick`, in beats per minute
    pub fn bpm_at(&self, tick: u64) -> f64 {
        MICROSECONDS_PER_MINUTE / f64::from(self.tempo_at(tick))
    }

    /// Wall-clock position of `tick` in seconds, integrating every tempo change before it
    pub fn seconds_at(&self, tick: u64) -> f64 {
        let mut accumulator = DurationAccumulator::new(self.ppq, self.initial_tempo_microseconds);
        for change in self.tempo_changes().take_while(|change| change.tick <= tick) {
            accumulator.on_tempo_change(change.tick, change.microseconds_per_quarter);
        }
        accumulator.finish(tick)
    }

    /// Every event paired with its wall-clock position in seconds, in one pass over the tempo map
    pub fn timed_events(&self) -> impl Iterator<Item = (f64, &Event)> + '_ {
        let mut accumulator = DurationAccumulator::new(self.ppq, self.initial_tempo_microseconds);
        self.events.iter().map(move |event| {
            let seconds = accumulator.finish(event.tick);
            if let EventKind::TempoChange(tempo) = event.kind {
                accumulator.on_tempo_change(event.tick, tempo);
            }
            (seconds, event)
        })
    }
}

/// Integrates tempo segments into elapsed seconds.
///
/// Each tempo change closes the segment since the previous change using the previous tempo,
/// then adopts the new tempo.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DurationAccumulator {
    /// Pulses per quarter note
    ppq: f64,
    /// Tempo of the open segment
    tempo: u32,
    /// Tick the open segment started at
    segment_start: u64,
    /// Seconds accrued by closed segments
    seconds: f64,
}

impl DurationAccumulator {
    /// Starts accumulating at tick 0 with `tempo`
    pub(crate) fn new(ppq: u32, tempo: u32) -> Self {
        Self {
            ppq: f64::from(ppq),
            tempo,
            segment_start: 0,
            seconds: 0.0,
        }
    }

    /// Seconds covered by `ticks` pulses at the current tempo
    fn span(&self, ticks: u64) -> f64 {
        let seconds_per_tick = (f64::from(self.tempo) / 1_000_000.0) / self.ppq;
        seconds_per_tick * ticks as f64
    }

    /// Closes the open segment at `tick` and adopts `tempo`
    pub(crate) fn on_tempo_change(&mut self, tick: u64, tempo: u32) {
        self.seconds += self.span(tick.saturating_sub(self.segment_start));
        self.segment_start = tick;
        self.tempo = tempo;
    }

    /// Runs the open segment out to `last_tick` and returns the total
    pub(crate) fn finish(&self, last_tick: u64) -> f64 {
        self.seconds + self.span(last_tick.saturating_sub(self.segment_start))
    }
}

/// Collects decoded tracks and assembles the final [`Timeline`]
#[derive(Debug)]
pub(crate) struct TimelineBuilder {
    /// SMF format type
    format: Format,
    /// Declared track count
    track_count: u16,
    /// Resolved timing
    timing: Timing,
    /// Concatenated events in file order
    events: Vec<Event>,
    /// Last key signature seen
    key_signature: Option<KeySignature>,
    /// Last GM mode message seen
    general_midi: Option<bool>,
}

impl TimelineBuilder {
    /// Starts an empty timeline for a file with the given header values
    pub(crate) fn new(format: Format, track_count: u16, timing: Timing) -> Self {
        Self {
            format,
            track_count,
            timing,
            events: vec![],
            key_signature: None,
            general_midi: None,
        }
    }

    /// Appends one decoded track, later tracks override file-level metadata
    pub(crate) fn push_track(&mut self, track: DecodedTrack) {
        self.events.extend(track.events);
        if track.key_signature.is_some() {
            self.key_signature = track.key_signature;
        }
        if track.general_midi.is_some() {
            self.general_midi = track.general_midi;
        }
    }

    /// Sorts the events and integrates the tempo map into a duration
    pub(crate) fn finish(self) -> Timeline {
        let Self {
            format,
            track_count,
            timing,
            mut events,
            key_signature,
            general_midi,
        } = self;

        // Stable: simultaneous events keep track order, controllers before notes stay that way
        events.sort_by_key(|event| event.tick);

        let initial_tempo_microseconds = events
            .iter()
            .take_while(|event| event.tick == 0)
            .filter_map(|event| match event.kind {
                EventKind::TempoChange(tempo) => Some(tempo),
                _ => None,
            })
            .last()
            .unwrap_or(timing.tempo);

        let mut timeline = Timeline {
            format,
            track_count,
            ppq: timing.ppq,
            is_smpte: timing.is_smpte,
            initial_tempo_microseconds,
            events,
            total_duration_seconds: 0.0,
            key_signature,
            general_midi,
        };
        timeline.total_duration_seconds = timeline.seconds_at(timeline.last_tick());

        debug!(
            "Assembled {} events, last tick {}, duration {:.3}s",
            timeline.events.len(),
            timeline.last_tick(),
            timeline.total_duration_seconds
        );

        timeline
    }
}

/// Everything one track chunk contributes to the timeline
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DecodedTrack {
    /// Events in encounter order
    pub(crate) events: Vec<Event>,
    /// Last key signature in the track
    pub(crate) key_signature: Option<KeySignature>,
    /// Last GM mode message in the track
    pub(crate) general_midi: Option<bool>,
}
