//! Byte builders for hand assembled MIDI files

#![allow(dead_code)]

/// Encodes a value as a MIDI variable-length quantity
pub fn vlq(mut value: u32) -> Vec<u8> {
    let mut bytes = vec![(value & 0x7F) as u8];
    value >>= 7;
    while value > 0 {
        bytes.insert(0, (value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    bytes
}

/// Track body builder, each event is prefixed with its delta-time
#[derive(Debug, Default, Clone)]
pub struct TrackBuilder {
    /// Encoded events so far
    bytes: Vec<u8>,
}

impl TrackBuilder {
    /// An empty track body
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends raw event bytes after a delta-time
    pub fn event(mut self, delta: u32, event: &[u8]) -> Self {
        self.bytes.extend(vlq(delta));
        self.bytes.extend(event);
        self
    }

    /// Note on, velocity as given
    pub fn note_on(self, delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        self.event(delta, &[0x90 | channel, key, velocity])
    }

    /// Note off with a middle release velocity
    pub fn note_off(self, delta: u32, channel: u8, key: u8) -> Self {
        self.event(delta, &[0x80 | channel, key, 0x40])
    }

    /// Set Tempo meta-event
    pub fn tempo(self, delta: u32, microseconds_per_quarter: u32) -> Self {
        let [_, a, b, c] = microseconds_per_quarter.to_be_bytes();
        self.event(delta, &[0xFF, 0x51, 0x03, a, b, c])
    }

    /// End of Track meta-event
    pub fn end_of_track(self, delta: u32) -> Self {
        self.event(delta, &[0xFF, 0x2F, 0x00])
    }

    /// The track body without its chunk header
    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// Wraps `body` in a chunk with a big-endian length
pub fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut bytes = tag.to_vec();
    bytes.extend((body.len() as u32).to_be_bytes());
    bytes.extend(body);
    bytes
}

/// A complete SMF declaring `ntrks` tracks, with whatever track bodies are given
pub fn smf_with_count(format: u16, ntrks: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    let mut header = vec![];
    header.extend(format.to_be_bytes());
    header.extend(ntrks.to_be_bytes());
    header.extend(division.to_be_bytes());

    let mut bytes = chunk(b"MThd", &header);
    for track in tracks {
        bytes.extend(chunk(b"MTrk", track));
    }
    bytes
}

/// A complete SMF whose header declares exactly the given tracks
pub fn smf(format: u16, division: u16, tracks: &[Vec<u8>]) -> Vec<u8> {
    smf_with_count(format, tracks.len() as u16, division, tracks)
}

/// Embeds an SMF image in an RMID container, after an `INFO` list chunk
pub fn rmid(smf: &[u8]) -> Vec<u8> {
    let mut body = b"RMID".to_vec();

    let info = b"INFOIsft\x03\x00\x00\x00abc\x00";
    body.extend(b"LIST");
    body.extend((info.len() as u32).to_le_bytes());
    body.extend(info);

    body.extend(b"data");
    body.extend((smf.len() as u32).to_le_bytes());
    body.extend(smf);
    if smf.len() % 2 == 1 {
        body.push(0);
    }

    let mut bytes = b"RIFF".to_vec();
    bytes.extend((body.len() as u32).to_le_bytes());
    bytes.extend(body);
    bytes
}
