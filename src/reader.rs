//! MIDI byte sources and the offset-tracked cursor every decode stage reads through

use std::{convert::Infallible, fs, path::Path};

use crate::error::{DecodeError, DecodeErrorKind, DecodeResult};

/// Trait that allows for different types to be translated to a MIDI parseable format
pub trait MidiReadable {
    /// Error type that may be returned while fetching the bytes
    type Error;
    /// Loads the complete byte image of the source
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error>;
}

/// Wrapper struct to allow passing `Vec<u8>` to the [`MidiReadable`] trait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiData(pub Vec<u8>);

impl From<Vec<u8>> for MidiData {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl MidiReadable for MidiData {
    type Error = Infallible;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.0)
    }
}

impl<PATH> MidiReadable for PATH
where
    PATH: AsRef<Path>,
{
    type Error = std::io::Error;
    fn get_midi_bytes(self) -> Result<Vec<u8>, Self::Error> {
        fs::read(self.as_ref())
    }
}

/// Largest value a four byte variable-length quantity can hold
pub const MAX_VARIABLE_LENGTH: u32 = 0x0FFF_FFFF;

/// Sequential reader over a byte slice with an explicit, absolute read offset.
///
/// A cursor may be narrowed with [`ByteCursor::take`] into a sub-cursor that can only see a
/// declared chunk or payload; offsets reported by a sub-cursor stay absolute to the original
/// input so errors always point into the file.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    /// The complete input
    data: &'a [u8],
    /// Absolute offset of the next byte to read
    position: usize,
    /// Absolute offset one past the last readable byte
    end: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            end: data.len(),
        }
    }

    /// Absolute offset of the next byte to be read
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of bytes left before this cursor's end
    pub fn remaining(&self) -> usize {
        self.end - self.position
    }

    /// Returns true once every byte visible to this cursor has been consumed
    pub fn is_at_end(&self) -> bool {
        self.position >= self.end
    }

    /// Builds an error of `kind` at the current offset
    pub fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(self.position, kind)
    }

    /// Returns the next byte without advancing
    pub fn peek_byte(&self) -> Option<u8> {
        if self.is_at_end() {
            None
        } else {
            Some(self.data[self.position])
        }
    }

    /// Reads the next byte
    pub fn read_byte(&mut self) -> DecodeResult<u8> {
        let byte = self
            .peek_byte()
            .ok_or_else(|| self.error(DecodeErrorKind::Truncated))?;
        self.position += 1;
        Ok(byte)
    }

    /// Reads `n` bytes as a borrowed slice
    pub fn read_slice(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    /// Reads a big-endian unsigned integer built from `n` consecutive bytes, `n` at most 4
    pub fn read_fixed(&mut self, n: usize) -> DecodeResult<u32> {
        debug_assert!(n <= 4, "fixed width reads are at most 32 bits");
        let bytes = self.read_slice(n)?;
        Ok(bytes
            .iter()
            .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte)))
    }

    /// Reads a big-endian 16 bit value
    pub fn read_u16_be(&mut self) -> DecodeResult<u16> {
        self.read_fixed(2).map(|value| value as u16)
    }

    /// Reads a big-endian 32 bit value
    pub fn read_u32_be(&mut self) -> DecodeResult<u32> {
        self.read_fixed(4)
    }

    /// Reads 4 bytes as a little-endian value, RIFF framing is byte-order inverted relative to SMF
    pub fn read_u32_le(&mut self) -> DecodeResult<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads a 4 byte chunk identifier
    pub fn read_tag(&mut self) -> DecodeResult<[u8; 4]> {
        let bytes = self.read_slice(4)?;
        Ok([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    /// Reads a MIDI variable-length quantity.
    ///
    /// Each byte contributes its low 7 bits, most significant group first, and a set high bit
    /// means another byte follows. The encoding is capped at four bytes, so a fourth byte with
    /// its high bit set, or input running out after a continuation byte, is
    /// [`DecodeErrorKind::MalformedVarint`].
    pub fn read_variable_length(&mut self) -> DecodeResult<u32> {
        let start = self.position;
        let mut value = 0u32;

        for index in 0..4 {
            let byte = match self.read_byte() {
                Ok(byte) => byte,
                Err(e) if index == 0 => return Err(e),
                Err(_) => return Err(DecodeError::new(start, DecodeErrorKind::MalformedVarint)),
            };

            value = (value << 7) | u32::from(byte & 0x7F);

            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }

        Err(DecodeError::new(start, DecodeErrorKind::MalformedVarint))
    }

    /// Advances `n` bytes without reading them
    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        if n > self.remaining() {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        self.position += n;
        Ok(())
    }

    /// Skips whatever is left in this cursor
    pub fn skip_to_end(&mut self) {
        self.position = self.end;
    }

    /// Splits off a sub-cursor covering exactly the next `n` bytes and advances past them
    pub fn take(&mut self, n: usize) -> DecodeResult<ByteCursor<'a>> {
        if n > self.remaining() {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        let sub = ByteCursor {
            data: self.data,
            position: self.position,
            end: self.position + n,
        };
        self.position += n;
        Ok(sub)
    }
}

#[cfg(test)]
mod tests {
    use super::{ByteCursor, MidiData, MidiReadable};
    use crate::error::DecodeErrorKind;

    /// Encodes a value the way a MIDI writer would
    fn to_midi_vlq(mut value: u32) -> Vec<u8> {
        let mut bytes = vec![(value & 0x7F) as u8];
        value >>= 7;
        while value > 0 {
            bytes.push(((value & 0x7F) as u8) | 0x80);
            value >>= 7;
        }
        bytes.reverse();
        bytes
    }

    #[test]
    fn delta_time_parsed() {
        let bytes = [0x81, 0x40];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(cursor.read_variable_length(), Ok(192));
        assert!(cursor.is_at_end());
    }

    #[test]
    fn variable_length_boundaries() {
        let cases: [(&[u8], u32); 8] = [
            (&[0x00], 0),
            (&[0x7F], 0x7F),
            (&[0x81, 0x00], 0x80),
            (&[0xFF, 0x7F], 0x3FFF),
            (&[0x81, 0x80, 0x00], 0x4000),
            (&[0xFF, 0xFF, 0x7F], 0x1F_FFFF),
            (&[0x81, 0x80, 0x80, 0x00], 0x20_0000),
            (&[0xFF, 0xFF, 0xFF, 0x7F], 0x0FFF_FFFF),
        ];

        for (bytes, expected) in cases {
            let mut cursor = ByteCursor::new(bytes);
            assert_eq!(cursor.read_variable_length(), Ok(expected), "{bytes:02X?}");
            assert!(cursor.is_at_end());
        }
    }

    #[test]
    fn variable_length_inverts_encoding() {
        let mut value = 0u32;
        while value <= super::MAX_VARIABLE_LENGTH {
            let bytes = to_midi_vlq(value);
            assert!(bytes.len() <= 4);
            assert_eq!(ByteCursor::new(&bytes).read_variable_length(), Ok(value));
            value = value * 3 + 1;
        }
    }

    #[test]
    fn fifth_continuation_byte_is_malformed() {
        let bytes = [0x81, 0x80, 0x80, 0x80, 0x00];
        let err = ByteCursor::new(&bytes)
            .read_variable_length()
            .expect_err("Five byte quantity must fail");

        assert_eq!(err.kind(), DecodeErrorKind::MalformedVarint);
        assert_eq!(err.offset(), 0);
    }

    #[test]
    fn exhausted_mid_quantity_is_malformed() {
        let bytes = [0x81, 0x80];
        let err = ByteCursor::new(&bytes)
            .read_variable_length()
            .expect_err("Unterminated quantity must fail");

        assert_eq!(err.kind(), DecodeErrorKind::MalformedVarint);
    }

    #[test]
    fn empty_quantity_is_truncated() {
        let err = ByteCursor::new(&[])
            .read_variable_length()
            .expect_err("No bytes to read");

        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
    }

    #[test]
    fn fixed_reads_are_big_endian() {
        let bytes = [0x00, 0x00, 0x00, 0x06, 0x01, 0xE0, 0x07, 0xA1, 0x20];
        let mut cursor = ByteCursor::new(&bytes);

        assert_eq!(cursor.read_u32_be(), Ok(6));
        assert_eq!(cursor.read_u16_be(), Ok(0x01E0));
        assert_eq!(cursor.read_fixed(3), Ok(500_000));
        assert_eq!(cursor.position(), 9);
    }

    #[test]
    fn little_endian_read_for_riff() {
        let bytes = [0x0A, 0x00, 0x00, 0x00];
        assert_eq!(ByteCursor::new(&bytes).read_u32_le(), Ok(10));
    }

    #[test]
    fn reads_past_end_are_truncated() {
        let bytes = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&bytes);

        let err = cursor.read_fixed(4).expect_err("Only two bytes");
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
        assert_eq!(cursor.position(), 0);

        let err = cursor.skip(3).expect_err("Only two bytes");
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);

        assert_eq!(cursor.skip(2), Ok(()));
        assert_eq!(
            cursor.read_byte().map_err(|e| e.kind()),
            Err(DecodeErrorKind::Truncated)
        );
    }

    #[test]
    fn sub_cursor_is_bounded_and_keeps_absolute_offsets() {
        let bytes = [0xAA, 0x01, 0x02, 0x03, 0xBB];
        let mut cursor = ByteCursor::new(&bytes);
        cursor.skip(1).unwrap();

        let mut sub = cursor.take(3).expect("Three bytes available");
        assert_eq!(cursor.position(), 4);
        assert_eq!(sub.position(), 1);
        assert_eq!(sub.read_fixed(3), Ok(0x010203));

        let err = sub.read_byte().expect_err("Sub cursor is exhausted");
        assert_eq!(err.offset(), 4);
        assert_eq!(cursor.read_byte(), Ok(0xBB));
    }

    #[test]
    fn take_past_end_leaves_cursor_in_place() {
        let bytes = [0x01, 0x02];
        let mut cursor = ByteCursor::new(&bytes);

        let err = cursor.take(5).expect_err("Only two bytes");
        assert_eq!(err.kind(), DecodeErrorKind::Truncated);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn in_memory_data_is_readable() {
        let data = MidiData::from(vec![0x4D, 0x54]);
        assert_eq!(data.get_midi_bytes(), Ok(vec![0x4D, 0x54]));
    }

    #[test]
    fn missing_file_reports_io_error() {
        assert!("this/file/does/not/exist.mid".get_midi_bytes().is_err());
    }
}
