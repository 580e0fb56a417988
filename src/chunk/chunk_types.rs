//! Chunk type constants

/// Creates a chunk type identifier
macro_rules! chunk_type {
    ($const_name:ident, $a:expr, $b:expr, $c:expr, $d:expr) => {
        /// Four character chunk type
        pub const $const_name: [u8; 4] = [$a, $b, $c, $d];
    };
}

chunk_type!(HEADER_CHUNK, b'M', b'T', b'h', b'd');
chunk_type!(TRACK_DATA_CHUNK, b'M', b'T', b'r', b'k');
chunk_type!(RIFF_CHUNK, b'R', b'I', b'F', b'F');
chunk_type!(RMID_FORM, b'R', b'M', b'I', b'D');
chunk_type!(RIFF_DATA_CHUNK, b'd', b'a', b't', b'a');
