//! Zlib framing streams for the Remora remoting toolkit.
//!
//! Wraps a raw deflate engine in RFC 1950 style framing: a fixed 2-byte
//! header (`0x58 0x85`), the deflate payload, and a 4-byte Adler-32 trailer
//! computed incrementally over the uncompressed bytes. The trailer is written
//! least-significant byte first unless configured otherwise.
//!
//! # Architecture
//!
//! - **ZlibEncoder**: compress-mode stream over any `Write`
//! - **ZlibDecoder**: decompress-mode stream over any `Read`, with header and
//!   trailer verification
//! - **ZlibStream**: a duplex inner stream bound to one [`CompressionMode`]
//! - **Adler32**: block-reduced incremental checksum
//! - **ZlibStreamBuilder**: shared configuration and pooled scratch buffers

pub mod adler32;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod stream;

use std::io::{Read, Write};

pub use adler32::{adler32, Adler32};
pub use config::{ChecksumOrder, ZlibConfig};
pub use decoder::ZlibDecoder;
pub use encoder::ZlibEncoder;
pub use error::{ZlibError, ZlibResult};
pub use header::{ZlibHeader, ZLIB_HEADER};
pub use stream::{CompressionMode, ZlibStream, ZlibStreamBuilder};

/// Compress `data` into a complete zlib stream.
pub fn compress(data: &[u8], config: &ZlibConfig) -> ZlibResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2 + 16);
    let mut encoder = ZlibEncoder::new(&mut out, config.clone())?;
    encoder.write_bytes(data)?;
    encoder.close()?;
    drop(encoder);
    Ok(out)
}

/// Decompress a complete zlib stream held in memory.
pub fn decompress(data: &[u8], config: &ZlibConfig) -> ZlibResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data, config.clone())?;
    let mut out = Vec::with_capacity(data.len().saturating_mul(2));
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adler32::reference_adler32;
    use proptest::prelude::*;
    use std::io::{self, BufReader, BufWriter, Seek, SeekFrom};

    #[test]
    fn one_shot_round_trip() {
        let input = b"one-shot helpers".repeat(50);
        let framed = compress(&input, &ZlibConfig::default()).unwrap();
        assert_eq!(&framed[..2], &ZLIB_HEADER);
        assert_eq!(decompress(&framed, &ZlibConfig::default()).unwrap(), input);
    }

    #[test]
    fn trailer_is_little_endian_adler() {
        let framed = compress(b"Wikipedia", &ZlibConfig::default()).unwrap();
        assert_eq!(&framed[framed.len() - 4..], &[0x98, 0x03, 0xe6, 0x11]);
    }

    #[test]
    fn decompress_errors_surface_as_zlib_errors() {
        let mut framed = compress(b"corrupted", &ZlibConfig::default()).unwrap();
        let last = framed.len() - 2;
        framed[last] ^= 0x01;
        let err = decompress(&framed, &ZlibConfig::default()).unwrap_err();
        assert!(matches!(err, ZlibError::ChecksumMismatch { .. }));
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn invalid_level_rejected() {
        let err = compress(b"x", &ZlibConfig::default().with_level(12)).unwrap_err();
        assert!(matches!(err, ZlibError::Config(_)));
    }

    #[test]
    fn file_backed_round_trip() {
        let mut file = tempfile::tempfile().unwrap();
        let input: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let config = ZlibConfig::default().with_leave_open(true);
        let mut encoder = ZlibEncoder::new(BufWriter::new(&mut file), config).unwrap();
        for chunk in input.chunks(7919) {
            encoder.write_all(chunk).unwrap();
        }
        let writer = encoder.finish().unwrap().unwrap();
        drop(writer);

        file.seek(SeekFrom::Start(0)).unwrap();
        let mut decoder = ZlibDecoder::new(BufReader::new(file), ZlibConfig::default()).unwrap();
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        assert_eq!(out, input);
    }

    proptest! {
        #[test]
        fn round_trip_with_arbitrary_chunking(
            data in proptest::collection::vec(any::<u8>(), 0..4096),
            chunk in 1usize..512,
            level in 0u32..=9,
        ) {
            let config = ZlibConfig::default().with_level(level).with_leave_open(true);
            let mut encoder = ZlibEncoder::new(Vec::new(), config).unwrap();
            for piece in data.chunks(chunk) {
                encoder.write_all(piece).unwrap();
            }
            let framed = encoder.finish().unwrap().unwrap();

            prop_assert_eq!(&framed[..2], &ZLIB_HEADER[..]);
            let trailer: [u8; 4] = framed[framed.len() - 4..].try_into().unwrap();
            prop_assert_eq!(u32::from_le_bytes(trailer), reference_adler32(&data));

            let decoded = decompress(&framed, &ZlibConfig::default()).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
