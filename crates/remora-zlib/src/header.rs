//! The two-byte zlib stream header (RFC 1950 §2.2).
//!
//! ```text
//!   0   1
//! +---+---+
//! |CMF|FLG|
//! +---+---+
//! CMF: bits 0-3 CM (8 = deflate), bits 4-7 CINFO (log2(window) - 8)
//! FLG: bits 0-4 FCHECK, bit 5 FDICT, bits 6-7 FLEVEL
//! ```

use crate::error::{ZlibError, ZlibResult};

/// Compression method: DEFLATE.
const CM_DEFLATE: u8 = 8;

/// Largest CINFO allowed for deflate (32K window).
const CINFO_MAX: u8 = 7;

/// Preset dictionary flag in FLG.
const FDICT: u8 = 0x20;

/// Header emitted by every compress-mode stream.
pub const ZLIB_HEADER: [u8; 2] = [0x58, 0x85];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ZlibHeader {
    pub cmf: u8,
    pub flg: u8,
}

impl ZlibHeader {
    /// `0x58 0x85`: deflate, 8K window, default compression level.
    pub const DEFAULT: Self = Self::from_bytes(ZLIB_HEADER);

    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self {
            cmf: bytes[0],
            flg: bytes[1],
        }
    }

    pub const fn to_bytes(self) -> [u8; 2] {
        [self.cmf, self.flg]
    }

    /// Compression method (CM).
    pub const fn method(self) -> u8 {
        self.cmf & 0x0f
    }

    /// Base-2 logarithm of the LZ77 window size.
    pub const fn window_bits(self) -> u8 {
        (self.cmf >> 4) + 8
    }

    /// FLEVEL hint, 0 (fastest) through 3 (maximum).
    pub const fn level_hint(self) -> u8 {
        self.flg >> 6
    }

    pub const fn has_dictionary(self) -> bool {
        self.flg & FDICT != 0
    }

    /// `CMF * 256 + FLG` must be a multiple of 31.
    pub const fn fcheck_ok(self) -> bool {
        (self.cmf as u16 * 256 + self.flg as u16) % 31 == 0
    }

    /// Reject headers this stream cannot decode.
    pub fn validate(self) -> ZlibResult<()> {
        let reason = if !self.fcheck_ok() {
            "header check bits do not match"
        } else if self.method() != CM_DEFLATE {
            "unsupported compression method"
        } else if self.cmf >> 4 > CINFO_MAX {
            "window size exceeds 32K"
        } else if self.has_dictionary() {
            "preset dictionaries are not supported"
        } else {
            return Ok(());
        };
        Err(ZlibError::InvalidHeader {
            cmf: self.cmf,
            flg: self.flg,
            reason,
        })
    }
}

impl Default for ZlibHeader {
    fn default() -> Self {
        Self::DEFAULT
    }
}
