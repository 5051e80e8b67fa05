use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::error::{ZlibError, ZlibResult};

/// Byte order of the 4-byte Adler-32 trailer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumOrder {
    /// Least-significant byte first. The Remora wire format.
    #[default]
    LittleEndian,
    /// Most-significant byte first, as RFC 1950 specifies.
    BigEndian,
}

impl ChecksumOrder {
    pub fn encode(self, checksum: u32) -> [u8; 4] {
        match self {
            Self::LittleEndian => checksum.to_le_bytes(),
            Self::BigEndian => checksum.to_be_bytes(),
        }
    }

    pub fn decode(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::LittleEndian => u32::from_le_bytes(bytes),
            Self::BigEndian => u32::from_be_bytes(bytes),
        }
    }
}

/// Configuration for zlib encoders and decoders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZlibConfig {
    /// Deflate level, 0 (store) through 9 (best).
    pub level: u32,
    /// Size of the scratch buffer used to move bytes to and from the inner stream.
    pub buffer_size: usize,
    /// Keep the inner stream alive after close so it can be taken back.
    pub leave_open: bool,
    /// Reject decompress input whose header is not a valid deflate zlib header.
    pub verify_header: bool,
    /// Compare the trailer against the checksum of the decompressed bytes.
    pub verify_checksum: bool,
    pub checksum_order: ChecksumOrder,
}

impl Default for ZlibConfig {
    fn default() -> Self {
        Self {
            level: 6,
            buffer_size: 4096,
            leave_open: false,
            verify_header: true,
            verify_checksum: true,
            checksum_order: ChecksumOrder::LittleEndian,
        }
    }
}

impl ZlibConfig {
    /// A decompress configuration that skips header and trailer checks.
    pub fn lenient() -> Self {
        Self {
            verify_header: false,
            verify_checksum: false,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_checksum_order(mut self, order: ChecksumOrder) -> Self {
        self.checksum_order = order;
        self
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> ZlibResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ZlibError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ZlibResult<()> {
        if self.level > 9 {
            return Err(ZlibError::Config(format!(
                "level must be 0..=9, got {}",
                self.level
            )));
        }
        if self.buffer_size == 0 {
            return Err(ZlibError::Config("buffer_size must be at least 1".into()));
        }
        Ok(())
    }

    pub(crate) fn compression(&self) -> Compression {
        Compression::new(self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ZlibConfig::default();
        assert_eq!(c.level, 6);
        assert_eq!(c.buffer_size, 4096);
        assert!(!c.leave_open);
        assert!(c.verify_header);
        assert!(c.verify_checksum);
        assert_eq!(c.checksum_order, ChecksumOrder::LittleEndian);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn lenient_disables_checks() {
        let c = ZlibConfig::lenient();
        assert!(!c.verify_header);
        assert!(!c.verify_checksum);
    }

    #[test]
    fn checksum_order_encoding() {
        assert_eq!(ChecksumOrder::LittleEndian.encode(0x0102_0304), [4, 3, 2, 1]);
        assert_eq!(ChecksumOrder::BigEndian.encode(0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(ChecksumOrder::LittleEndian.decode([4, 3, 2, 1]), 0x0102_0304);
        assert_eq!(ChecksumOrder::BigEndian.decode([1, 2, 3, 4]), 0x0102_0304);
    }

    #[test]
    fn parse_toml() {
        let c = ZlibConfig::from_toml_str(
            "level = 9\nleave_open = true\nchecksum_order = \"big_endian\"\n",
        )
        .unwrap();
        assert_eq!(c.level, 9);
        assert!(c.leave_open);
        assert_eq!(c.checksum_order, ChecksumOrder::BigEndian);
        assert_eq!(c.buffer_size, 4096);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            ZlibConfig::from_toml_str("level = 12"),
            Err(ZlibError::Config(_))
        ));
        assert!(matches!(
            ZlibConfig::default().with_buffer_size(0).validate(),
            Err(ZlibError::Config(_))
        ));
        assert!(matches!(
            ZlibConfig::from_toml_str("checksum_order = \"middle\""),
            Err(ZlibError::Config(_))
        ));
    }
}
