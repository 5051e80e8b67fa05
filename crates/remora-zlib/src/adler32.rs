//! Incremental Adler-32 checksum (RFC 1950).

/// Largest prime smaller than 65536.
const MOD_ADLER: u32 = 65521;

/// Largest `n` such that `255n(n+1)/2 + (n+1)(MOD_ADLER-1) <= 2^32-1`.
///
/// Sums over a block of at most this many bytes cannot overflow `u32`, so
/// the modulo is taken once per block instead of once per byte.
const NMAX: usize = 5552;

/// Running Adler-32 state.
///
/// Folding `a` and then `b` yields the same value as folding `a ++ b` in one
/// call, so the checksum can follow a stream written in arbitrary chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    /// Checksum of the empty input.
    pub const INITIAL: u32 = 1;

    pub const fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Resume from a previously computed checksum value.
    pub const fn from_checksum(checksum: u32) -> Self {
        Self {
            s1: (checksum & 0xffff) % MOD_ADLER,
            s2: (checksum >> 16) % MOD_ADLER,
        }
    }

    /// Fold `data` into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        let (mut s1, mut s2) = (self.s1, self.s2);

        for block in data.chunks(NMAX) {
            let mut lanes = block.chunks_exact(16);
            for lane in &mut lanes {
                for &byte in lane {
                    s1 += u32::from(byte);
                    s2 += s1;
                }
            }
            for &byte in lanes.remainder() {
                s1 += u32::from(byte);
                s2 += s1;
            }
            s1 %= MOD_ADLER;
            s2 %= MOD_ADLER;
        }

        self.s1 = s1;
        self.s2 = s2;
    }

    /// Current value, `(s2 << 16) | s1`.
    pub const fn checksum(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// Adler-32 of `data` in one call.
pub fn adler32(data: &[u8]) -> u32 {
    let mut adler = Adler32::new();
    adler.update(data);
    adler.checksum()
}

#[cfg(test)]
pub(crate) fn reference_adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &byte in data {
        a = (a + u32::from(byte)) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }
    (b << 16) | a
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vectors() {
        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"a"), 0x0062_0062);
        assert_eq!(adler32(b"abc"), 0x024d_0127);
        assert_eq!(adler32(b"Wikipedia"), 0x11e6_0398);
    }

    #[test]
    fn empty_is_identity() {
        assert_eq!(Adler32::new().checksum(), Adler32::INITIAL);
        assert_eq!(Adler32::default().checksum(), 0x0000_0001);
    }

    #[test]
    fn block_boundaries_match_reference() {
        for len in [15, 16, 17, NMAX - 1, NMAX, NMAX + 1, 2 * NMAX, 3 * NMAX + 7] {
            let data = vec![0xffu8; len];
            assert_eq!(adler32(&data), reference_adler32(&data), "len {len}");
        }
    }

    #[test]
    fn large_saturated_input_matches_reference() {
        let data = vec![0xffu8; 1 << 20];
        assert_eq!(adler32(&data), reference_adler32(&data));
    }

    #[test]
    fn resume_from_checksum() {
        let mut first = Adler32::new();
        first.update(b"hello ");
        let mut resumed = Adler32::from_checksum(first.checksum());
        resumed.update(b"world");
        assert_eq!(resumed.checksum(), adler32(b"hello world"));
    }

    #[test]
    fn reset_restores_identity() {
        let mut adler = Adler32::new();
        adler.update(b"some bytes");
        adler.reset();
        assert_eq!(adler.checksum(), 1);
    }

    proptest! {
        #[test]
        fn matches_reference(data in proptest::collection::vec(any::<u8>(), 0..20_000)) {
            prop_assert_eq!(adler32(&data), reference_adler32(&data));
        }

        #[test]
        fn streaming_equivalence(
            data in proptest::collection::vec(any::<u8>(), 0..12_000),
            cuts in proptest::collection::vec(any::<usize>(), 0..8),
        ) {
            let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % (data.len() + 1)).collect();
            cuts.sort_unstable();

            let mut adler = Adler32::new();
            let mut start = 0;
            for cut in cuts {
                adler.update(&data[start..cut]);
                start = cut;
            }
            adler.update(&data[start..]);

            prop_assert_eq!(adler.checksum(), adler32(&data));
        }
    }
}
