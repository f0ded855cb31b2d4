//! Additive 8-bit checksum.

/// Wrapping sum of all bytes, modulo 256. An empty slice sums to 0.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(Checksum::new(), |acc, &b| acc.update(b)).value()
}

/// Running form of [`checksum`], fed one byte at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    pub fn new() -> Self {
        Self(0)
    }

    /// Add one byte to the running sum.
    #[must_use]
    pub fn update(self, byte: u8) -> Self {
        Self(self.0.wrapping_add(byte))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}
