use std::fmt::Display;

use blake3::{Hash, HexError};

/// Represents the album art ID.
///
/// The ID is the blake3 hash of the raw image bytes,
/// so identical artwork embedded in different files shares one ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtId(pub Hash);

impl ArtId {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes))
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }

    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        Hash::from_hex(hex).map(Self)
    }
}

impl Display for ArtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}
