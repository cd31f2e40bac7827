//! Big-endian field decoders.
//!
//! All multi-byte integers on a Wii disc are big-endian. `be34` additionally
//! encodes a sector->byte conversion: the on-disc word is a 32-bit sector
//! address that becomes a byte offset/size by shifting left by two.
//!
//! Callers are expected to provide slices of sufficient length; like the
//! original C (`be32`/`be34`/`be64` operating on raw pointers), going out of
//! range here is a programming error, not a recoverable condition.

/// Reads a big-endian `u32` from the first 4 bytes of `p`.
pub fn be32(p: &[u8]) -> u32 {
    u32::from_be_bytes(p[..4].try_into().unwrap())
}

/// Reads a big-endian 32-bit sector address from the first 4 bytes of `p`
/// and converts it to a byte offset/size (`<< 2`).
pub fn be34(p: &[u8]) -> u64 {
    (be32(p) as u64) << 2
}

/// Reads a big-endian `u64` from the first 8 bytes of `p`.
pub fn be64(p: &[u8]) -> u64 {
    u64::from_be_bytes(p[..8].try_into().unwrap())
}
