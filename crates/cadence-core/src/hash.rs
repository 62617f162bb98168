//! FNV-1a hashing for state verification.
//!
//! Fast, deterministic, and platform-independent. These hashes are not
//! cryptographically secure; they exist so peers can cheaply compare
//! simulation state tick by tick.

/// FNV-1a offset basis for 64-bit.
pub const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed a single byte into an FNV-1a hash state.
#[inline]
pub fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Feed a byte slice into an FNV-1a hash state.
#[inline]
pub fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// Feed a u32 (as 4 LE bytes) into an FNV-1a hash state.
#[inline]
pub fn fnv1a_u32(hash: u64, v: u32) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Feed a u64 (as 8 LE bytes) into an FNV-1a hash state.
#[inline]
pub fn fnv1a_u64(hash: u64, v: u64) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Feed an i64 (as 8 LE bytes) into an FNV-1a hash state.
#[inline]
pub fn fnv1a_i64(hash: u64, v: i64) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_offset_basis() {
        assert_eq!(fnv1a_bytes(FNV_OFFSET, &[]), FNV_OFFSET);
    }

    #[test]
    fn same_input_same_hash() {
        let a = fnv1a_bytes(FNV_OFFSET, b"lockstep");
        let b = fnv1a_bytes(FNV_OFFSET, b"lockstep");
        assert_eq!(a, b);
    }

    #[test]
    fn different_input_different_hash() {
        let a = fnv1a_u64(FNV_OFFSET, 1);
        let b = fnv1a_u64(FNV_OFFSET, 2);
        assert_ne!(a, b);
    }

    #[test]
    fn byte_order_matters() {
        let ab = fnv1a_bytes(FNV_OFFSET, &[1, 2]);
        let ba = fnv1a_bytes(FNV_OFFSET, &[2, 1]);
        assert_ne!(ab, ba);
    }
}
