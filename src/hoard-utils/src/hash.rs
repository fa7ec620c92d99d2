//! Stable hash functions for persisted identifiers.
//!
//! The output of these functions is written to disk, so they must
//! never change between builds or platforms.

/// Implementation of the [DJB2] hash function.
///
/// Used for persisted type tags.
///
/// [DJB2]: https://theartincode.stanis.me/008-djb2/
#[inline(always)]
pub const fn djb2(input: &[u8]) -> u32 {
    let mut state: u32 = 5381;

    let mut i = 0;
    while i < input.len() {
        state = state.wrapping_mul(33).wrapping_add(input[i] as u32);
        i += 1;
    }

    state
}

/// Implementation of the 64-bit [FNV-1a] hash function.
///
/// Used for format cookies that guard persisted blocks.
///
/// [FNV-1a]: http://www.isthe.com/chongo/tech/comp/fnv/
#[inline(always)]
pub const fn stable_hash(input: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut state = OFFSET_BASIS;

    let mut i = 0;
    while i < input.len() {
        state ^= input[i] as u64;
        state = state.wrapping_mul(PRIME);
        i += 1;
    }

    state
}
