//! Phase-in (truncated binary) codes.
//!
//! The phase-in code assigns shorter codewords to smaller values within a
//! known range `[0, r]`; it underlies the recursive interpolative entropy
//! coder (`bwtc-entropy`'s `InterpolativeCoder`, which phase-in codes each
//! half's frequency against its parent).

use crate::bitstream::{BitReader, BitWriter};
use crate::error::Result;

/// Encode `n` in `[0, r]` with a phase-in (truncated binary) code.
///
/// For `b = floor(log2(r)) + 1`, `wasted = 2^b - (r+1)` codewords of
/// length `b-1` are reserved for the `wasted` smallest/largest values
/// (split evenly around the middle via `offset`), and the rest use `b`
/// bits. This is within one bit of the information-theoretic optimum for
/// a uniform distribution over `r+1` values.
pub fn phasein_encode(out: &mut BitWriter, n: u64, r: u64) {
    debug_assert!(n <= r);
    if r == 0 {
        return;
    }
    let b = 64 - r.leading_zeros();
    let wasted = (1u64 << b) - (r + 1);
    let longer = r - wasted + 1;
    let offset = longer / 2;
    let m = (n.wrapping_sub(offset).wrapping_add(r + 1)) % (r + 1);

    if m < wasted {
        out.write_bits(m as u32, (b - 1) as u8);
    } else {
        let code = (m - wasted) / 2 + wasted;
        let low_bit = (m - wasted) % 2;
        out.write_bits((code * 2 + low_bit) as u32, b as u8);
    }
}

/// Decode a value previously encoded with [`phasein_encode`] for the same `r`.
pub fn phasein_decode(inp: &mut BitReader<'_>, r: u64) -> Result<u64> {
    if r == 0 {
        return Ok(0);
    }
    let b = 64 - r.leading_zeros();
    let wasted = (1u64 << b) - (r + 1);
    let longer = r - wasted + 1;
    let offset = longer / 2;

    let prefix = inp.read_bits((b - 1) as u8)? as u64;
    let m = if prefix < wasted {
        prefix
    } else {
        // This prefix is shared by two long codewords; one more bit
        // disambiguates which.
        let extra = inp.read_bit()? as u64;
        let full = (prefix << 1) | extra;
        full - wasted
    };
    Ok((m + offset) % (r + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_phasein(n: u64, r: u64) {
        let mut w = BitWriter::new();
        phasein_encode(&mut w, n, r);
        let bytes = w.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert_eq!(phasein_decode(&mut reader, r).unwrap(), n, "n={n} r={r}");
    }

    #[test]
    fn test_phasein_roundtrip_exhaustive_small_ranges() {
        for r in 0..40u64 {
            for n in 0..=r {
                roundtrip_phasein(n, r);
            }
        }
    }

    #[test]
    fn test_phasein_roundtrip_power_of_two_range() {
        // r+1 a power of two: every codeword should be exactly b-1 bits.
        for n in 0..16 {
            roundtrip_phasein(n, 15);
        }
    }

    #[test]
    fn test_phasein_code_length_bound() {
        // Property 6: code length is floor(log2(r+1)) or ceil(log2(r+1)).
        for r in [1u64, 2, 3, 7, 8, 100, 1000] {
            for n in [0, r / 2, r] {
                let mut w = BitWriter::new();
                phasein_encode(&mut w, n, r);
                let bits = w.bits_written();
                let lo = (64 - (r + 1).leading_zeros() - 1) as u64;
                let hi = lo + 1;
                assert!(bits == lo || bits == hi, "r={r} n={n} bits={bits}");
            }
        }
    }
}
