//! Elias gamma and delta codes for vectors of nonnegative integers.
//!
//! Lengths of the vectors encoded here are always carried out of band
//! (typically in a 48-bit field written just before the vector), so these
//! codes are not required to be self-delimiting on their own: decoding
//! needs the element count supplied externally.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{Error, Result};

/// An additive offset applied before encoding and subtracted after
/// decoding. Several call sites transmit values known to be at least 1
/// (frequencies, run lengths) and use `Offset(1)` to avoid wasting a bit
/// encoding zero as the universal codes' rest-of-value field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset(pub u64);

/// Elias gamma code: `floor(log2(n))*2 + 1` bits, laid out as
/// `zeros | 1 | low_bits`.
pub fn gamma_encode_value(out: &mut BitWriter, n: u64) {
    let bits = 64 - (n + 1).leading_zeros();
    for _ in 1..bits {
        out.write_bit(false);
    }
    for i in (0..bits).rev() {
        out.write_bit(((n + 1) >> i) & 1 != 0);
    }
}

/// Decode a single gamma-coded value.
pub fn gamma_decode_value(inp: &mut BitReader<'_>) -> Result<u64> {
    let mut zeros = 0u32;
    while !inp.read_bit()? {
        zeros += 1;
        if zeros > 63 {
            return Err(Error::malformed_header(
                "gamma prefix exceeds 63 leading zero bits",
            ));
        }
    }
    let mut value = 1u64;
    for _ in 0..zeros {
        value = (value << 1) | inp.read_bit()? as u64;
    }
    Ok(value - 1)
}

/// Elias delta code: a gamma-coded bit length followed by the low bits
/// of the value.
pub fn delta_encode_value(out: &mut BitWriter, n: u64) {
    let bits = 64 - (n + 1).leading_zeros();
    gamma_encode_value(out, (bits - 1) as u64);
    for i in (0..bits - 1).rev() {
        out.write_bit(((n + 1) >> i) & 1 != 0);
    }
}

/// Decode a single delta-coded value.
pub fn delta_decode_value(inp: &mut BitReader<'_>) -> Result<u64> {
    let extra_bits = gamma_decode_value(inp)? as u32;
    let mut value = 1u64;
    for _ in 0..extra_bits {
        value = (value << 1) | inp.read_bit()? as u64;
    }
    Ok(value - 1)
}

/// Encode `values` (after adding `offset`) with Elias gamma codes.
/// The element count is not written; the decoder must supply it.
pub fn gamma_encode(out: &mut BitWriter, values: &[u64], offset: Offset) {
    for &v in values {
        gamma_encode_value(out, v + offset.0);
    }
}

/// Decode `count` gamma-coded values, subtracting `offset` from each.
pub fn gamma_decode(inp: &mut BitReader<'_>, count: usize, offset: Offset) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let v = gamma_decode_value(inp)?;
        out.push(v.checked_sub(offset.0).ok_or_else(|| {
            Error::malformed_header("gamma-decoded value smaller than offset")
        })?);
    }
    Ok(out)
}

/// Encode `values` (after adding `offset`) with Elias delta codes.
pub fn delta_encode(out: &mut BitWriter, values: &[u64], offset: Offset) {
    for &v in values {
        delta_encode_value(out, v + offset.0);
    }
}

/// Decode `count` delta-coded values, subtracting `offset` from each.
pub fn delta_decode(inp: &mut BitReader<'_>, count: usize, offset: Offset) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let v = delta_decode_value(inp)?;
        out.push(v.checked_sub(offset.0).ok_or_else(|| {
            Error::malformed_header("delta-decoded value smaller than offset")
        })?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_gamma(values: &[u64], offset: Offset) {
        let mut w = BitWriter::new();
        gamma_encode(&mut w, values, offset);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = gamma_decode(&mut r, values.len(), offset).unwrap();
        assert_eq!(decoded, values);
    }

    fn roundtrip_delta(values: &[u64], offset: Offset) {
        let mut w = BitWriter::new();
        delta_encode(&mut w, values, offset);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = delta_decode(&mut r, values.len(), offset).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_gamma_roundtrip_small() {
        roundtrip_gamma(&[0, 1, 2, 3, 4, 100, 1000], Offset(0));
    }

    #[test]
    fn test_gamma_roundtrip_with_offset() {
        roundtrip_gamma(&[0, 1, 2, 255], Offset(1));
    }

    #[test]
    fn test_delta_roundtrip() {
        roundtrip_delta(&[0, 1, 2, 3, 4, 1_000_000, 268_435_454], Offset(0));
        roundtrip_delta(&[0, 1, 2, 255], Offset(1));
    }

    #[test]
    fn test_gamma_known_encoding() {
        // gamma(1) = "1" (n=1 -> n+1=2 -> bits=2 -> "1" "0")
        let mut w = BitWriter::new();
        gamma_encode_value(&mut w, 1);
        let bytes = w.into_bytes();
        // n+1 = 2 = 0b10, bits=2, one leading zero, then "10"
        let mut r = BitReader::new(&bytes);
        assert_eq!(gamma_decode_value(&mut r).unwrap(), 1);
    }

    #[test]
    fn test_gamma_zero() {
        let mut w = BitWriter::new();
        gamma_encode_value(&mut w, 0);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(gamma_decode_value(&mut r).unwrap(), 0);
    }

    #[test]
    fn test_empty_vector() {
        roundtrip_gamma(&[], Offset(0));
        roundtrip_delta(&[], Offset(1));
    }

    #[test]
    fn test_malformed_gamma_prefix_too_long() {
        // 64 leading zero bits with no terminating 1 triggers the guard.
        let mut w = BitWriter::new();
        for _ in 0..70 {
            w.write_bit(false);
        }
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert!(matches!(
            gamma_decode_value(&mut r),
            Err(Error::MalformedHeader { .. })
        ));
    }
}
