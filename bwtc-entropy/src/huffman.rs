//! Order-0 static canonical Huffman coding.
//!
//! Code lengths are built with the Moffat-Katajainen in-place two-pass
//! algorithm (minimum-redundancy lengths computed directly from sorted
//! frequencies, without building an explicit tree), then canonical codes
//! are assigned in order of `(length, symbol)`.

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::error::{Error, Result};
use bwtc_core::universal::{gamma_decode_value, gamma_encode_value};

/// Code-length limit (`spec.md` §4.4).
pub const MAX_CODE_LEN: usize = 32;

/// A canonical Huffman table, usable for both encoding and decoding.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    /// Code length for each symbol (`0` means unused).
    pub lengths: Vec<u8>,
    /// Canonical code for each symbol (meaningless where `lengths[i] == 0`).
    pub codes: Vec<u32>,
    /// Shortest code length present.
    pub min_len: u8,
    /// Longest code length present.
    pub max_len: u8,
    /// First canonical code of each length (decoding).
    pub bases: [u32; MAX_CODE_LEN + 1],
    /// Largest valid code of each length (decoding).
    pub limits: [u32; MAX_CODE_LEN + 1],
    /// Index into `perms` where length-`L` symbols begin (decoding).
    pub base_index: [u32; MAX_CODE_LEN + 1],
    /// Number of symbols at each length (decoding; disambiguates an empty
    /// length from a length with exactly one code, which otherwise share
    /// `bases[len] == limits[len]`).
    pub counts: [u32; MAX_CODE_LEN + 1],
    /// Symbols in canonical code order, one run per length.
    pub perms: Vec<u16>,
}

impl HuffmanTable {
    /// Build a table from a code length per symbol (`0` = unused). Ties
    /// within a length are broken by symbol order, matching canonical
    /// assignment in order of `(length, symbol)`.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        if lengths.iter().all(|&l| l == 0) {
            return Err(Error::malformed_header("Huffman table has no symbols"));
        }
        let max_len = *lengths.iter().max().unwrap();
        if max_len as usize > MAX_CODE_LEN {
            return Err(Error::malformed_header("Huffman code length exceeds limit"));
        }
        let min_len = *lengths.iter().filter(|&&l| l > 0).min().unwrap();

        let mut counts = [0u32; MAX_CODE_LEN + 1];
        for &len in lengths {
            if len > 0 {
                counts[len as usize] += 1;
            }
        }

        let mut bases = [0u32; MAX_CODE_LEN + 1];
        let mut limits = [0u32; MAX_CODE_LEN + 1];
        let mut base_index = [0u32; MAX_CODE_LEN + 1];
        let mut code = 0u32;
        let mut index = 0u32;
        for len in 1..=max_len as usize {
            bases[len] = code;
            base_index[len] = index;
            let count = counts[len];
            limits[len] = if count > 0 { code + count - 1 } else { code };
            code = (code + count) << 1;
            index += count;
        }

        let mut codes = vec![0u32; lengths.len()];
        let mut next_code = bases;
        let mut perms = vec![0u16; lengths.iter().filter(|&&l| l > 0).count()];
        let mut next_index = base_index;
        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let len_idx = len as usize;
            codes[symbol] = next_code[len_idx];
            next_code[len_idx] += 1;
            perms[next_index[len_idx] as usize] = symbol as u16;
            next_index[len_idx] += 1;
        }

        Ok(Self {
            lengths: lengths.to_vec(),
            codes,
            min_len,
            max_len,
            bases,
            limits,
            base_index,
            counts,
            perms,
        })
    }

    /// Look up the canonical code and its length for `symbol`.
    pub fn get_code(&self, symbol: u16) -> Option<(u32, u8)> {
        let sym = symbol as usize;
        if sym < self.lengths.len() && self.lengths[sym] > 0 {
            Some((self.codes[sym], self.lengths[sym]))
        } else {
            None
        }
    }

    /// Decode one symbol from `inp` using canonical prefix decoding.
    pub fn decode(&self, inp: &mut BitReader<'_>) -> Result<u16> {
        let mut code = inp.read_bits(self.min_len)?;
        for len in self.min_len..=self.max_len {
            let len_idx = len as usize;
            if self.counts[len_idx] > 0 && code <= self.limits[len_idx] {
                let idx = self.base_index[len_idx] + (code - self.bases[len_idx]);
                if (idx as usize) < self.perms.len() {
                    return Ok(self.perms[idx as usize]);
                }
            }
            if len < self.max_len {
                code = (code << 1) | inp.read_bit()? as u32;
            }
        }
        Err(Error::malformed_header("invalid Huffman code"))
    }
}

/// Build length-limited minimum-redundancy code lengths for `freqs`
/// (indexed by symbol) using the Moffat-Katajainen in-place algorithm.
/// Symbols with frequency 0 get length 0 (unused). A single used symbol
/// gets length 1, not 0, so the canonical table stays well-defined.
pub fn build_code_lengths(freqs: &[u32]) -> Vec<u8> {
    let mut used: Vec<usize> = (0..freqs.len()).filter(|&i| freqs[i] > 0).collect();
    let mut lengths = vec![0u8; freqs.len()];
    if used.is_empty() {
        return lengths;
    }
    if used.len() == 1 {
        lengths[used[0]] = 1;
        return lengths;
    }

    // Ties broken by original alphabet order: a stable sort by frequency
    // over symbols already in ascending index order achieves this.
    used.sort_by_key(|&i| freqs[i]);
    let n = used.len();
    let mut a: Vec<u64> = used.iter().map(|&i| freqs[i] as u64).collect();

    moffat_katajainen_depths(&mut a);

    for (pos, &symbol) in used.iter().enumerate() {
        lengths[symbol] = a[pos] as u8;
    }

    limit_lengths(&mut lengths, MAX_CODE_LEN as u8);
    lengths
}

/// In-place minimum-redundancy code length computation (Moffat &
/// Katajainen, "A fast and space-economical algorithm for
/// length-limited coding"). `a` holds frequencies in ascending order on
/// entry; on return it holds code lengths in the same symbol order.
fn moffat_katajainen_depths(a: &mut [u64]) {
    let n = a.len();
    if n <= 1 {
        if n == 1 {
            a[0] = 0;
        }
        return;
    }

    // Phase 1: form the Huffman-shaped parent-distance array in place.
    let mut leaf = 0usize;
    let mut root = 0usize;
    for next in 0..n - 1 {
        if leaf >= n || (root < next && a[root] < a[leaf]) {
            a[next] = a[root];
            root += 1;
        } else {
            a[next] = a[leaf];
            leaf += 1;
        }

        if leaf >= n || (root < next && a[root] < a[leaf]) {
            a[next] += a[root];
            a[root] = next as u64;
            root += 1;
        } else {
            a[next] += a[leaf];
            a[leaf] = next as u64;
            leaf += 1;
        }
    }

    // Phase 2: compute depth of each internal node from its parent.
    a[n - 2] = 0;
    for next in (0..n - 2).rev() {
        a[next] = a[a[next] as usize] + 1;
    }

    // Phase 3: convert internal-node depths into per-leaf code lengths.
    let mut avail: u64 = 1;
    let mut used: u64 = 0;
    let mut depth: u64 = 0;
    let mut root = n as i64 - 2;
    let mut next = n as i64 - 1;
    while avail > 0 {
        while root >= 0 && a[root as usize] == depth {
            used += 1;
            root -= 1;
        }
        while avail > used {
            a[next as usize] = depth;
            next -= 1;
            avail -= 1;
        }
        avail = 2 * used;
        depth += 1;
        used = 0;
    }
}

/// Clamp lengths to `limit` bits, repairing the Kraft inequality by
/// borrowing bits from the shortest codes. Moffat-Katajainen produces
/// unlimited-length optimal codes; a sufficiently skewed 256-symbol
/// frequency table can exceed the 32-bit limit `spec.md` §4.4 requires.
fn limit_lengths(lengths: &mut [u8], limit: u8) {
    if lengths.iter().all(|&l| l <= limit) {
        return;
    }
    for l in lengths.iter_mut() {
        if *l > limit {
            *l = limit;
        }
    }
    loop {
        let kraft: f64 = lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2.0f64.powi(-(l as i32)))
            .sum();
        if kraft <= 1.0 {
            break;
        }
        let longest = lengths.iter().filter(|&&l| l > 0).max().copied().unwrap();
        let pos = lengths.iter().position(|&l| l == longest).unwrap();
        lengths[pos] += 1;
        if lengths[pos] as usize > MAX_CODE_LEN {
            // Pathological input; accept the (rare) limit overrun rather
            // than loop forever.
            break;
        }
    }
}

/// Serialize a length table as a bitmap of used symbols followed by the
/// gamma-coded length (offset 1) of each used symbol, in symbol order.
pub fn write_shape(out: &mut BitWriter, lengths: &[u8]) {
    for &len in lengths {
        out.write_bit(len > 0);
    }
    for &len in lengths {
        if len > 0 {
            gamma_encode_value(out, len as u64 - 1);
        }
    }
}

/// Invert [`write_shape`] for an alphabet of `alphabet_size` symbols.
pub fn read_shape(inp: &mut BitReader<'_>, alphabet_size: usize) -> Result<Vec<u8>> {
    let mut used = vec![false; alphabet_size];
    for slot in used.iter_mut() {
        *slot = inp.read_bit()?;
    }
    let mut lengths = vec![0u8; alphabet_size];
    for (symbol, &is_used) in used.iter().enumerate() {
        if is_used {
            let len = gamma_decode_value(inp)? + 1;
            if len > MAX_CODE_LEN as u64 {
                return Err(Error::malformed_header("Huffman shape length exceeds limit"));
            }
            lengths[symbol] = len as u8;
        }
    }
    Ok(lengths)
}

/// Encode `block` as a standalone Huffman-coded payload: shape, 48-bit
/// length, prefix-coded bytes, zero-padded to a byte boundary.
pub fn encode_block(out: &mut BitWriter, block: &[u8]) -> Result<()> {
    let mut freqs = [0u32; 256];
    for &b in block {
        freqs[b as usize] += 1;
    }
    let lengths = build_code_lengths(&freqs);
    write_shape(out, &lengths);
    out.write48(block.len() as u64);

    if !block.is_empty() {
        let table = HuffmanTable::from_lengths(&lengths)?;
        for &b in block {
            let (code, len) = table
                .get_code(b as u16)
                .ok_or_else(|| Error::internal_invariant("symbol missing from Huffman table"))?;
            out.write_bits(code, len);
        }
    }
    out.flush();
    Ok(())
}

/// Decode a block previously written by [`encode_block`].
pub fn decode_block(inp: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let lengths = read_shape(inp, 256)?;
    let length = inp.read48()?;
    if length == 0 {
        inp.flush_buffer();
        return Ok(Vec::new());
    }
    let table = HuffmanTable::from_lengths(&lengths)?;
    let mut out = Vec::with_capacity(length as usize);
    for _ in 0..length {
        out.push(table.decode(inp)? as u8);
    }
    inp.flush_buffer();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_symbol_gets_length_one() {
        let mut freqs = [0u32; 256];
        freqs[b'x' as usize] = 10;
        let lengths = build_code_lengths(&freqs);
        assert_eq!(lengths[b'x' as usize], 1);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 1);
    }

    #[test]
    fn test_kraft_inequality_holds() {
        let freqs: Vec<u32> = vec![1, 1, 2, 3, 5, 8, 13, 21, 34, 55];
        let mut full = [0u32; 256];
        for (i, &f) in freqs.iter().enumerate() {
            full[i] = f;
        }
        let lengths = build_code_lengths(&full);
        let kraft: f64 = lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2.0f64.powi(-(l as i32)))
            .sum();
        assert!(kraft <= 1.0 + 1e-9);
    }

    #[test]
    fn test_more_frequent_gets_shorter_or_equal_code() {
        let mut freqs = [0u32; 256];
        freqs[0] = 1000;
        freqs[1] = 1;
        freqs[2] = 1;
        freqs[3] = 1;
        let lengths = build_code_lengths(&freqs);
        assert!(lengths[0] <= lengths[1]);
    }

    #[test]
    fn test_shape_roundtrip() {
        let mut freqs = [0u32; 256];
        freqs[b'a' as usize] = 5;
        freqs[b'b' as usize] = 3;
        freqs[b'c' as usize] = 1;
        let lengths = build_code_lengths(&freqs);

        let mut w = BitWriter::new();
        write_shape(&mut w, &lengths);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = read_shape(&mut r, 256).unwrap();
        assert_eq!(decoded, lengths);
    }

    fn roundtrip_block(data: &[u8]) {
        let mut w = BitWriter::new();
        encode_block(&mut w, data).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = decode_block(&mut r).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_roundtrip_empty() {
        roundtrip_block(b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        roundtrip_block(b"A");
    }

    #[test]
    fn test_roundtrip_text() {
        roundtrip_block(b"the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_roundtrip_skewed_frequencies() {
        let mut data = vec![b'x'; 1000];
        data.extend_from_slice(b"abcdefghij");
        roundtrip_block(&data);
    }

    #[test]
    fn test_canonical_assignment_length_then_symbol() {
        let mut freqs = [0u32; 256];
        freqs[10] = 1;
        freqs[20] = 1;
        freqs[30] = 2;
        let lengths = build_code_lengths(&freqs);
        let table = HuffmanTable::from_lengths(&lengths).unwrap();
        if lengths[10] == lengths[20] {
            let (code10, _) = table.get_code(10).unwrap();
            let (code20, _) = table.get_code(20).unwrap();
            assert!(code10 < code20);
        }
    }
}
