//! Recursive binary interpolative coding of a byte block's symbol
//! frequencies (`spec.md` §4.7).
//!
//! Each recursive node transmits the left half's frequency vector
//! conditioned on its parent's frequency vector, using a phase-in code
//! for every symbol but the locally most frequent one (whose count is
//! always recoverable by subtraction). [`FreqMem`] answers "how many of
//! each alphabet symbol occur in `[a, b)`" queries in better than linear
//! time via a two-level prefix-sum cache.

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::error::{Error, Result};
use bwtc_core::interp_code::{phasein_decode, phasein_encode};
use bwtc_core::rle::{self, RleParams};
use bwtc_core::universal::{gamma_decode, gamma_encode, Offset};

const SMALL_INTERVAL: usize = 16;

/// Two-level prefix-sum cache over a fixed byte slice, answering
/// per-alphabet frequency-in-range queries.
///
/// - A *big table* holds full 256-symbol prefix sums at every multiple of
///   `big_interval`, sized so `(n / big_interval) * 256 <= 2_000_000`.
/// - A *small cache* covers one big interval at a time, built lazily for
///   the alphabet of the query that falls inside it, at `SMALL_INTERVAL`
///   resolution.
/// - Subranges smaller than `SMALL_INTERVAL` are scanned directly.
struct FreqMem<'a> {
    data: &'a [u8],
    big_interval: usize,
    big_table: Vec<[u32; 256]>,
    small_cache: Option<SmallCache>,
}

struct SmallCache {
    big_block: usize,
    alphabet: Vec<u8>,
    /// `prefix[i][j]` = count of `alphabet[j]` in
    /// `data[big_start .. big_start + i * SMALL_INTERVAL)`.
    prefix: Vec<Vec<u32>>,
}

impl<'a> FreqMem<'a> {
    fn new(data: &'a [u8]) -> Self {
        let n = data.len().max(1);
        let big_interval = ((n * 256).div_ceil(2_000_000)).max(SMALL_INTERVAL);

        let mut big_table = Vec::new();
        let mut counts = [0u32; 256];
        big_table.push(counts);
        for (i, &b) in data.iter().enumerate() {
            counts[b as usize] += 1;
            if (i + 1) % big_interval == 0 {
                big_table.push(counts);
            }
        }

        Self {
            data,
            big_interval,
            big_table,
            small_cache: None,
        }
    }

    fn ensure_small_cache(&mut self, big_block: usize, alphabet: &[u8]) {
        if let Some(cache) = &self.small_cache {
            if cache.big_block == big_block && cache.alphabet == alphabet {
                return;
            }
        }
        let big_start = big_block * self.big_interval;
        let big_end = (big_start + self.big_interval).min(self.data.len());
        let steps = (big_end - big_start).div_ceil(SMALL_INTERVAL);
        let mut prefix = vec![vec![0u32; alphabet.len()]; steps + 1];
        let mut running = vec![0u32; alphabet.len()];
        let mut pos = big_start;
        for step in 1..=steps {
            let end = (big_start + step * SMALL_INTERVAL).min(big_end);
            while pos < end {
                if let Some(j) = alphabet.iter().position(|&s| s == self.data[pos]) {
                    running[j] += 1;
                }
                pos += 1;
            }
            prefix[step] = running.clone();
        }
        self.small_cache = Some(SmallCache {
            big_block,
            alphabet: alphabet.to_vec(),
            prefix,
        });
    }

    fn count_prefix(&mut self, x: usize, alphabet: &[u8]) -> Vec<u64> {
        let big_block = x / self.big_interval;
        let big_start = big_block * self.big_interval;
        let mut counts: Vec<u64> = alphabet
            .iter()
            .map(|&s| self.big_table[big_block][s as usize] as u64)
            .collect();

        let remainder = x - big_start;
        if remainder == 0 {
            return counts;
        }
        self.ensure_small_cache(big_block, alphabet);
        let small_step = remainder / SMALL_INTERVAL;
        {
            let cache = self.small_cache.as_ref().unwrap();
            for (j, &c) in cache.prefix[small_step].iter().enumerate() {
                counts[j] += c as u64;
            }
        }
        let scanned_to = big_start + small_step * SMALL_INTERVAL;
        for &byte in &self.data[scanned_to..big_start + remainder] {
            if let Some(j) = alphabet.iter().position(|&s| s == byte) {
                counts[j] += 1;
            }
        }
        counts
    }

    /// Exact frequency of every symbol of `alphabet` in `data[a..b)`.
    fn query(&mut self, a: usize, b: usize, alphabet: &[u8]) -> Vec<u64> {
        if b - a < SMALL_INTERVAL {
            let mut counts = vec![0u64; alphabet.len()];
            for &byte in &self.data[a..b] {
                if let Some(j) = alphabet.iter().position(|&s| s == byte) {
                    counts[j] += 1;
                }
            }
            return counts;
        }
        let at_b = self.count_prefix(b, alphabet);
        let at_a = self.count_prefix(a, alphabet);
        at_b.iter().zip(at_a.iter()).map(|(&hb, &ha)| hb - ha).collect()
    }
}

fn argmax(freqs: &[u64]) -> usize {
    let mut best = 0;
    for i in 1..freqs.len() {
        if freqs[i] > freqs[best] {
            best = i;
        }
    }
    best
}

/// Remove zero-frequency entries from `(alphabet, freqs)`, preserving the
/// relative order of the survivors (`spec.md` §9's resolution of
/// `freq::clean()`).
fn clean(alphabet: &[u8], freqs: &[u64]) -> (Vec<u8>, Vec<u64>) {
    let mut out_alpha = Vec::new();
    let mut out_freqs = Vec::new();
    for (i, &f) in freqs.iter().enumerate() {
        if f > 0 {
            out_alpha.push(alphabet[i]);
            out_freqs.push(f);
        }
    }
    (out_alpha, out_freqs)
}

/// Transmit `l` (the left-half frequency vector) conditioned on `parent`
/// and the left-half size `half`, per `spec.md` §4.7's `output` procedure.
fn output_encode(out: &mut BitWriter, l: &[u64], parent: &[u64], half: u64, skip: usize) {
    let mut remaining = half;
    for i in 0..parent.len() {
        if i == skip {
            continue;
        }
        if remaining == 0 {
            break;
        }
        let range = remaining.min(parent[i]);
        phasein_encode(out, l[i], range);
        remaining -= l[i];
    }
}

fn output_decode(inp: &mut BitReader<'_>, parent: &[u64], half: u64, skip: usize) -> Result<Vec<u64>> {
    let mut l = vec![0u64; parent.len()];
    let mut remaining = half;
    for i in 0..parent.len() {
        if i == skip {
            continue;
        }
        if remaining == 0 {
            break;
        }
        let range = remaining.min(parent[i]);
        let v = phasein_decode(inp, range)?;
        l[i] = v;
        remaining -= v;
    }
    l[skip] = remaining;
    Ok(l)
}

fn encode_node(
    out: &mut BitWriter,
    freq_mem: &mut FreqMem<'_>,
    data: &[u8],
    alphabet: &[u8],
    parent: &[u64],
    idx: usize,
    size: usize,
) -> Result<()> {
    debug_assert_eq!(parent.iter().sum::<u64>(), size as u64);
    if alphabet.len() <= 1 {
        return Ok(());
    }
    if size == 2 {
        // The discriminating bit is always sent (see SPEC_FULL.md's
        // Non-goals for the RLE(minrun=1) omission this excludes).
        out.write_bit(data[idx] == alphabet[1]);
        return Ok(());
    }

    let half = size / 2;
    let l = freq_mem.query(idx, idx + half, alphabet);
    let m = argmax(parent);
    output_encode(out, &l, parent, half as u64, m);

    let right: Vec<u64> = (0..parent.len()).map(|i| parent[i] - l[i]).collect();
    let (left_alpha, left_freqs) = clean(alphabet, &l);
    let (right_alpha, right_freqs) = clean(alphabet, &right);

    encode_node(out, freq_mem, data, &left_alpha, &left_freqs, idx, half)?;
    encode_node(
        out,
        freq_mem,
        data,
        &right_alpha,
        &right_freqs,
        idx + half,
        size - half,
    )
}

fn decode_node(
    inp: &mut BitReader<'_>,
    alphabet: &[u8],
    parent: &[u64],
    out: &mut [u8],
    size: usize,
) -> Result<()> {
    debug_assert_eq!(parent.iter().sum::<u64>(), size as u64);
    if alphabet.len() == 1 {
        out.fill(alphabet[0]);
        return Ok(());
    }
    if alphabet.is_empty() {
        return if size == 0 {
            Ok(())
        } else {
            Err(Error::internal_invariant(
                "interpolative recursion has symbols but empty alphabet",
            ))
        };
    }
    if size == 2 {
        let bit = inp.read_bit()?;
        out[0] = if bit { alphabet[1] } else { alphabet[0] };
        out[1] = if bit { alphabet[0] } else { alphabet[1] };
        return Ok(());
    }

    let half = size / 2;
    let m = argmax(parent);
    let l = output_decode(inp, parent, half as u64, m)?;

    let right: Vec<u64> = (0..parent.len()).map(|i| parent[i] - l[i]).collect();
    let (left_alpha, left_freqs) = clean(alphabet, &l);
    let (right_alpha, right_freqs) = clean(alphabet, &right);

    let (left_out, right_out) = out.split_at_mut(half);
    decode_node(inp, &left_alpha, &left_freqs, left_out, half)?;
    decode_node(inp, &right_alpha, &right_freqs, right_out, size - half)
}

fn alphabet_and_freqs(freqs: &[u64; 256]) -> (Vec<u8>, Vec<u64>) {
    let mut alphabet = Vec::new();
    let mut values = Vec::new();
    for (i, &f) in freqs.iter().enumerate() {
        if f > 0 {
            alphabet.push(i as u8);
            values.push(f);
        }
    }
    (alphabet, values)
}

/// Encode `block` with no RLE pre-step.
pub fn encode_block(out: &mut BitWriter, block: &[u8]) -> Result<()> {
    encode_block_with_rle(out, block, None)
}

/// Encode `block`, optionally applying zero-run RLE with `min_rle_run`
/// first (`spec.md` §6: `if RLE: [48-bit |R|] [gamma(R, offset=0)]`).
pub fn encode_block_with_rle(
    out: &mut BitWriter,
    block: &[u8],
    min_rle_run: Option<u32>,
) -> Result<()> {
    let literal = if let Some(min_run) = min_rle_run {
        let encoded = rle::encode(block, RleParams { min_run, max_val: 0 });
        out.write48(encoded.runs.len() as u64);
        gamma_encode(out, &encoded.runs, Offset(0));
        encoded.literal
    } else {
        block.to_vec()
    };

    let mut freqs = [0u64; 256];
    for &b in &literal {
        freqs[b as usize] += 1;
    }
    gamma_encode(out, &freqs, Offset(1));

    let (alphabet, parent_freqs) = alphabet_and_freqs(&freqs);
    if !alphabet.is_empty() {
        let mut freq_mem = FreqMem::new(&literal);
        encode_node(
            out,
            &mut freq_mem,
            &literal,
            &alphabet,
            &parent_freqs,
            0,
            literal.len(),
        )?;
    }
    out.flush();
    Ok(())
}

/// Decode a block previously written by [`encode_block`].
pub fn decode_block(inp: &mut BitReader<'_>) -> Result<Vec<u8>> {
    decode_block_with_rle(inp, None)
}

/// Decode a block previously written by [`encode_block_with_rle`] with
/// the same `min_rle_run`.
pub fn decode_block_with_rle(
    inp: &mut BitReader<'_>,
    min_rle_run: Option<u32>,
) -> Result<Vec<u8>> {
    let run_lengths = if min_rle_run.is_some() {
        let count = inp.read48()? as usize;
        Some(gamma_decode(inp, count, Offset(0))?)
    } else {
        None
    };

    let freqs_vec = gamma_decode(inp, 256, Offset(1))?;
    let mut freqs = [0u64; 256];
    freqs.copy_from_slice(&freqs_vec);
    let total: u64 = freqs.iter().sum();

    let (alphabet, parent_freqs) = alphabet_and_freqs(&freqs);
    let mut literal = vec![0u8; total as usize];
    if !alphabet.is_empty() {
        decode_node(inp, &alphabet, &parent_freqs, &mut literal, total as usize)?;
    }
    inp.flush_buffer();

    if let Some(min_run) = min_rle_run {
        let runs = run_lengths.expect("RLE mode always reads a run-length vector");
        let encoded = rle::RleEncoded { literal, runs };
        rle::decode(&encoded, RleParams { min_run, max_val: 0 })
    } else {
        Ok(literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_query(data: &[u8], a: usize, b: usize, alphabet: &[u8]) -> Vec<u64> {
        let mut counts = vec![0u64; alphabet.len()];
        for &byte in &data[a..b] {
            if let Some(j) = alphabet.iter().position(|&s| s == byte) {
                counts[j] += 1;
            }
        }
        counts
    }

    #[test]
    fn test_freq_mem_matches_naive() {
        let data: Vec<u8> = (0..500).map(|i| (i % 7) as u8).collect();
        let alphabet = vec![0u8, 3, 6];
        let mut mem = FreqMem::new(&data);
        for &(a, b) in &[(0, 500), (10, 300), (0, 20), (480, 500), (100, 101)] {
            assert_eq!(
                mem.query(a, b, &alphabet),
                naive_query(&data, a, b, &alphabet),
                "range [{a},{b})"
            );
        }
    }

    fn roundtrip(data: &[u8]) {
        let mut w = BitWriter::new();
        encode_block(&mut w, data).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = decode_block(&mut r).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_roundtrip_empty() {
        roundtrip(b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        roundtrip(b"z");
    }

    #[test]
    fn test_roundtrip_two_symbols() {
        roundtrip(b"ababababab");
    }

    #[test]
    fn test_roundtrip_text() {
        roundtrip(b"the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn test_roundtrip_skewed() {
        let mut data = vec![b'x'; 200];
        data.extend_from_slice(b"abcdef");
        roundtrip(&data);
    }

    #[test]
    fn test_scenario_s4_min_rle_run_one() {
        let data = [0x00u8, 0x01, 0x00, 0x01, 0x00];
        let mut w = BitWriter::new();
        encode_block_with_rle(&mut w, &data, Some(1)).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let decoded = decode_block_with_rle(&mut r, Some(1)).unwrap();
        assert_eq!(decoded, data);
    }
}
