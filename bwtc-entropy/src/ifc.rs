//! Inverse-frequency (gap-sequence) coding (`spec.md` §4.8).
//!
//! Symbols are visited in ascending order of global frequency; for each
//! one (but the most frequent, whose positions are left for last) every
//! occurrence is transmitted as the count of not-yet-assigned positions
//! since the previous occurrence. The framing layout in `spec.md` §6
//! shows the `[48-bit |R|][gamma(R)]` RLE fields unconditionally, so
//! RLE(3,255) is always applied here rather than being optional as §4.8's
//! prose alone might suggest.

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::error::Result;
use bwtc_core::rle::{self, RleParams};
use bwtc_core::universal::{gamma_decode, gamma_encode, Offset};

fn frequency_order(freq: &[u64; 256]) -> Vec<u8> {
    let mut order: Vec<u8> = (0..=255u16).map(|i| i as u8).collect();
    order.sort_by_key(|&c| freq[c as usize]);
    order
}

/// Encode `block` as: `[48-bit |R|]·[gamma(R)]·[gamma(freqs, offset=1)]`,
/// then one gap-coded occurrence vector per symbol (ascending frequency
/// order, most-frequent symbol omitted).
pub fn encode_block(out: &mut BitWriter, block: &[u8]) -> Result<()> {
    let encoded = rle::encode(block, RleParams::STANDARD);
    out.write48(encoded.runs.len() as u64);
    gamma_encode(out, &encoded.runs, Offset(0));
    let data = encoded.literal;

    let mut freq = [0u64; 256];
    for &b in &data {
        freq[b as usize] += 1;
    }
    gamma_encode(out, &freq, Offset(1));

    let order = frequency_order(&freq);
    let mut marked = vec![false; data.len()];

    for &c in &order[..255] {
        let f = freq[c as usize];
        if f == 0 {
            continue;
        }
        let mut gaps = Vec::with_capacity(f as usize);
        let mut gap = 0u64;
        for (i, &byte) in data.iter().enumerate() {
            if marked[i] {
                continue;
            }
            if byte == c {
                gaps.push(gap);
                gap = 0;
                marked[i] = true;
            } else {
                gap += 1;
            }
        }
        gamma_encode(out, &gaps, Offset(1));
    }

    out.flush();
    Ok(())
}

/// Decode a block previously written by [`encode_block`].
pub fn decode_block(inp: &mut BitReader<'_>) -> Result<Vec<u8>> {
    let run_count = inp.read48()? as usize;
    let runs = gamma_decode(inp, run_count, Offset(0))?;

    let freq_vec = gamma_decode(inp, 256, Offset(1))?;
    let mut freq = [0u64; 256];
    freq.copy_from_slice(&freq_vec);
    let total = freq.iter().sum::<u64>() as usize;

    let order = frequency_order(&freq);
    let mut data = vec![0u8; total];
    let mut marked = vec![false; total];

    for &c in &order[..255] {
        let f = freq[c as usize];
        if f == 0 {
            continue;
        }
        let gaps = gamma_decode(inp, f as usize, Offset(1))?;
        let mut pos = 0usize;
        for gap in gaps {
            let mut remaining = gap;
            while remaining > 0 {
                if !marked[pos] {
                    remaining -= 1;
                }
                pos += 1;
            }
            while marked[pos] {
                pos += 1;
            }
            data[pos] = c;
            marked[pos] = true;
            pos += 1;
        }
    }

    let last = order[255];
    for (i, slot) in data.iter_mut().enumerate() {
        if !marked[i] {
            *slot = last;
        }
    }
    inp.flush_buffer();

    let encoded = rle::RleEncoded { literal: data, runs };
    rle::decode(&encoded, RleParams::STANDARD)
}
