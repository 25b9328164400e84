//! Move-to-front front-end over either Huffman or arithmetic coding.
//!
//! Five variants combine RLE-or-not, Huffman-or-arithmetic, and an
//! optional separate zero-run vector, per `spec.md` §4.6's normative
//! table. `spec.md` §9 calls out that the source's undocumented
//! single-character tags (`F`/`f`/`A`/`a`/`0`) should be treated as this
//! table defines them; [`MtfVariant`] is a closed enum over exactly those
//! five, rather than a bare `char`.

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::error::{Error, Result};
use bwtc_core::rle::{self, RleParams};
use bwtc_core::universal::{gamma_decode, gamma_decode_value, gamma_encode, gamma_encode_value, Offset};

use crate::{arithmetic, huffman};

/// One of the five MTF variants from `spec.md` §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtfVariant {
    /// No RLE, Huffman back-end.
    PlainHuffman,
    /// RLE(3,255) first, Huffman back-end.
    RleHuffman,
    /// No RLE, arithmetic back-end.
    PlainArithmetic,
    /// RLE(3,255) first, arithmetic back-end.
    RleArithmetic,
    /// No RLE, Huffman back-end, with zero-run coalescing.
    ZeroRun,
}

impl MtfVariant {
    /// The stream tag byte for this variant (`F`/`f`/`A`/`a`/`0`).
    pub fn to_byte(self) -> u8 {
        match self {
            MtfVariant::PlainHuffman => b'F',
            MtfVariant::RleHuffman => b'f',
            MtfVariant::PlainArithmetic => b'A',
            MtfVariant::RleArithmetic => b'a',
            MtfVariant::ZeroRun => b'0',
        }
    }

    fn uses_rle(self) -> bool {
        matches!(self, MtfVariant::RleHuffman | MtfVariant::RleArithmetic)
    }

    fn uses_arithmetic(self) -> bool {
        matches!(self, MtfVariant::PlainArithmetic | MtfVariant::RleArithmetic)
    }
}

impl TryFrom<u8> for MtfVariant {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            b'F' => MtfVariant::PlainHuffman,
            b'f' => MtfVariant::RleHuffman,
            b'A' => MtfVariant::PlainArithmetic,
            b'a' => MtfVariant::RleArithmetic,
            b'0' => MtfVariant::ZeroRun,
            _ => return Err(Error::malformed_header("unknown MTF variant tag")),
        })
    }
}

/// Move-to-front rank list over the full byte alphabet, initialized to
/// identity.
struct RankList {
    order: [u8; 256],
}

impl RankList {
    fn new() -> Self {
        let mut order = [0u8; 256];
        for (i, slot) in order.iter_mut().enumerate() {
            *slot = i as u8;
        }
        Self { order }
    }

    /// Replace `byte` with its current rank, then move it to the front.
    fn rank_of(&mut self, byte: u8) -> u8 {
        let pos = self
            .order
            .iter()
            .position(|&b| b == byte)
            .expect("rank list always contains every byte value");
        if pos > 0 {
            self.order.copy_within(0..pos, 1);
            self.order[0] = byte;
        }
        pos as u8
    }

    /// Recover the byte at `rank`, then move it to the front.
    fn byte_at(&mut self, rank: u8) -> u8 {
        let byte = self.order[rank as usize];
        if rank > 0 {
            self.order.copy_within(0..rank as usize, 1);
            self.order[0] = byte;
        }
        byte
    }
}

fn mtf_transform(data: &[u8]) -> Vec<u8> {
    let mut ranks = RankList::new();
    data.iter().map(|&b| ranks.rank_of(b)).collect()
}

fn mtf_inverse(ranks: &[u8]) -> Vec<u8> {
    let mut list = RankList::new();
    ranks.iter().map(|&r| list.byte_at(r)).collect()
}

/// Coalesce runs of rank 0 in `ranks`: emit one 0 per run plus a
/// separate list of run lengths (`spec.md` §4.6, variant `0`).
fn coalesce_zero_runs(ranks: &[u8]) -> (Vec<u8>, Vec<u64>) {
    let mut out = Vec::with_capacity(ranks.len());
    let mut run_lengths = Vec::new();
    let mut i = 0;
    while i < ranks.len() {
        if ranks[i] == 0 {
            let mut len = 1u64;
            while i + (len as usize) < ranks.len() && ranks[i + len as usize] == 0 {
                len += 1;
            }
            out.push(0);
            run_lengths.push(len);
            i += len as usize;
        } else {
            out.push(ranks[i]);
            i += 1;
        }
    }
    (out, run_lengths)
}

/// Invert [`coalesce_zero_runs`].
fn expand_zero_runs(coalesced: &[u8], run_lengths: &[u64]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut run_idx = 0;
    for &r in coalesced {
        if r == 0 {
            let len = *run_lengths
                .get(run_idx)
                .ok_or_else(|| Error::malformed_header("zero-run vector exhausted"))?;
            run_idx += 1;
            out.extend(std::iter::repeat_n(0u8, len as usize));
        } else {
            out.push(r);
        }
    }
    if run_idx != run_lengths.len() {
        return Err(Error::malformed_header("zero-run vector has unused entries"));
    }
    Ok(out)
}

/// Encode `block` with MTF variant `variant`.
///
/// Layout (`spec.md` §6): `[6-byte reserved]` then, if the variant runs
/// RLE first, `[48-bit |R|][gamma(R)]`, then the back-end payload, then
/// (variant `0` only) `[gamma(zero_run_lengths)]`.
pub fn encode_block(out: &mut BitWriter, block: &[u8], variant: MtfVariant) -> Result<()> {
    log::debug!("mtf encode: {} bytes, variant {:?}", block.len(), variant);
    let reserved_at = out.reserve48();

    let ranks_input = if variant.uses_rle() {
        let encoded = rle::encode(block, RleParams::STANDARD);
        out.write48(encoded.runs.len() as u64);
        gamma_encode(out, &encoded.runs, Offset(0));
        encoded.literal
    } else {
        block.to_vec()
    };

    let ranks = mtf_transform(&ranks_input);

    let (backend_input, zero_runs) = if matches!(variant, MtfVariant::ZeroRun) {
        let (coalesced, runs) = coalesce_zero_runs(&ranks);
        (coalesced, Some(runs))
    } else {
        (ranks, None)
    };

    if variant.uses_arithmetic() {
        arithmetic::encode_block(out, &backend_input)?;
    } else {
        huffman::encode_block(out, &backend_input)?;
    }

    if let Some(runs) = zero_runs {
        gamma_encode_value(out, runs.len() as u64);
        gamma_encode(out, &runs, Offset(1));
    }

    out.write48_at(0, reserved_at); // reserved field carries no payload data here
    Ok(())
}

/// Decode a block previously written by [`encode_block`] with the same
/// `variant`.
pub fn decode_block(inp: &mut BitReader<'_>, variant: MtfVariant) -> Result<Vec<u8>> {
    let _reserved = inp.read48()?;

    let run_lengths = if variant.uses_rle() {
        let count = inp.read48()? as usize;
        Some(gamma_decode(inp, count, Offset(0))?)
    } else {
        None
    };

    let backend_output = if variant.uses_arithmetic() {
        arithmetic::decode_block(inp)?
    } else {
        huffman::decode_block(inp)?
    };

    let ranks = if matches!(variant, MtfVariant::ZeroRun) {
        let run_count = gamma_decode_value(inp)? as usize;
        let zero_runs = gamma_decode(inp, run_count, Offset(1))?;
        expand_zero_runs(&backend_output, &zero_runs)?
    } else {
        backend_output
    };

    let literal = mtf_inverse(&ranks);

    if variant.uses_rle() {
        let runs = run_lengths.expect("RLE variant always reads a run-length vector");
        let encoded = rle::RleEncoded {
            literal,
            runs,
        };
        rle::decode(&encoded, RleParams::STANDARD)
    } else {
        Ok(literal)
    }
}
