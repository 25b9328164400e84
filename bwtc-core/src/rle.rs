//! Run-length transform shared by the MTF, interpolative, and
//! inverse-frequency coders.
//!
//! Every maximal run of length `>= min_run` of a byte `<= max_val` is
//! replaced in the literal output by exactly `min_run` copies of that
//! byte; the remaining run lengths (each reduced by `min_run - 1`) are
//! collected into a side vector. A run of exactly `min_run - 1` is left
//! intact and produces no side-vector entry; a run of exactly `min_run`
//! produces one entry of value `1`.

use crate::error::{Error, Result};

/// Parameters governing one run-length transform. `(minrun=3, maxval=255)`
/// is the typical post-BWT configuration; `(minrun=1, maxval=0)` is
/// zero-run-only mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleParams {
    /// Minimum run length eligible for replacement.
    pub min_run: u32,
    /// Largest byte value eligible for run replacement.
    pub max_val: u8,
}

impl RleParams {
    /// Typical post-BWT configuration: runs of 3+ of any byte.
    pub const STANDARD: Self = Self {
        min_run: 3,
        max_val: 255,
    };

    /// Zero-run-only mode: runs of 1+ zero bytes.
    pub const ZERO_ONLY: Self = Self {
        min_run: 1,
        max_val: 0,
    };
}

/// Output of [`encode`]: the literal block `d` plus the run-length vector
/// `r` (each entry already reduced by `min_run - 1`, i.e. a run of
/// exactly `min_run` appears as `1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleEncoded {
    /// Literal bytes, with every eligible run truncated to `min_run` copies.
    pub literal: Vec<u8>,
    /// Run-length side vector, one entry per truncated run.
    pub runs: Vec<u64>,
}

/// Run-length encode `data` under `params`.
pub fn encode(data: &[u8], params: RleParams) -> RleEncoded {
    let mut literal = Vec::with_capacity(data.len());
    let mut runs = Vec::new();

    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        let mut len = 1usize;
        while i + len < data.len() && data[i + len] == byte {
            len += 1;
        }

        if len as u32 >= params.min_run && byte <= params.max_val {
            for _ in 0..params.min_run {
                literal.push(byte);
            }
            runs.push((len as u64) - params.min_run as u64 + 1);
        } else {
            for _ in 0..len {
                literal.push(byte);
            }
        }
        i += len;
    }

    RleEncoded { literal, runs }
}

/// Invert [`encode`], reproducing the original block.
pub fn decode(encoded: &RleEncoded, params: RleParams) -> Result<Vec<u8>> {
    let RleEncoded { literal, runs } = encoded;
    let mut out = Vec::with_capacity(literal.len() * 2);
    let mut run_idx = 0usize;

    let mut i = 0;
    while i < literal.len() {
        let byte = literal[i];
        let mut len = 1usize;
        while i + len < literal.len() && literal[i + len] == byte && (len as u32) < params.min_run
        {
            len += 1;
        }

        for _ in 0..len {
            out.push(byte);
        }
        i += len;

        if len as u32 == params.min_run && byte <= params.max_val {
            let extra = *runs
                .get(run_idx)
                .ok_or_else(|| Error::inconsistent_rle(runs.len(), run_idx))?;
            run_idx += 1;
            for _ in 0..(extra - 1) {
                out.push(byte);
            }
        }
    }

    if run_idx != runs.len() {
        return Err(Error::inconsistent_rle(runs.len(), run_idx));
    }

    Ok(out)
}
