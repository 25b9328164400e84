//! Entropy coders for a Burrows-Wheeler block compressor.
//!
//! This crate provides five interchangeable entropy coders operating on a
//! post-BWT byte block:
//!
//! - [`huffman`]: order-0 static canonical Huffman coding
//! - [`arithmetic`]: order-0 range coding over static byte statistics
//! - [`mtf`]: move-to-front front-end feeding Huffman or arithmetic
//! - [`interpolative`]: recursive binary interpolative coding of symbol
//!   frequencies
//! - [`ifc`]: inverse-frequency gap-sequence coding
//!
//! A stream opens with a single coder-tag byte ([`CoderTag`]); every block
//! thereafter is framed by an opaque [`BwtBlockHeader`] followed by the
//! chosen coder's payload. [`encode_block`] and [`decode_block`] dispatch
//! on the tag.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arithmetic;
pub mod huffman;
pub mod ifc;
pub mod interpolative;
pub mod mtf;

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::error::{Error, Result};

/// Opaque BWT block header, borrowed from the outer driver.
///
/// The BWT transform and block slicing are external collaborators; the
/// entropy stage only needs to read and write the header's bytes and
/// learn the block's original (pre-entropy-coding) size from it. An
/// empty header with `original_size() == 0` marks end of stream.
pub trait BwtBlockHeader {
    /// Write this header to `out`, returning the number of bytes written.
    fn write_header(&self, out: &mut BitWriter) -> usize;

    /// Read a header from `inp`, producing a new instance.
    fn read_header(inp: &mut BitReader<'_>) -> Result<Self>
    where
        Self: Sized;

    /// The original (pre-entropy-coding) block length this header describes.
    fn original_size(&self) -> u64;
}

/// A minimal [`BwtBlockHeader`] carrying only the block's original length
/// as a 48-bit field, sufficient to drive the round-trip scenarios this
/// crate is responsible for; a real BWT header (coordinates, stripe
/// metadata, etc.) is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefixedHeader {
    original_size: u64,
}

impl LengthPrefixedHeader {
    /// Build a header describing a block of `original_size` bytes.
    pub fn new(original_size: u64) -> Self {
        Self { original_size }
    }

    /// Build the end-of-stream marker header (`original_size == 0`).
    pub fn end_of_stream() -> Self {
        Self { original_size: 0 }
    }

    /// True if this is the end-of-stream marker.
    pub fn is_end_of_stream(&self) -> bool {
        self.original_size == 0
    }
}

impl BwtBlockHeader for LengthPrefixedHeader {
    fn write_header(&self, out: &mut BitWriter) -> usize {
        let before = out.byte_len();
        out.write48(self.original_size);
        out.byte_len() - before
    }

    fn read_header(inp: &mut BitReader<'_>) -> Result<Self> {
        Ok(Self {
            original_size: inp.read48()?,
        })
    }

    fn original_size(&self) -> u64 {
        self.original_size
    }
}

/// The one-byte stream-opening tag identifying which coder produced every
/// block in the stream. Closed set, matching §9's "small sum type, not an
/// open inheritance hierarchy" design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderTag {
    /// Standalone Huffman coder.
    Huffman,
    /// Order-0 arithmetic (range) coder.
    Arithmetic,
    /// Recursive binary interpolative coder.
    Interpolative,
    /// Inverse-frequency (gap-sequence) coder.
    InverseFrequency,
    /// Move-to-front front-end, one of the five table-driven variants.
    Mtf(mtf::MtfVariant),
}

impl CoderTag {
    /// The byte written at stream start for this tag.
    pub fn to_byte(self) -> u8 {
        match self {
            CoderTag::Huffman => b'H',
            CoderTag::Arithmetic => b'm',
            CoderTag::Interpolative => b'i',
            CoderTag::InverseFrequency => b'G',
            CoderTag::Mtf(variant) => variant.to_byte(),
        }
    }
}

impl TryFrom<u8> for CoderTag {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            b'H' => CoderTag::Huffman,
            b'm' => CoderTag::Arithmetic,
            b'i' => CoderTag::Interpolative,
            b'G' => CoderTag::InverseFrequency,
            b'W' => {
                return Err(Error::malformed_header(
                    "coder tag 'W' (wavelet) is not implemented in this core",
                ));
            }
            other => CoderTag::Mtf(mtf::MtfVariant::try_from(other)?),
        })
    }
}

/// Encode `block` with the coder identified by `tag`, writing the header
/// and payload to `out`.
pub fn encode_block(out: &mut BitWriter, block: &[u8], tag: CoderTag) -> Result<()> {
    log::trace!("encoding block of {} bytes with tag {:?}", block.len(), tag);
    match tag {
        CoderTag::Huffman => huffman::encode_block(out, block),
        CoderTag::Arithmetic => arithmetic::encode_block(out, block),
        CoderTag::Interpolative => interpolative::encode_block(out, block),
        CoderTag::InverseFrequency => ifc::encode_block(out, block),
        CoderTag::Mtf(variant) => mtf::encode_block(out, block, variant),
    }
}

/// Decode one block previously written by [`encode_block`] with the same
/// `tag`.
pub fn decode_block(inp: &mut BitReader<'_>, tag: CoderTag) -> Result<Vec<u8>> {
    log::trace!("decoding block with tag {:?}", tag);
    match tag {
        CoderTag::Huffman => huffman::decode_block(inp),
        CoderTag::Arithmetic => arithmetic::decode_block(inp),
        CoderTag::Interpolative => interpolative::decode_block(inp),
        CoderTag::InverseFrequency => ifc::decode_block(inp),
        CoderTag::Mtf(variant) => mtf::decode_block(inp, variant),
    }
}

/// Write the one-byte stream header.
pub fn write_stream_header(out: &mut BitWriter, tag: CoderTag) {
    out.write_byte(tag.to_byte());
}

/// Read the one-byte stream header.
pub fn read_stream_header(inp: &mut BitReader<'_>) -> Result<CoderTag> {
    CoderTag::try_from(inp.read_byte()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coder_tag_roundtrip_bytes() {
        for tag in [
            CoderTag::Huffman,
            CoderTag::Arithmetic,
            CoderTag::Interpolative,
            CoderTag::InverseFrequency,
            CoderTag::Mtf(mtf::MtfVariant::PlainHuffman),
            CoderTag::Mtf(mtf::MtfVariant::RleHuffman),
            CoderTag::Mtf(mtf::MtfVariant::PlainArithmetic),
            CoderTag::Mtf(mtf::MtfVariant::RleArithmetic),
            CoderTag::Mtf(mtf::MtfVariant::ZeroRun),
        ] {
            assert_eq!(CoderTag::try_from(tag.to_byte()).unwrap(), tag);
        }
    }

    #[test]
    fn test_wavelet_tag_rejected() {
        assert!(CoderTag::try_from(b'W').is_err());
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(CoderTag::try_from(b'?').is_err());
    }

    #[test]
    fn test_end_of_stream_header() {
        let mut w = BitWriter::new();
        LengthPrefixedHeader::end_of_stream().write_header(&mut w);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let header = LengthPrefixedHeader::read_header(&mut r).unwrap();
        assert!(header.is_end_of_stream());
    }

    #[test]
    fn test_length_prefixed_header_roundtrip() {
        let mut w = BitWriter::new();
        LengthPrefixedHeader::new(12345).write_header(&mut w);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        let header = LengthPrefixedHeader::read_header(&mut r).unwrap();
        assert_eq!(header.original_size(), 12345);
    }
}
