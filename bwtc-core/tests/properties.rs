//! Cross-module universal properties that don't belong to a single
//! source file (`spec.md` §8).

use bwtc_core::bitstream::{BitReader, BitWriter};
use bwtc_core::rle::{self, RleParams};
use bwtc_core::universal::{gamma_decode, gamma_encode, Offset};

/// Property 4: RLE reversibility for a range of `(min_run, max_val)`
/// configurations and input shapes.
#[test]
fn rle_reversibility_across_parameters() {
    let inputs: &[&[u8]] = &[
        b"",
        b"a",
        b"aaaa",
        b"aaabbbccccccddddddddddd",
        &[0u8; 500],
        &[7u8; 2],
        b"mixed run lengths aaa bbbbb c d",
    ];
    let params = [
        RleParams::STANDARD,
        RleParams::ZERO_ONLY,
        RleParams { min_run: 1, max_val: 255 },
        RleParams { min_run: 5, max_val: 100 },
    ];
    for &data in inputs {
        for &p in &params {
            let encoded = rle::encode(data, p);
            let decoded = rle::decode(&encoded, p).unwrap();
            assert_eq!(decoded, data, "params {p:?} data {data:?}");
        }
    }
}

/// A byte stream interleaving gamma-coded vectors and raw 48-bit fields
/// is fully self-delimiting: the reader consumes exactly what the
/// writer wrote, with no shortfall or overrun.
#[test]
fn gamma_and_fixed_fields_are_self_delimiting() {
    let mut w = BitWriter::new();
    w.write48(12345);
    gamma_encode(&mut w, &[0, 1, 2, 100, 9999], Offset(0));
    w.write_byte(0xAB);
    let bytes = w.into_bytes();

    let mut r = BitReader::new(&bytes);
    assert_eq!(r.read48().unwrap(), 12345);
    assert_eq!(
        gamma_decode(&mut r, 5, Offset(0)).unwrap(),
        vec![0, 1, 2, 100, 9999]
    );
    assert_eq!(r.read_byte().unwrap(), 0xAB);
    assert!(r.compressed_data_ending());
}
