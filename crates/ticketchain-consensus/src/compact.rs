//! Compact ("nBits") encoding of 256-bit targets.
//!
//! A compact value packs an unsigned 8-bit exponent, a sign bit and a 23-bit
//! mantissa as `EEEEEEEE SMMMMMMM MMMMMMMM MMMMMMMM`, representing
//! `sign * mantissa * 256^(exponent - 3)`.

use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};

const MANTISSA_MASK: u32 = 0x007f_ffff;
const SIGN_BIT: u32 = 0x0080_0000;

/// Decode a compact value into a big integer.
pub fn compact_to_big(compact: u32) -> BigInt {
    let mantissa = compact & MANTISSA_MASK;
    let is_negative = compact & SIGN_BIT != 0;
    let exponent = compact >> 24;

    // Exponents of 3 or less shift the mantissa right instead of scaling by
    // a fractional power of 256.
    let value = if exponent <= 3 {
        BigInt::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigInt::from(mantissa) << (8 * (exponent - 3)) as usize
    };

    if is_negative {
        -value
    } else {
        value
    }
}

/// Encode a big integer as a compact value.
///
/// Only the three most significant bytes survive. When the top mantissa bit
/// would collide with the sign bit the mantissa is shifted right one byte and
/// the exponent incremented, so encoding is lossy.
///
/// The exponent occupies one byte. Magnitudes needing an exponent above 255
/// (more than 254 bytes, or 255 bytes with the top mantissa bit set) lose the
/// exponent's high bits; callers taking arbitrary input must bound it first.
pub fn big_to_compact(n: &BigInt) -> u32 {
    if n.is_zero() {
        return 0;
    }

    let magnitude = n.magnitude();
    let mut exponent = ((magnitude.bits() + 7) / 8) as u32;
    let mut mantissa = if exponent <= 3 {
        low_u32(magnitude) << (8 * (3 - exponent))
    } else {
        low_u32(&(magnitude >> (8 * (exponent - 3)) as usize))
    };

    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        exponent += 1;
    }

    let mut compact = (exponent << 24) | mantissa;
    if n.sign() == Sign::Minus {
        compact |= SIGN_BIT;
    }
    compact
}

fn low_u32(n: &num_bigint::BigUint) -> u32 {
    n.iter_u32_digits().next().unwrap_or(0)
}

/// Expected number of hashes to find a block at the compact target `bits`.
///
/// Work is `2^256 / (target + 1)`; non-positive targets carry no work.
pub fn calc_work(bits: u32) -> BigInt {
    let target = compact_to_big(bits);
    if !target.is_positive() {
        return BigInt::zero();
    }
    (BigInt::one() << 256usize) / (target + BigInt::one())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_big(s: &str) -> BigInt {
        BigInt::parse_bytes(s.as_bytes(), 16).unwrap()
    }

    #[test]
    fn test_compact_to_big_vectors() {
        let cases: &[(u32, i64)] = &[
            (0x01003456, 0x00),
            (0x01123456, 0x12),
            (0x02008000, 0x80),
            (0x05009234, 0x9234_0000),
            (0x04923456, -0x1234_5600),
            (0x04123456, 0x1234_5600),
            (0x01fedcba, -0x7e),
            (0x00123456, 0),
            (0x02123456, 0x1234),
            (0x03123456, 0x12_3456),
        ];
        for &(compact, want) in cases {
            assert_eq!(compact_to_big(compact), BigInt::from(want), "compact 0x{:08x}", compact);
        }
    }

    #[test]
    fn test_big_to_compact_vectors() {
        let cases: &[(i64, u32)] = &[
            (0, 0),
            (-1, 0x01810000),
            (0x12, 0x01120000),
            (-0x7e, 0x01fe0000),
            (0x80, 0x02008000),
            (0x1234, 0x02123400),
            (0x12_3456, 0x03123456),
            (0x1234_5600, 0x04123456),
            (-0x1234_5600, 0x04923456),
            (0x9234_0000, 0x05009234),
        ];
        for &(value, want) in cases {
            assert_eq!(big_to_compact(&BigInt::from(value)), want, "value {:#x}", value);
        }
    }

    #[test]
    fn test_lossy_renormalization() {
        // 0x02123456 decodes to 0x1234 and re-encodes without the dropped byte
        assert_eq!(big_to_compact(&compact_to_big(0x02123456)), 0x02123400);
        // Sign collision pushes the mantissa down a byte
        assert_eq!(big_to_compact(&BigInt::from(0x0080_0000)), 0x04008000);
    }

    #[test]
    fn test_network_limits_roundtrip() {
        let max = compact_to_big(0x1d00ffff);
        assert_eq!(max, BigInt::from(0xffff) << (8 * (0x1d - 3)));
        assert_eq!(
            max,
            hex_big("00000000ffff0000000000000000000000000000000000000000000000000000")
        );
        for bits in [0x1d00ffffu32, 0x1e00ffff, 0x207fffff, 0x1b0404cb, 0x20123456] {
            assert_eq!(big_to_compact(&compact_to_big(bits)), bits, "bits 0x{:08x}", bits);
        }
    }

    #[test]
    fn test_encode_truncates_low_bytes() {
        let full = hex_big("123456789abcdef");
        let compact = big_to_compact(&full);
        assert_eq!(compact, 0x08012345);
        assert_eq!(compact_to_big(compact), hex_big("123450000000000"));
    }

    #[test]
    fn test_widest_encodable_magnitude() {
        // 254 bytes with the top bit set renormalises to exponent 255
        let widest = hex_big(&"ff".repeat(254));
        assert_eq!(big_to_compact(&widest), 0xff00ffff);
        let narrower = hex_big(&"7f".repeat(255));
        assert_eq!(big_to_compact(&narrower) >> 24, 255);
    }

    #[test]
    fn test_calc_work() {
        assert_eq!(calc_work(0x01fedcba), BigInt::zero());
        assert_eq!(calc_work(0), BigInt::zero());
        // Highest simnet target gives the least work
        assert_eq!(calc_work(0x207fffff), BigInt::from(2));
        assert!(calc_work(0x1d00ffff) > calc_work(0x1e00ffff));
    }
}
