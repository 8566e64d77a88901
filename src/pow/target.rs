//! 256-bit difficulty targets and their compact (nBits) encoding.
//!
//! All arithmetic wraps modulo 2^256. Consensus nodes that computed a target
//! with a fixed-width 256-bit integer must get the same bits back from us,
//! including in the rare cases where an intermediate product overflows.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Width of a target in bits.
pub const TARGET_BITS: u64 = 256;

/// Sign bit of the compact mantissa.
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;

/// Mantissa bits of the compact form (sign excluded).
const COMPACT_MANTISSA_MASK: u32 = 0x007f_ffff;

fn wrap(value: BigUint) -> BigUint {
    if value.bits() > TARGET_BITS {
        let mask = (BigUint::one() << TARGET_BITS) - BigUint::one();
        value & mask
    } else {
        value
    }
}

/// Unsigned 256-bit target. Lower means harder.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(BigUint);

/// Result of decoding a compact target, with the flags block validation needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompactDecode {
    pub target: Target,
    /// The sign bit was set on a non-zero mantissa.
    pub negative: bool,
    /// The exponent pushes the mantissa past 256 bits.
    pub overflow: bool,
}

impl Target {
    pub fn zero() -> Self { Target(BigUint::zero()) }

    pub fn from_u64(value: u64) -> Self { Target(BigUint::from(value)) }

    /// 2^256 - 1.
    pub fn max_value() -> Self { Self::with_leading_zero_bits(0) }

    /// The largest target whose top `zeros` bits are clear, e.g. 20 gives
    /// `00000fff…ff`.
    pub fn with_leading_zero_bits(zeros: u32) -> Self {
        let width = TARGET_BITS.saturating_sub(zeros as u64);
        Target((BigUint::one() << width) - BigUint::one())
    }

    /// Interpret a 32-byte hash the way consensus code compares hashes:
    /// little-endian, least significant byte first.
    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        Target(BigUint::from_bytes_le(bytes))
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        let bytes = self.0.to_bytes_le();
        out[..bytes.len()].copy_from_slice(&bytes);
        out
    }

    /// Parse a big-endian hex string (optionally `0x`-prefixed, at most 64 digits).
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let digits = hex_str.trim_start_matches("0x");
        if digits.is_empty() || digits.len() > 64 {
            return None;
        }
        BigUint::parse_bytes(digits.as_bytes(), 16).map(Target)
    }

    pub fn is_zero(&self) -> bool { self.0.is_zero() }

    /// Position of the highest set bit plus one (0 for zero).
    pub fn bits(&self) -> u64 { self.0.bits() }

    fn low_u64(&self) -> u64 { self.0.iter_u64_digits().next().unwrap_or(0) }

    // ─── Compact encoding ───────────────────────────────────────────

    /// Decode compact bits, ignoring the sign and overflow flags.
    pub fn from_compact(bits: u32) -> Self {
        Self::decode_compact(bits).target
    }

    pub fn decode_compact(bits: u32) -> CompactDecode {
        let size = bits >> 24;
        let mut word = bits & COMPACT_MANTISSA_MASK;
        let target = if size <= 3 {
            word >>= 8 * (3 - size);
            BigUint::from(word)
        } else {
            wrap(BigUint::from(word) << (8 * (size - 3)) as usize)
        };
        // flags look at the mantissa left after the small-size shift
        let negative = word != 0 && bits & COMPACT_SIGN_BIT != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));
        CompactDecode { target: Target(target), negative, overflow }
    }

    /// Encode to compact bits. The mantissa is normalized so the sign bit is
    /// never set; precision below the top three bytes is dropped.
    pub fn to_compact(&self) -> u32 {
        let mut size = ((self.bits() + 7) / 8) as u32;
        let mut compact = if size <= 3 {
            (self.low_u64() << (8 * (3 - size))) as u32
        } else {
            self.shr(8 * (size - 3)).low_u64() as u32
        };
        if compact & COMPACT_SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    // ─── Wrapping arithmetic ────────────────────────────────────────

    pub fn wrapping_mul(&self, rhs: u64) -> Self {
        Target(wrap(&self.0 * rhs))
    }

    pub fn wrapping_add(&self, rhs: &Target) -> Self {
        Target(wrap(&self.0 + &rhs.0))
    }

    /// Integer division. Panics on a zero divisor; callers only divide by
    /// efficiencies, forces and block counts, which are at least 1.
    pub fn div(&self, rhs: u64) -> Self {
        assert!(rhs != 0, "target division by zero");
        Target(&self.0 / rhs)
    }

    pub fn wrapping_shl(&self, shift: u32) -> Self {
        if shift as u64 >= TARGET_BITS {
            return Self::zero();
        }
        Target(wrap(&self.0 << shift as usize))
    }

    pub fn shr(&self, shift: u32) -> Self {
        if shift as u64 >= TARGET_BITS {
            return Self::zero();
        }
        Target(&self.0 >> shift as usize)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_bitcoin_genesis_bits() {
        let target = Target::from_compact(0x1d00ffff);
        assert_eq!(
            target.to_string(),
            "00000000ffff0000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(target.to_compact(), 0x1d00ffff);
    }

    #[test]
    fn test_small_exponents() {
        assert_eq!(Target::from_compact(0x01120000), Target::from_u64(0x12));
        assert_eq!(Target::from_compact(0x02123400), Target::from_u64(0x1234));
        assert_eq!(Target::from_compact(0x03123456), Target::from_u64(0x123456));
        assert_eq!(Target::from_u64(0x12).to_compact(), 0x01120000);
        assert_eq!(Target::from_u64(0x1234).to_compact(), 0x02123400);
    }

    #[test]
    fn test_normalizes_sign_bit() {
        assert_eq!(Target::from_u64(0x80).to_compact(), 0x02008000);
        assert_eq!(Target::from_u64(0x800000).to_compact(), 0x04008000);
    }

    #[test]
    fn test_zero() {
        assert_eq!(Target::zero().to_compact(), 0);
        assert!(Target::from_compact(0).is_zero());
        assert!(Target::from_compact(0x05000000).is_zero());
    }

    #[test]
    fn test_negative_flag() {
        let decoded = Target::decode_compact(0x04923456);
        assert!(decoded.negative);
        assert!(!decoded.overflow);
        // Sign bit on a zero mantissa is not negative
        assert!(!Target::decode_compact(0x01800000).negative);
        // nor is one whose low bytes are shifted out
        let decoded = Target::decode_compact(0x01800001);
        assert!(!decoded.negative);
        assert!(decoded.target.is_zero());
        assert!(Target::decode_compact(0x01fedcba).negative);
        assert!(!Target::decode_compact(0x02800080).negative);
    }

    #[test]
    fn test_overflow_flag() {
        assert!(Target::decode_compact(0xff123456).overflow);
        assert!(Target::decode_compact(0x23000100).overflow);
        assert!(!Target::decode_compact(0x20123456).overflow);
        assert!(!Target::decode_compact(0x21000001).overflow);
    }

    #[test]
    fn test_leading_zero_limits() {
        let main_limit = Target::with_leading_zero_bits(20);
        assert_eq!(
            main_limit.to_string(),
            "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
        assert_eq!(main_limit.to_compact(), 0x1e0fffff);
        assert_eq!(Target::with_leading_zero_bits(1).to_compact(), 0x207fffff);
        assert_eq!(Target::max_value().bits(), 256);
    }

    #[test]
    fn test_wrapping_mul_drops_high_bits() {
        let big = Target::with_leading_zero_bits(1); // 2^255 - 1
        // (2^255 - 1) * 2 = 2^256 - 2, still fits
        assert_eq!(big.wrapping_mul(2), Target::max_value().wrapping_add(&Target::max_value()));
        // (2^255 - 1) * 4 = 2^257 - 4 ≡ 2^256 - 4
        let expected = Target::max_value().div(4).wrapping_mul(4);
        assert_eq!(big.wrapping_mul(4), expected);
    }

    #[test]
    fn test_shifts_saturate_to_zero() {
        let one = Target::from_u64(1);
        assert_eq!(one.wrapping_shl(255).bits(), 256);
        assert!(one.wrapping_shl(256).is_zero());
        assert!(Target::max_value().shr(300).is_zero());
    }

    #[test]
    fn test_le_bytes() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        bytes[31] = 0x80;
        let t = Target::from_le_bytes(&bytes);
        assert_eq!(t.bits(), 256);
        assert_eq!(t.to_le_bytes(), bytes);
    }

    #[test]
    fn test_from_hex() {
        let t = Target::from_hex("0x00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff").unwrap();
        assert_eq!(t, Target::with_leading_zero_bits(20));
        assert!(Target::from_hex("zz").is_none());
        assert!(Target::from_hex("").is_none());
    }
}
