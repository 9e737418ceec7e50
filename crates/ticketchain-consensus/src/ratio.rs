//! Exact non-negative rationals for the subsidy and supply closed forms.

use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Ratio {
    num: BigInt,
    den: BigInt,
}

impl Ratio {
    /// `den` must be positive.
    pub(crate) fn new(num: BigInt, den: BigInt) -> Self {
        Self { num, den }
    }

    pub(crate) fn zero() -> Self {
        Self::new(BigInt::zero(), BigInt::one())
    }

    pub(crate) fn from_int(n: i64) -> Self {
        Self::new(BigInt::from(n), BigInt::one())
    }

    pub(crate) fn add(&self, other: &Ratio) -> Ratio {
        if self.den == other.den {
            return Ratio::new(&self.num + &other.num, self.den.clone());
        }
        Ratio::new(
            &self.num * &other.den + &other.num * &self.den,
            &self.den * &other.den,
        )
    }

    pub(crate) fn mul_int(&self, n: i64) -> Ratio {
        Ratio::new(&self.num * n, self.den.clone())
    }

    pub(crate) fn scaled_by(&self, other: &Ratio) -> Ratio {
        Ratio::new(&self.num * &other.num, &self.den * &other.den)
    }

    /// Largest integer not above the value, saturating at the i64 range.
    pub(crate) fn floor_i64(&self) -> i64 {
        let q = &self.num / &self.den;
        let r = &self.num % &self.den;
        let q = if r < BigInt::zero() { q - 1 } else { q };
        q.to_i64().unwrap_or(if q > BigInt::zero() { i64::MAX } else { i64::MIN })
    }
}
