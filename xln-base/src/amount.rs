use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// An arbitrary-precision signed monetary quantity. Every value requiring
/// bigint discipline — `amount`, `collateral`, `ondelta`, `offdelta`,
/// credit limits, and the conservation sums — is an `Amount`, never a
/// fixed-width integer.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(pub BigInt);

impl Amount {
    pub fn zero() -> Self {
        Amount(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Non-negative region extents (collateral, credit limits, capacities)
    /// are clamped at zero rather than allowed to go negative; callers in
    /// `xln-delta` rely on this to keep the seven regions well-formed.
    pub fn max_with_zero(self) -> Self {
        if self.is_negative() {
            Amount::zero()
        } else {
            self
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self.0 >= other.0 {
            self
        } else {
            other
        }
    }
}

impl From<i64> for Amount {
    fn from(v: i64) -> Self {
        Amount(BigInt::from(v))
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Amount(BigInt::from(v))
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, rhs: Self) -> Self {
        Amount(self.0 + rhs.0)
    }
}

impl Add for &Amount {
    type Output = Amount;
    fn add(self, rhs: Self) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, rhs: Self) -> Self {
        Amount(self.0 - rhs.0)
    }
}

impl Sub for &Amount {
    type Output = Amount;
    fn sub(self, rhs: Self) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Self {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |a, b| a + b)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
