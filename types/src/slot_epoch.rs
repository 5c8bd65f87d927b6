//! `Slot` and `Epoch` newtypes, kept distinct so the two units of time can never be
//! mixed up by the type checker.

use safe_arith::{ArithError, SafeArith};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// Marks a field as "not yet set" across the state machine (activation/exit/withdrawable epoch).
pub const FAR_FUTURE_EPOCH: Epoch = Epoch(u64::MAX);

macro_rules! new_time_unit {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(n: u64) -> Self {
                Self(n)
            }

            pub const fn as_u64(&self) -> u64 {
                self.0
            }

            pub fn as_usize(&self) -> usize {
                self.0 as usize
            }

            pub fn safe_add(&self, other: u64) -> Result<Self, ArithError> {
                Ok(Self(self.0.safe_add(other)?))
            }

            pub fn safe_sub(&self, other: u64) -> Result<Self, ArithError> {
                Ok(Self(self.0.safe_sub(other)?))
            }

            pub fn safe_add_assign(&mut self, other: u64) -> Result<(), ArithError> {
                self.0.safe_add_assign(other)
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self(n)
            }
        }

        impl From<$name> for u64 {
            fn from(n: $name) -> Self {
                n.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl Add<u64> for $name {
            type Output = Self;
            fn add(self, rhs: u64) -> Self {
                Self(self.0 + rhs)
            }
        }

        impl AddAssign<u64> for $name {
            fn add_assign(&mut self, rhs: u64) {
                self.0 += rhs;
            }
        }

        impl Sub<u64> for $name {
            type Output = Self;
            fn sub(self, rhs: u64) -> Self {
                Self(self.0 - rhs)
            }
        }

        impl SubAssign<u64> for $name {
            fn sub_assign(&mut self, rhs: u64) {
                self.0 -= rhs;
            }
        }
    };
}

new_time_unit!(Slot);
new_time_unit!(Epoch);

impl Slot {
    /// Computes `self / slots_per_epoch`, the epoch containing this slot.
    pub fn epoch(&self, slots_per_epoch: u64) -> Epoch {
        Epoch::new(self.0.checked_div(slots_per_epoch).unwrap_or(0))
    }

    pub fn checked_rem(&self, rhs: u64) -> Option<u64> {
        self.0.checked_rem(rhs)
    }
}

impl Epoch {
    /// The first slot of this epoch.
    pub fn start_slot(&self, slots_per_epoch: u64) -> Slot {
        Slot::new(self.0.saturating_mul(slots_per_epoch))
    }

    pub fn is_far_future(&self) -> bool {
        *self == FAR_FUTURE_EPOCH
    }
}
