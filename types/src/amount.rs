//! Stake amounts in lamports.
//!
//! Amounts are stored as integer lamports (the minor unit) to avoid
//! floating-point errors. SOL decimals only appear at the wire boundary.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Number of lamports in one SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// A stake amount in lamports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Convert a decimal SOL amount (as received in job payloads) to lamports.
    ///
    /// Rejects non-finite, negative, and overflowing values.
    pub fn from_sol(sol: f64) -> Result<Self, TypeError> {
        if !sol.is_finite() || sol < 0.0 {
            return Err(TypeError::InvalidAmount(format!("{sol} SOL")));
        }
        let raw = sol * LAMPORTS_PER_SOL as f64;
        if raw > u64::MAX as f64 {
            return Err(TypeError::InvalidAmount(format!("{sol} SOL overflows")));
        }
        Ok(Self(raw.round() as u64))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn as_sol(&self) -> f64 {
        self.0 as f64 / LAMPORTS_PER_SOL as f64
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Add for Lamports {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lamports", self.0)
    }
}
