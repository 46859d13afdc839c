//! Ledger time and validity windows.

use std::{fmt, ops::Add, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    errors::DecodeError,
    plutus::{FromPlutusData, PlutusData, ToPlutusData},
};

/// Milliseconds since the unix epoch, as seen by the ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PosixTime(pub u64);

impl PosixTime {
    /// Creates a time from milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the time in milliseconds.
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Moves the time forward, saturating.
    pub fn saturating_add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(duration)))
    }

    /// Moves the time backward, saturating at zero.
    pub fn saturating_sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(duration)))
    }

    /// Time remaining until `later`, zero if it already passed.
    pub fn until(self, later: PosixTime) -> Duration {
        Duration::from_millis(later.0.saturating_sub(self.0))
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Add<Duration> for PosixTime {
    type Output = PosixTime;

    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl fmt::Display for PosixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl ToPlutusData for PosixTime {
    fn to_plutus_data(&self) -> PlutusData {
        PlutusData::uint(self.0)
    }
}

impl FromPlutusData for PosixTime {
    fn from_plutus_data(data: &PlutusData) -> Result<Self, DecodeError> {
        data.as_u64().map(PosixTime)
    }
}

/// The closed interval in which a transaction may be included in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValidityWindow {
    /// First instant at which the transaction is valid.
    pub lower: PosixTime,
    /// Last instant at which the transaction is valid.
    pub upper: PosixTime,
}

impl ValidityWindow {
    /// The symmetric window `[now - tolerance, now + tolerance]`.
    pub fn around(now: PosixTime, tolerance: Duration) -> Self {
        Self {
            lower: now.saturating_sub(tolerance),
            upper: now.saturating_add(tolerance),
        }
    }

    /// Whether `time` falls inside the window.
    pub fn contains(&self, time: PosixTime) -> bool {
        self.lower <= time && time <= self.upper
    }

    /// Whether the entire window lies strictly before `boundary`.
    pub fn entirely_before(&self, boundary: PosixTime) -> bool {
        self.upper < boundary
    }

    /// Whether the entire window lies at or after `boundary`.
    pub fn entirely_after(&self, boundary: PosixTime) -> bool {
        self.lower >= boundary
    }

    /// Whether the window contains `boundary` in its interior, so that the operation cannot be
    /// attributed to either side.
    pub fn straddles(&self, boundary: PosixTime) -> bool {
        !self.entirely_before(boundary) && !self.entirely_after(boundary)
    }
}
