#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Database row types for the address repair job.
//!
//! These types mirror the shapes read from the telemetry schema: a
//! candidate is a `drives` or `charging_processes` row whose address
//! reference is still null.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Which end of a drive an address reference belongs to.
#[derive(AsRefStr, Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum DriveSide {
    Start,
    End,
}

impl DriveSide {
    /// The `drives` column holding the address reference for this side.
    #[must_use]
    pub const fn address_column(self) -> &'static str {
        match self {
            Self::Start => "start_address_id",
            Self::End => "end_address_id",
        }
    }
}

/// A drive still missing at least one address reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCandidate {
    /// Primary key.
    pub id: i64,
    pub start_address_id: Option<i64>,
    pub start_position_id: Option<i64>,
    pub end_address_id: Option<i64>,
    pub end_position_id: Option<i64>,
}

impl DriveCandidate {
    /// Whether the given side still needs an address.
    #[must_use]
    pub const fn needs_fix(&self, side: DriveSide) -> bool {
        match side {
            DriveSide::Start => self.start_address_id.is_none(),
            DriveSide::End => self.end_address_id.is_none(),
        }
    }

    /// Position to resolve for the given side.
    #[must_use]
    pub const fn position_id(&self, side: DriveSide) -> Option<i64> {
        match side {
            DriveSide::Start => self.start_position_id,
            DriveSide::End => self.end_position_id,
        }
    }

    /// Number of address references this drive still needs.
    #[must_use]
    pub fn missing_references(&self) -> u64 {
        u64::from(self.start_address_id.is_none()) + u64::from(self.end_address_id.is_none())
    }
}

/// A charging process still missing its address reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeCandidate {
    /// Primary key.
    pub id: i64,
    pub position_id: Option<i64>,
}

/// Counts of rows awaiting address resolution, per reference kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCounts {
    /// Drives with a null `start_address_id`.
    pub drive_starts: u64,
    /// Drives with a null `end_address_id`.
    pub drive_ends: u64,
    /// Charging processes with a null `address_id`.
    pub charges: u64,
}

impl CandidateCounts {
    /// Total number of references a fix pass would attempt.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.drive_starts + self.drive_ends + self.charges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(start: Option<i64>, end: Option<i64>) -> DriveCandidate {
        DriveCandidate {
            id: 1,
            start_address_id: start,
            start_position_id: Some(10),
            end_address_id: end,
            end_position_id: Some(20),
        }
    }

    #[test]
    fn maps_sides_to_columns() {
        assert_eq!(DriveSide::Start.address_column(), "start_address_id");
        assert_eq!(DriveSide::End.address_column(), "end_address_id");
    }

    #[test]
    fn reports_missing_references() {
        assert_eq!(drive(None, None).missing_references(), 2);
        assert_eq!(drive(Some(5), None).missing_references(), 1);
        assert_eq!(drive(Some(5), Some(6)).missing_references(), 0);
    }

    #[test]
    fn selects_position_per_side() {
        let d = drive(None, Some(6));
        assert!(d.needs_fix(DriveSide::Start));
        assert!(!d.needs_fix(DriveSide::End));
        assert_eq!(d.position_id(DriveSide::Start), Some(10));
        assert_eq!(d.position_id(DriveSide::End), Some(20));
    }
}
