#![deny(unsafe_code)]

use std::fmt;

use crate::error::{PhenoError, Result};

/// Ordering scale of a session marker.
///
/// Two session times are comparable only on the same scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionScale {
    /// Calendar date or date-time, measured in days.
    Date,
    /// Ordinal visit number (`V03`).
    Visit,
    /// Days since study entry (`d0180`).
    DaysSinceEntry,
    /// Fractional age in years.
    AgeYears,
}

impl SessionScale {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Visit => "visit",
            Self::DaysSinceEntry => "days_since_entry",
            Self::AgeYears => "age_years",
        }
    }
}

impl fmt::Display for SessionScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A session marker on a known scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionTime {
    pub scale: SessionScale,
    pub value: f64,
}

impl SessionTime {
    pub fn new(scale: SessionScale, value: f64) -> Self {
        Self { scale, value }
    }

    /// Times on different scales cannot be ordered against each other.
    pub fn ensure_same_scale(&self, other: &SessionTime) -> Result<()> {
        if self.scale == other.scale {
            Ok(())
        } else {
            Err(PhenoError::ScaleMismatch {
                left: self.scale,
                right: other.scale,
            })
        }
    }
}
