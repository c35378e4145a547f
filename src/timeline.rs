//! Year bookkeeping shared by every stage of the model
//!
//! All matrices are indexed from `history_start`. The policy window is the
//! span reported to callers; the pivot year is where the capital stock is
//! anchored to the external baseline.

use crate::error::{ModelError, Result};

/// Fixed year layout for a model run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    /// First year of investment history
    pub history_start: i32,

    /// Last year with observed investment
    pub last_history_year: i32,

    /// Year the capital stock is anchored to the baseline
    pub pivot_year: i32,

    /// First year of the policy-modeling window
    pub start_year: i32,

    /// Last year of the policy-modeling window
    pub end_year: i32,

    /// Last year of the full investment/deduction timeline
    pub horizon_end: i32,

    /// First year of the calibration window
    pub calibration_start: i32,

    /// Last year of the calibration window
    pub calibration_end: i32,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            history_start: 1960,
            last_history_year: 2016,
            pivot_year: 2017,
            start_year: 2014,
            end_year: 2027,
            horizon_end: 2034,
            calibration_start: 2000,
            calibration_end: 2013,
        }
    }
}

impl Timeline {
    /// Number of years on the full timeline (75 by default)
    pub fn len(&self) -> usize {
        (self.horizon_end - self.history_start + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of historical years (57 by default)
    pub fn history_len(&self) -> usize {
        (self.last_history_year - self.history_start + 1).max(0) as usize
    }

    /// Number of years in the policy window (14 by default)
    pub fn window_len(&self) -> usize {
        (self.end_year - self.start_year + 1).max(0) as usize
    }

    /// Years between the window start and the pivot, filled backward
    pub fn backfill_years(&self) -> usize {
        (self.pivot_year - self.start_year).max(0) as usize
    }

    /// Timeline index of a calendar year
    pub fn index_of(&self, year: i32) -> Option<usize> {
        if year < self.history_start || year > self.horizon_end {
            None
        } else {
            Some((year - self.history_start) as usize)
        }
    }

    /// Calendar year at a timeline index
    pub fn year_at(&self, index: usize) -> i32 {
        self.history_start + index as i32
    }

    /// Calendar years of the policy window
    pub fn window_years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    /// Calendar years of the calibration window
    pub fn calibration_years(&self) -> impl Iterator<Item = i32> {
        self.calibration_start..=self.calibration_end
    }

    /// Reject layouts the projection cannot run on
    pub fn validate(&self) -> Result<()> {
        if self.history_start > self.last_history_year {
            return Err(ModelError::config("history must contain at least one year"));
        }
        if self.pivot_year != self.last_history_year + 1 {
            return Err(ModelError::config(format!(
                "pivot year {} must follow the last historical year {}",
                self.pivot_year, self.last_history_year
            )));
        }
        if self.start_year > self.pivot_year || self.pivot_year > self.end_year {
            return Err(ModelError::config(format!(
                "pivot year {} outside policy window {}-{}",
                self.pivot_year, self.start_year, self.end_year
            )));
        }
        if self.start_year < self.history_start {
            return Err(ModelError::config("policy window starts before history"));
        }
        // Forward roll reads investment in end_year and the deflator one year later
        if self.end_year >= self.horizon_end {
            return Err(ModelError::config(format!(
                "policy window end {} must precede horizon end {}",
                self.end_year, self.horizon_end
            )));
        }
        if self.calibration_start > self.calibration_end
            || self.calibration_start < self.history_start
            || self.calibration_end > self.last_history_year
        {
            return Err(ModelError::config(format!(
                "calibration window {}-{} must lie within history {}-{}",
                self.calibration_start,
                self.calibration_end,
                self.history_start,
                self.last_history_year
            )));
        }
        Ok(())
    }
}
