//! Survey lifecycle status.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// Computed lifecycle status of a survey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    /// Voting has not opened yet.
    Upcoming,
    /// Voting window is open.
    Active,
    /// Voting has closed (by schedule or by finalization).
    Past,
}

impl SurveyStatus {
    /// Pure status computation from the schedule and finalization state.
    ///
    /// Finalization always wins: a survey finalized early is `Past` even
    /// while its scheduled window is still open.
    pub fn compute(
        start: Timestamp,
        end: Timestamp,
        finalized_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Self {
        if finalized_at.is_some() {
            return Self::Past;
        }
        if now >= end {
            Self::Past
        } else if now < start {
            Self::Upcoming
        } else {
            Self::Active
        }
    }
}
