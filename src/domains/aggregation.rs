// Denormalized aggregates - video rating averages and post vote tallies

use serde::Serialize;
use sqlx::FromRow;

use crate::error::AppError;

/// The rating-relevant columns of one review row.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct RatingSample {
    pub rating: i64,
    pub overall_rating: Option<i64>,
    pub stimulation_rating: Option<i64>,
}

impl RatingSample {
    /// Structured feedback wins over the casual rating.
    pub fn effective_rating(&self) -> i64 {
        self.overall_rating.unwrap_or(self.rating)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAggregates {
    pub parent_rating: f64,
    pub review_count: i64,
    /// `None` until some review rates stimulation; distinct from a 0 average
    pub stimulation_level: Option<f64>,
}

pub fn aggregate_ratings(samples: &[RatingSample]) -> VideoAggregates {
    let review_count = samples.len() as i64;
    let parent_rating = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s.effective_rating() as f64).sum::<f64>() / samples.len() as f64
    };

    let stimulation: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.stimulation_rating)
        .map(|r| r as f64)
        .collect();
    let stimulation_level = if stimulation.is_empty() {
        None
    } else {
        Some(stimulation.iter().sum::<f64>() / stimulation.len() as f64)
    };

    VideoAggregates {
        parent_rating,
        review_count,
        stimulation_level,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            _ => Err(AppError::Validation("Invalid vote value".to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Insert,
    Flip,
    Remove,
}

/// Column deltas to apply to a post for one vote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTransition {
    pub action: VoteAction,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    /// The viewer's vote after the transition, 0 when removed
    pub user_vote: i64,
}

/// Toggle semantics: same value again removes the vote, the opposite value
/// flips it.
pub fn vote_transition(existing: Option<VoteValue>, value: VoteValue) -> VoteTransition {
    use VoteValue::*;

    match (existing, value) {
        (None, Up) => VoteTransition {
            action: VoteAction::Insert,
            upvotes: 1,
            downvotes: 0,
            score: 1,
            user_vote: 1,
        },
        (None, Down) => VoteTransition {
            action: VoteAction::Insert,
            upvotes: 0,
            downvotes: 1,
            score: -1,
            user_vote: -1,
        },
        (Some(Up), Up) => VoteTransition {
            action: VoteAction::Remove,
            upvotes: -1,
            downvotes: 0,
            score: -1,
            user_vote: 0,
        },
        (Some(Down), Down) => VoteTransition {
            action: VoteAction::Remove,
            upvotes: 0,
            downvotes: -1,
            score: 1,
            user_vote: 0,
        },
        (Some(Down), Up) => VoteTransition {
            action: VoteAction::Flip,
            upvotes: 1,
            downvotes: -1,
            score: 2,
            user_vote: 1,
        },
        (Some(Up), Down) => VoteTransition {
            action: VoteAction::Flip,
            upvotes: -1,
            downvotes: 1,
            score: -2,
            user_vote: -1,
        },
    }
}
