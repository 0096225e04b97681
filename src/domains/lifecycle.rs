// Account lifecycle - where a user is allowed to go next

use serde::Serialize;

/// Structured reviews needed before the review gate opens.
pub const REQUIRED_FEEDBACK_REVIEWS: i64 = 3;

/// Account completion state, from the viewer's point of view.
///
/// `Anonymous -> OnboardingIncomplete -> InsufficientReviews -> Active`.
/// Only structured (feedback-completed) reviews count toward the gate, and
/// there is no path back from `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountState {
    Anonymous,
    OnboardingIncomplete,
    InsufficientReviews,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Password signup or first federated sign-in
    Registered,
    OnboardingSubmitted,
    /// A structured review was stored; `total` is the user's new count
    FeedbackCompleted { total: i64 },
}

impl AccountState {
    /// Derive the state of an authenticated user from a point-in-time snapshot.
    pub fn derive(onboarding_complete: bool, feedback_reviews: i64) -> Self {
        if !onboarding_complete {
            AccountState::OnboardingIncomplete
        } else if feedback_reviews < REQUIRED_FEEDBACK_REVIEWS {
            AccountState::InsufficientReviews
        } else {
            AccountState::Active
        }
    }

    pub fn apply(self, event: LifecycleEvent) -> Self {
        match (self, event) {
            (AccountState::Active, _) => AccountState::Active,
            (AccountState::Anonymous, LifecycleEvent::Registered) => {
                AccountState::OnboardingIncomplete
            }
            (AccountState::OnboardingIncomplete, LifecycleEvent::OnboardingSubmitted) => {
                AccountState::InsufficientReviews
            }
            (AccountState::InsufficientReviews, LifecycleEvent::FeedbackCompleted { total })
                if total >= REQUIRED_FEEDBACK_REVIEWS =>
            {
                AccountState::Active
            }
            (state, _) => state,
        }
    }

    /// Page the user lands on after login or when visiting the root.
    pub fn landing_path(self) -> &'static str {
        match self {
            AccountState::Anonymous => "/login",
            AccountState::OnboardingIncomplete => "/onboarding",
            AccountState::InsufficientReviews => "/review-gate",
            AccountState::Active => "/discover",
        }
    }

    pub fn needs_reviews(self) -> bool {
        matches!(
            self,
            AccountState::OnboardingIncomplete | AccountState::InsufficientReviews
        )
    }
}
