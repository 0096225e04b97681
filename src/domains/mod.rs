// Domain rules - pure functions shared by the services

pub mod age;
pub mod aggregation;
pub mod lifecycle;
pub mod slug;

pub use aggregation::{aggregate_ratings, vote_transition, RatingSample, VideoAggregates, VoteAction, VoteTransition, VoteValue};
pub use lifecycle::{AccountState, LifecycleEvent, REQUIRED_FEEDBACK_REVIEWS};
