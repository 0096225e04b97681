// Row models - one struct per table, plus the joined shapes the API returns

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub mod tag_list;

pub use tag_list::TagList;

pub type UserId = i64;
pub type VideoId = i64;
pub type GroupId = i64;
pub type PostId = i64;

/// Account row. Never serialized directly: it carries the password hash and
/// reset token.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub onboarding_complete: bool,
    pub child_name: Option<String>,
    pub child_age: Option<i64>,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_google_only(&self) -> bool {
        self.password_hash.is_none()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: i64,
    pub user_id: UserId,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// A child with its age derived at read time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildWithAge {
    #[serde(flatten)]
    pub child: Child,
    pub age: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub id: i64,
    pub user_id: UserId,
    #[sqlx(try_from = "String")]
    pub concerns: TagList,
    #[sqlx(try_from = "String")]
    pub situations: TagList,
    #[sqlx(try_from = "String")]
    pub content_prefs: TagList,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub age_min: i64,
    pub age_max: i64,
    pub icon: String,
    pub member_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn contains_age(&self, age: i64) -> bool {
        self.age_min <= age && age <= self.age_max
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: i64,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    pub youtube_id: String,
    pub title: String,
    pub channel_name: String,
    pub description: String,
    pub age_min: i64,
    pub age_max: i64,
    pub category: String,
    #[sqlx(try_from = "String")]
    pub tags: TagList,
    pub parent_rating: f64,
    pub review_count: i64,
    pub stimulation_level: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: VideoId,
    pub title: String,
    pub youtube_id: String,
    pub channel_name: String,
    pub age_min: i64,
    pub age_max: i64,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    pub user_id: UserId,
    pub video_id: VideoId,
    pub rating: i64,
    pub comment: String,
    #[sqlx(try_from = "String")]
    pub helpful_tags: TagList,
    #[sqlx(try_from = "String")]
    pub content_tags: TagList,
    pub educational_rating: Option<i64>,
    pub age_appropriate_rating: Option<i64>,
    pub engagement_rating: Option<i64>,
    pub stimulation_rating: Option<i64>,
    pub overall_rating: Option<i64>,
    pub feedback_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewWithAuthor {
    #[serde(flatten)]
    pub review: Review,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedReview {
    #[serde(flatten)]
    pub review: Review,
    pub user: UserSummary,
    pub video: VideoSummary,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub group_id: GroupId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub link: Option<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub score: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: i64,
    pub user_id: UserId,
    pub post_id: PostId,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    pub id: i64,
    pub user_id: UserId,
    pub video_id: VideoId,
    pub watched_at: DateTime<Utc>,
    pub completed: bool,
}
