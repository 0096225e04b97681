// ReviewService - structured feedback, casual reviews and the review gate
//
// Every write recomputes the video's aggregates inside the same transaction.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use crate::{
    database::Database,
    domains::{
        age::{age_on, today},
        aggregate_ratings, AccountState, LifecycleEvent, RatingSample, VideoAggregates,
    },
    error::{AppError, AppResult},
    models::{Child, FeedReview, Review, ReviewWithAuthor, TagList, UserId, UserSummary, Video, VideoId, VideoSummary},
    services::{
        user_service::{feedback_review_count, require_user},
        video_service::{find_video, AuthoredReviewRow},
    },
};

/// Videos offered on the review gate at once.
pub const REVIEW_QUEUE_SIZE: usize = 8;

fn valid_rating(rating: Option<i64>) -> bool {
    matches!(rating, Some(1..=5))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub educational_rating: Option<i64>,
    pub age_appropriate_rating: Option<i64>,
    pub engagement_rating: Option<i64>,
    pub stimulation_rating: Option<i64>,
    pub overall_rating: Option<i64>,
    #[serde(default)]
    pub content_tags: TagList,
}

impl FeedbackRequest {
    pub fn validate(&self) -> AppResult<()> {
        let ratings = [
            self.educational_rating,
            self.age_appropriate_rating,
            self.engagement_rating,
            self.stimulation_rating,
            self.overall_rating,
        ];
        if ratings.into_iter().all(valid_rating) {
            Ok(())
        } else {
            Err(AppError::Validation("All ratings must be between 1 and 5".to_string()))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub helpful_tags: TagList,
}

impl ReviewRequest {
    pub fn validate(&self) -> AppResult<i64> {
        match self.rating {
            Some(rating @ 1..=5) => Ok(rating),
            _ => Err(AppError::Validation("Rating must be between 1 and 5".to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackOutcome {
    pub success: bool,
    pub review_count: i64,
    pub state: AccountState,
    pub video: VideoAggregates,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueue {
    pub review_count: i64,
    pub needs_reviews: bool,
    pub state: AccountState,
    pub unreviewed_videos: Vec<Video>,
}

#[derive(Debug, FromRow)]
struct QueueRow {
    #[sqlx(flatten)]
    video: Video,
    watched: bool,
}

#[derive(Debug, FromRow)]
struct FeedRow {
    #[sqlx(flatten)]
    review: Review,
    author_name: String,
    video_title: String,
    video_youtube_id: String,
    video_channel_name: String,
    video_age_min: i64,
    video_age_max: i64,
    video_category: String,
}

impl From<FeedRow> for FeedReview {
    fn from(row: FeedRow) -> Self {
        FeedReview {
            user: UserSummary {
                id: row.review.user_id,
                name: row.author_name,
            },
            video: VideoSummary {
                id: row.review.video_id,
                title: row.video_title,
                youtube_id: row.video_youtube_id,
                channel_name: row.video_channel_name,
                age_min: row.video_age_min,
                age_max: row.video_age_max,
                category: row.video_category,
            },
            review: row.review,
        }
    }
}

#[derive(Clone)]
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a five-criterion review. It counts toward the review gate and
    /// overrides the casual rating in the video's average.
    pub async fn submit_feedback(
        &self,
        user_id: UserId,
        video_id: VideoId,
        req: FeedbackRequest,
    ) -> AppResult<FeedbackOutcome> {
        req.validate()?;

        let mut tx = self.db.pool.begin().await?;
        let user = require_user(&mut tx, user_id).await?;
        find_video(&mut tx, video_id).await?;

        sqlx::query(
            "INSERT INTO reviews (user_id, video_id, rating, comment, helpful_tags, content_tags,
                educational_rating, age_appropriate_rating, engagement_rating, stimulation_rating,
                overall_rating, feedback_completed, created_at)
             VALUES (?, ?, ?, '', '[]', ?, ?, ?, ?, ?, ?, 1, ?)
             ON CONFLICT(user_id, video_id) DO UPDATE SET
                rating = excluded.rating,
                content_tags = excluded.content_tags,
                educational_rating = excluded.educational_rating,
                age_appropriate_rating = excluded.age_appropriate_rating,
                engagement_rating = excluded.engagement_rating,
                stimulation_rating = excluded.stimulation_rating,
                overall_rating = excluded.overall_rating,
                feedback_completed = 1",
        )
        .bind(user_id)
        .bind(video_id)
        .bind(req.overall_rating)
        .bind(req.content_tags.encode())
        .bind(req.educational_rating)
        .bind(req.age_appropriate_rating)
        .bind(req.engagement_rating)
        .bind(req.stimulation_rating)
        .bind(req.overall_rating)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let aggregates = recompute_video_aggregates(&mut tx, video_id).await?;
        let total = feedback_review_count(&mut tx, user_id).await?;
        tx.commit().await?;

        let state = AccountState::derive(user.onboarding_complete, total - 1)
            .apply(LifecycleEvent::FeedbackCompleted { total });
        info!(user_id, video_id, total, ?state, "Feedback recorded");

        Ok(FeedbackOutcome {
            success: true,
            review_count: total,
            state,
            video: aggregates,
        })
    }

    /// Whether the viewer already left structured feedback on this video.
    pub async fn feedback_status(&self, user_id: Option<UserId>, video_id: VideoId) -> AppResult<bool> {
        let Some(user_id) = user_id else {
            return Ok(false);
        };
        let completed: Option<bool> =
            sqlx::query_scalar("SELECT feedback_completed FROM reviews WHERE user_id = ? AND video_id = ?")
                .bind(user_id)
                .bind(video_id)
                .fetch_optional(&self.db.pool)
                .await?;
        Ok(completed.unwrap_or(false))
    }

    /// Casual rating with an optional comment. Structured ratings on an
    /// existing review are left untouched.
    pub async fn submit_review(
        &self,
        user_id: UserId,
        video_id: VideoId,
        req: ReviewRequest,
    ) -> AppResult<ReviewWithAuthor> {
        let rating = req.validate()?;

        let mut tx = self.db.pool.begin().await?;
        require_user(&mut tx, user_id).await?;
        find_video(&mut tx, video_id).await?;

        sqlx::query(
            "INSERT INTO reviews (user_id, video_id, rating, comment, helpful_tags, content_tags, created_at)
             VALUES (?, ?, ?, ?, ?, '[]', ?)
             ON CONFLICT(user_id, video_id) DO UPDATE SET
                rating = excluded.rating,
                comment = excluded.comment,
                helpful_tags = excluded.helpful_tags",
        )
        .bind(user_id)
        .bind(video_id)
        .bind(rating)
        .bind(req.comment.trim())
        .bind(req.helpful_tags.encode())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let review = sqlx::query_as::<_, AuthoredReviewRow>(
            "SELECT r.*, u.name AS author_name
             FROM reviews r JOIN users u ON u.id = r.user_id
             WHERE r.user_id = ? AND r.video_id = ?",
        )
        .bind(user_id)
        .bind(video_id)
        .fetch_one(&mut *tx)
        .await?;

        recompute_video_aggregates(&mut tx, video_id).await?;
        tx.commit().await?;

        info!(user_id, video_id, rating, "Review recorded");
        Ok(review.into())
    }

    /// Reviews that carry a comment, newest first.
    pub async fn feed(&self) -> AppResult<Vec<FeedReview>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT r.*, u.name AS author_name,
                v.title AS video_title, v.youtube_id AS video_youtube_id,
                v.channel_name AS video_channel_name, v.age_min AS video_age_min,
                v.age_max AS video_age_max, v.category AS video_category
             FROM reviews r
             JOIN users u ON u.id = r.user_id
             JOIN videos v ON v.id = r.video_id
             WHERE r.comment <> ''
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(rows.into_iter().map(FeedReview::from).collect())
    }

    /// Review-gate queue: videos the user has not reviewed that suit one of
    /// their children, already-watched ones first.
    pub async fn pending(&self, user_id: UserId) -> AppResult<ReviewQueue> {
        let mut conn = self.db.pool.acquire().await?;
        let user = require_user(&mut conn, user_id).await?;
        let review_count = feedback_review_count(&mut conn, user_id).await?;

        let children = sqlx::query_as::<_, Child>("SELECT * FROM children WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
        let on = today();
        let mut ages: HashSet<i64> = children.iter().map(|c| age_on(c.date_of_birth, on)).collect();
        if ages.is_empty() {
            ages.extend(user.child_age);
        }

        let rows = sqlx::query_as::<_, QueueRow>(
            "SELECT v.*, (vv.id IS NOT NULL) AS watched
             FROM videos v
             LEFT JOIN video_views vv ON vv.video_id = v.id AND vv.user_id = ?1
             WHERE NOT EXISTS (SELECT 1 FROM reviews r WHERE r.video_id = v.id AND r.user_id = ?1)
             ORDER BY watched DESC, v.parent_rating DESC, v.id ASC",
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;

        let unreviewed_videos = rows
            .into_iter()
            .filter(|row| ages.is_empty() || ages.iter().any(|age| row.video.age_min <= *age && *age <= row.video.age_max))
            .take(REVIEW_QUEUE_SIZE)
            .map(|row| row.video)
            .collect();

        let state = AccountState::derive(user.onboarding_complete, review_count);
        Ok(ReviewQueue {
            review_count,
            needs_reviews: state.needs_reviews(),
            state,
            unreviewed_videos,
        })
    }
}

/// Recompute parent_rating, review_count and stimulation_level from the
/// video's current reviews and store them.
pub async fn recompute_video_aggregates(conn: &mut SqliteConnection, video_id: VideoId) -> AppResult<VideoAggregates> {
    let samples = sqlx::query_as::<_, RatingSample>(
        "SELECT rating, overall_rating, stimulation_rating FROM reviews WHERE video_id = ?",
    )
    .bind(video_id)
    .fetch_all(&mut *conn)
    .await?;

    let aggregates = aggregate_ratings(&samples);
    sqlx::query("UPDATE videos SET parent_rating = ?, review_count = ?, stimulation_level = ? WHERE id = ?")
        .bind(aggregates.parent_rating)
        .bind(aggregates.review_count)
        .bind(aggregates.stimulation_level)
        .bind(video_id)
        .execute(&mut *conn)
        .await?;
    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (Database, UserId, VideoId) {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = sqlx::query("INSERT INTO users (name, email, onboarding_complete, created_at) VALUES ('Rae', 'rae@example.com', 1, ?)")
            .bind(Utc::now())
            .execute(&db.pool)
            .await
            .unwrap()
            .last_insert_rowid();
        let video_id = insert_video(&db, "first", 2, 4).await;
        (db, user_id, video_id)
    }

    async fn insert_video(db: &Database, youtube_id: &str, age_min: i64, age_max: i64) -> VideoId {
        sqlx::query(
            "INSERT INTO videos (youtube_id, title, channel_name, age_min, age_max, category, created_at)
             VALUES (?, 'Title', 'Channel', ?, ?, 'music', ?)",
        )
        .bind(youtube_id)
        .bind(age_min)
        .bind(age_max)
        .bind(Utc::now())
        .execute(&db.pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    fn feedback(ratings: [i64; 5]) -> FeedbackRequest {
        FeedbackRequest {
            educational_rating: Some(ratings[0]),
            age_appropriate_rating: Some(ratings[1]),
            engagement_rating: Some(ratings[2]),
            stimulation_rating: Some(ratings[3]),
            overall_rating: Some(ratings[4]),
            content_tags: ["Educational"].into_iter().collect(),
        }
    }

    #[test]
    fn test_rating_bounds() {
        assert!(feedback([1, 2, 3, 4, 5]).validate().is_ok());
        assert!(feedback([0, 2, 3, 4, 5]).validate().is_err());
        assert!(feedback([1, 2, 3, 4, 6]).validate().is_err());

        let mut missing = feedback([1, 1, 1, 1, 1]);
        missing.engagement_rating = None;
        assert!(missing.validate().is_err());
    }

    #[tokio::test]
    async fn test_feedback_sets_aggregates() {
        let (db, user_id, video_id) = setup().await;
        let reviews = ReviewService::new(db);

        let outcome = reviews
            .submit_feedback(user_id, video_id, feedback([4, 5, 3, 2, 4]))
            .await
            .unwrap();
        assert_eq!(outcome.video.parent_rating, 4.0);
        assert_eq!(outcome.video.review_count, 1);
        assert_eq!(outcome.video.stimulation_level, Some(2.0));
        assert_eq!(outcome.review_count, 1);
        assert_eq!(outcome.state, AccountState::InsufficientReviews);

        assert!(reviews.feedback_status(Some(user_id), video_id).await.unwrap());
        assert!(!reviews.feedback_status(None, video_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_casual_review_keeps_structured_rating() {
        let (db, user_id, video_id) = setup().await;
        let reviews = ReviewService::new(db);

        reviews
            .submit_feedback(user_id, video_id, feedback([4, 5, 3, 2, 4]))
            .await
            .unwrap();
        let review = reviews
            .submit_review(
                user_id,
                video_id,
                ReviewRequest {
                    rating: Some(1),
                    comment: "Loved the songs".to_string(),
                    helpful_tags: TagList::default(),
                },
            )
            .await
            .unwrap();
        assert_eq!(review.review.overall_rating, Some(4));
        assert!(review.review.feedback_completed);
        assert_eq!(review.user.name, "Rae");

        let feed = reviews.feed().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].video.youtube_id, "first");
    }

    #[tokio::test]
    async fn test_casual_reviews_do_not_open_the_gate() {
        let (db, user_id, video_id) = setup().await;
        let second = insert_video(&db, "second", 2, 4).await;
        let third = insert_video(&db, "third", 2, 4).await;
        let reviews = ReviewService::new(db.clone());

        for (video, rating) in [(video_id, 5), (second, 4), (third, 2)] {
            reviews
                .submit_review(
                    user_id,
                    video,
                    ReviewRequest {
                        rating: Some(rating),
                        comment: "Quick thoughts".to_string(),
                        helpful_tags: TagList::default(),
                    },
                )
                .await
                .unwrap();
        }

        let mut conn = db.pool.acquire().await.unwrap();
        assert_eq!(feedback_review_count(&mut conn, user_id).await.unwrap(), 0);

        // Casual ratings still count toward the video's public average
        let casual = recompute_video_aggregates(&mut conn, third).await.unwrap();
        assert_eq!(casual.review_count, 1);
        assert_eq!(casual.parent_rating, 2.0);
        assert_eq!(casual.stimulation_level, None);
        drop(conn);

        let queue = reviews.pending(user_id).await.unwrap();
        assert_eq!(queue.review_count, 0);
        assert!(queue.needs_reviews);
        assert_eq!(queue.state, AccountState::InsufficientReviews);
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let (db, _, video_id) = setup().await;
        let err = ReviewService::new(db)
            .submit_feedback(999, video_id, feedback([3, 3, 3, 3, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_pending_queue_excludes_reviewed() {
        let (db, user_id, video_id) = setup().await;
        insert_video(&db, "second", 2, 4).await;
        insert_video(&db, "teen", 12, 15).await;
        sqlx::query("UPDATE users SET child_age = 3 WHERE id = ?")
            .bind(user_id)
            .execute(&db.pool)
            .await
            .unwrap();
        let reviews = ReviewService::new(db);
        reviews
            .submit_feedback(user_id, video_id, feedback([3, 3, 3, 3, 3]))
            .await
            .unwrap();

        let queue = reviews.pending(user_id).await.unwrap();
        assert_eq!(queue.review_count, 1);
        assert!(queue.needs_reviews);
        let ids: Vec<&str> = queue.unreviewed_videos.iter().map(|v| v.youtube_id.as_str()).collect();
        assert_eq!(ids, vec!["second"]);
    }
}
