// VideoService - catalog listing, detail pages and watch tracking

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::{
    database::Database,
    error::{AppError, AppResult},
    models::{Review, ReviewWithAuthor, UserId, UserSummary, Video, VideoId},
};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoFilter {
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewRequest {
    pub completed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub reviews: Vec<ReviewWithAuthor>,
}

#[derive(Debug, FromRow)]
pub(crate) struct AuthoredReviewRow {
    #[sqlx(flatten)]
    review: Review,
    author_name: String,
}

impl From<AuthoredReviewRow> for ReviewWithAuthor {
    fn from(row: AuthoredReviewRow) -> Self {
        ReviewWithAuthor {
            user: UserSummary {
                id: row.review.user_id,
                name: row.author_name,
            },
            review: row.review,
        }
    }
}

#[derive(Clone)]
pub struct VideoService {
    db: Database,
}

impl VideoService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Videos overlapping the requested age window, best rated first.
    pub async fn list(&self, filter: &VideoFilter) -> AppResult<Vec<Video>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM videos WHERE 1 = 1");

        if let Some(age_max) = filter.age_max {
            query.push(" AND age_min <= ").push_bind(age_max);
        }
        if let Some(age_min) = filter.age_min {
            query.push(" AND age_max >= ").push_bind(age_min);
        }
        if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
            query.push(" AND category = ").push_bind(category.to_string());
        }
        query.push(" ORDER BY parent_rating DESC, id ASC");

        let videos = query.build_query_as::<Video>().fetch_all(&self.db.pool).await?;

        // Tags live in a JSON column, so the tag filter runs here
        let videos = match filter.tag.as_deref().filter(|t| !t.is_empty()) {
            Some(tag) => videos.into_iter().filter(|v| v.tags.contains(tag)).collect(),
            None => videos,
        };
        Ok(videos)
    }

    pub async fn detail(&self, id: VideoId) -> AppResult<VideoDetail> {
        let mut conn = self.db.pool.acquire().await?;
        let video = find_video(&mut conn, id).await?;

        let reviews = sqlx::query_as::<_, AuthoredReviewRow>(
            "SELECT r.*, u.name AS author_name
             FROM reviews r JOIN users u ON u.id = r.user_id
             WHERE r.video_id = ?
             ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(ReviewWithAuthor::from)
        .collect();

        Ok(VideoDetail { video, reviews })
    }

    /// Upsert the viewer's watch record. `completed` never goes back to false.
    pub async fn record_view(&self, user_id: UserId, video_id: VideoId, completed: bool) -> AppResult<()> {
        let mut tx = self.db.pool.begin().await?;
        find_video(&mut tx, video_id).await?;

        sqlx::query(
            "INSERT INTO video_views (user_id, video_id, watched_at, completed)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, video_id) DO UPDATE SET
                watched_at = excluded.watched_at,
                completed = MAX(video_views.completed, excluded.completed)",
        )
        .bind(user_id)
        .bind(video_id)
        .bind(Utc::now())
        .bind(completed)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(user_id, video_id, completed, "Recorded video view");
        Ok(())
    }
}

pub(crate) async fn find_video(conn: &mut SqliteConnection, id: VideoId) -> AppResult<Video> {
    sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
}
