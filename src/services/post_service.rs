// PostService - group discussion posts, comments and voting

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use tracing::{debug, info};

use crate::{
    database::Database,
    domains::{vote_transition, VoteAction, VoteValue},
    error::{AppError, AppResult},
    models::{Comment, CommentWithAuthor, GroupId, Post, PostId, PostWithAuthor, UserId, UserSummary, Vote},
};

/// Tries before a vote that keeps losing first-insert races gives up.
const VOTE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostSort {
    #[default]
    Hot,
    New,
    Top,
}

impl PostSort {
    /// Unknown values fall back to `hot`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("new") => PostSort::New,
            Some("top") => PostSort::Top,
            _ => PostSort::Hot,
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            PostSort::Hot => "p.score DESC, p.created_at DESC, p.id DESC",
            PostSort::New => "p.created_at DESC, p.id DESC",
            PostSort::Top => "p.score DESC, p.upvotes DESC, p.id ASC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub link: Option<String>,
}

impl CreatePostRequest {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(AppError::Validation("Title and content are required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub value: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub post: Post,
    pub user_vote: i64,
}

#[derive(Debug, FromRow)]
struct PostRow {
    #[sqlx(flatten)]
    post: Post,
    author_name: String,
}

impl From<PostRow> for PostWithAuthor {
    fn from(row: PostRow) -> Self {
        PostWithAuthor {
            user: UserSummary {
                id: row.post.user_id,
                name: row.author_name,
            },
            post: row.post,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    #[sqlx(flatten)]
    comment: Comment,
    author_name: String,
}

impl From<CommentRow> for CommentWithAuthor {
    fn from(row: CommentRow) -> Self {
        CommentWithAuthor {
            user: UserSummary {
                id: row.comment.user_id,
                name: row.author_name,
            },
            comment: row.comment,
        }
    }
}

#[derive(Clone)]
pub struct PostService {
    db: Database,
}

impl PostService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, group_id: GroupId, sort: PostSort) -> AppResult<Vec<PostWithAuthor>> {
        let mut conn = self.db.pool.acquire().await?;
        ensure_group(&mut conn, group_id).await?;

        let sql = format!(
            "SELECT p.*, u.name AS author_name
             FROM posts p JOIN users u ON u.id = p.user_id
             WHERE p.group_id = ?
             ORDER BY {}",
            sort.order_by()
        );
        let posts = sqlx::query_as::<_, PostRow>(&sql)
            .bind(group_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(PostWithAuthor::from)
            .collect();
        Ok(posts)
    }

    pub async fn create(&self, user_id: UserId, group_id: GroupId, req: CreatePostRequest) -> AppResult<PostWithAuthor> {
        req.validate()?;
        let link = req
            .link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty());

        let mut tx = self.db.pool.begin().await?;
        ensure_group(&mut tx, group_id).await?;

        let post_id = sqlx::query(
            "INSERT INTO posts (group_id, user_id, title, content, link, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(req.title.trim())
        .bind(req.content.trim())
        .bind(link)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let post = fetch_post_with_author(&mut tx, post_id).await?;
        tx.commit().await?;

        info!(post_id, group_id, user_id, "Post created");
        Ok(post)
    }

    /// Owner-only. Votes and comments go first, then the post.
    pub async fn delete(&self, user_id: UserId, post_id: PostId) -> AppResult<()> {
        let mut tx = self.db.pool.begin().await?;
        let post = find_post(&mut tx, post_id).await?;
        if post.user_id != user_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }

        sqlx::query("DELETE FROM votes WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM comments WHERE post_id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(post_id, user_id, "Post deleted");
        Ok(())
    }

    /// Read the viewer's existing vote, apply the toggle and adjust the
    /// post's tallies, all in one transaction. A first vote that loses a race
    /// against the same viewer's concurrent first vote is replayed against the
    /// row that won.
    pub async fn vote(&self, user_id: UserId, post_id: PostId, value: Option<i64>) -> AppResult<VoteOutcome> {
        let value = VoteValue::try_from(value.unwrap_or_default())?;

        for attempt in 1..=VOTE_ATTEMPTS {
            if let Some(outcome) = self.try_vote(user_id, post_id, value).await? {
                return Ok(outcome);
            }
            debug!(post_id, user_id, attempt, "Concurrent first vote; retrying");
        }
        Err(AppError::Conflict("Vote could not be recorded, please try again".to_string()))
    }

    /// `None` when the insert lost a race; the transaction is rolled back.
    async fn try_vote(&self, user_id: UserId, post_id: PostId, value: VoteValue) -> AppResult<Option<VoteOutcome>> {
        let mut tx = self.db.pool.begin().await?;
        find_post(&mut tx, post_id).await?;

        let existing = sqlx::query_as::<_, Vote>("SELECT * FROM votes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|vote| VoteValue::try_from(vote.value))
            .transpose()?;

        let transition = vote_transition(existing, value);
        match transition.action {
            VoteAction::Insert => {
                if !insert_vote(&mut tx, user_id, post_id, value).await? {
                    return Ok(None);
                }
            }
            VoteAction::Flip => {
                sqlx::query("UPDATE votes SET value = ? WHERE user_id = ? AND post_id = ?")
                    .bind(value.as_i64())
                    .bind(user_id)
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await?;
            }
            VoteAction::Remove => {
                sqlx::query("DELETE FROM votes WHERE user_id = ? AND post_id = ?")
                    .bind(user_id)
                    .bind(post_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        let post = sqlx::query_as::<_, Post>(
            "UPDATE posts
             SET upvotes = upvotes + ?, downvotes = downvotes + ?, score = score + ?
             WHERE id = ?
             RETURNING *",
        )
        .bind(transition.upvotes)
        .bind(transition.downvotes)
        .bind(transition.score)
        .bind(post_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(post_id, user_id, action = ?transition.action, score = post.score, "Vote applied");

        Ok(Some(VoteOutcome {
            post,
            user_vote: transition.user_vote,
        }))
    }

    /// Comments in posting order.
    pub async fn comments(&self, post_id: PostId) -> AppResult<Vec<CommentWithAuthor>> {
        let mut conn = self.db.pool.acquire().await?;
        find_post(&mut conn, post_id).await?;

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT c.*, u.name AS author_name
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&mut *conn)
        .await?
        .into_iter()
        .map(CommentWithAuthor::from)
        .collect();
        Ok(comments)
    }

    pub async fn add_comment(&self, user_id: UserId, post_id: PostId, req: CommentRequest) -> AppResult<CommentWithAuthor> {
        if req.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let mut tx = self.db.pool.begin().await?;
        find_post(&mut tx, post_id).await?;

        let comment_id = sqlx::query("INSERT INTO comments (post_id, user_id, content, created_at) VALUES (?, ?, ?, ?)")
            .bind(post_id)
            .bind(user_id)
            .bind(req.content.trim())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let comment = sqlx::query_as::<_, CommentRow>(
            "SELECT c.*, u.name AS author_name
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.id = ?",
        )
        .bind(comment_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(post_id, comment_id, user_id, "Comment added");
        Ok(comment.into())
    }
}

async fn ensure_group(conn: &mut SqliteConnection, group_id: GroupId) -> AppResult<()> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM community_groups WHERE id = ?")
        .bind(group_id)
        .fetch_optional(&mut *conn)
        .await?;
    exists
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
}

async fn find_post(conn: &mut SqliteConnection, post_id: PostId) -> AppResult<Post> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

async fn fetch_post_with_author(conn: &mut SqliteConnection, post_id: PostId) -> AppResult<PostWithAuthor> {
    let row = sqlx::query_as::<_, PostRow>(
        "SELECT p.*, u.name AS author_name FROM posts p JOIN users u ON u.id = p.user_id WHERE p.id = ?",
    )
    .bind(post_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row.into())
}

/// Insert a first vote. False when the (user, post) row already exists.
async fn insert_vote(conn: &mut SqliteConnection, user_id: UserId, post_id: PostId, value: VoteValue) -> AppResult<bool> {
    let result = sqlx::query(
        "INSERT INTO votes (user_id, post_id, value) VALUES (?, ?, ?)
         ON CONFLICT(user_id, post_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(value.as_i64())
    .execute(&mut *conn)
    .await;

    match result {
        Ok(done) => Ok(done.rows_affected() > 0),
        Err(e) if AppError::is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
