// GroupService - age-based communities and their membership counters
//
// member_count is denormalized. Every path that inserts or deletes a
// group_members row adjusts it by exactly the number of rows touched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use tracing::info;

use crate::{
    database::Database,
    domains::{age::groups_for_ages, slug::slugify},
    error::{AppError, AppResult},
    models::{Group, GroupId, UserId},
};

const DEFAULT_ICON: &str = "👶";
const DUPLICATE_SLUG: &str = "A community with a similar name already exists";

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GroupListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub group: Group,
    pub post_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub post_count: i64,
    pub member_total: i64,
    pub is_member: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub age_min: Option<i64>,
    pub age_max: Option<i64>,
    pub icon: Option<String>,
}

impl CreateGroupRequest {
    /// Returns the age range once the request is known to be well formed.
    pub fn validate(&self) -> AppResult<(i64, i64)> {
        let (Some(age_min), Some(age_max)) = (self.age_min, self.age_max) else {
            return Err(AppError::Validation(
                "Name, description, and age range are required".to_string(),
            ));
        };
        if self.name.trim().is_empty() || self.description.trim().is_empty() {
            return Err(AppError::Validation(
                "Name, description, and age range are required".to_string(),
            ));
        }
        if age_min < 0 || age_min > age_max {
            return Err(AppError::Validation("Invalid age range".to_string()));
        }
        Ok((age_min, age_max))
    }
}

#[derive(Clone)]
pub struct GroupService {
    db: Database,
}

impl GroupService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> AppResult<Vec<GroupListing>> {
        let groups = sqlx::query_as::<_, GroupListing>(
            "SELECT g.*, (SELECT COUNT(*) FROM posts p WHERE p.group_id = g.id) AS post_count
             FROM community_groups g
             ORDER BY g.age_min ASC, g.id ASC",
        )
        .fetch_all(&self.db.pool)
        .await?;
        Ok(groups)
    }

    pub async fn detail(&self, id: GroupId, viewer: Option<UserId>) -> AppResult<GroupDetail> {
        let mut conn = self.db.pool.acquire().await?;
        let group = find_group(&mut conn, id).await?;

        let post_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE group_id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        let member_total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;

        let is_member = match viewer {
            Some(user_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM group_members WHERE group_id = ? AND user_id = ?",
                )
                .bind(id)
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await?
                    > 0
            }
            None => false,
        };

        Ok(GroupDetail {
            group,
            post_count,
            member_total,
            is_member,
        })
    }

    /// Create a community; the creator becomes its first member.
    pub async fn create(&self, user_id: UserId, req: CreateGroupRequest) -> AppResult<Group> {
        let (age_min, age_max) = req.validate()?;
        let slug = slugify(&req.name);
        if slug.is_empty() {
            return Err(AppError::Validation(
                "Community name must contain letters or numbers".to_string(),
            ));
        }
        let icon = req
            .icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_ICON);

        let mut tx = self.db.pool.begin().await?;

        let taken: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM community_groups WHERE slug = ?")
            .bind(&slug)
            .fetch_one(&mut *tx)
            .await?;
        if taken > 0 {
            return Err(AppError::BadRequest(DUPLICATE_SLUG.to_string()));
        }

        let now = Utc::now();
        let group = sqlx::query_as::<_, Group>(
            "INSERT INTO community_groups (name, slug, description, age_min, age_max, icon, member_count, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)
             RETURNING *",
        )
        .bind(req.name.trim())
        .bind(&slug)
        .bind(req.description.trim())
        .bind(age_min)
        .bind(age_max)
        .bind(icon)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if AppError::is_unique_violation(&e) {
                AppError::BadRequest(DUPLICATE_SLUG.to_string())
            } else {
                AppError::from(e)
            }
        })?;

        sqlx::query("INSERT INTO group_members (user_id, group_id, joined_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(group.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        info!(group_id = group.id, slug = %group.slug, user_id, "Group created");
        Ok(group)
    }

    /// Join when not a member, leave when already one. Returns the new state.
    pub async fn toggle_membership(&self, user_id: UserId, group_id: GroupId) -> AppResult<bool> {
        let mut tx = self.db.pool.begin().await?;
        find_group(&mut tx, group_id).await?;

        let left = sqlx::query("DELETE FROM group_members WHERE user_id = ? AND group_id = ?")
            .bind(user_id)
            .bind(group_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let joined = if left > 0 {
            sqlx::query("UPDATE community_groups SET member_count = MAX(member_count - ?, 0) WHERE id = ?")
                .bind(left as i64)
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
            false
        } else {
            join_group(&mut tx, user_id, group_id).await?;
            true
        };

        tx.commit().await?;
        info!(user_id, group_id, joined, "Group membership toggled");
        Ok(joined)
    }
}

async fn find_group(conn: &mut SqliteConnection, id: GroupId) -> AppResult<Group> {
    sqlx::query_as::<_, Group>("SELECT * FROM community_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
}

/// Insert a membership if missing; the counter moves only when a row was added.
async fn join_group(conn: &mut SqliteConnection, user_id: UserId, group_id: GroupId) -> AppResult<bool> {
    let inserted = sqlx::query("INSERT OR IGNORE INTO group_members (user_id, group_id, joined_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(group_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if inserted > 0 {
        sqlx::query("UPDATE community_groups SET member_count = member_count + ? WHERE id = ?")
            .bind(inserted as i64)
            .bind(group_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(inserted > 0)
}

/// Join every group whose age range contains one of `ages`. Returns the
/// matching groups, including ones the user already belonged to.
pub async fn enroll_by_age(conn: &mut SqliteConnection, user_id: UserId, ages: &[i64]) -> AppResult<Vec<Group>> {
    let groups = sqlx::query_as::<_, Group>("SELECT * FROM community_groups ORDER BY age_min ASC, id ASC")
        .fetch_all(&mut *conn)
        .await?;

    let matching: Vec<Group> = groups_for_ages(&groups, ages).into_iter().cloned().collect();
    for group in &matching {
        if join_group(conn, user_id, group.id).await? {
            info!(user_id, group_id = group.id, "Auto-enrolled into age group");
        }
    }
    Ok(matching)
}
