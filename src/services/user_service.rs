// UserService - account lookups shared by auth, profile and review flows

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqliteConnection;

use crate::{
    database::Database,
    domains::{
        age::{age_on, today},
        AccountState,
    },
    error::{AppError, AppResult},
    models::{Child, ChildWithAge, Group, GroupMember, User, UserId, UserPreferences},
};

/// A membership row with its group attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    #[serde(flatten)]
    pub membership: GroupMember,
    pub group: Group,
}

/// The signed-in user as `GET /api/auth/me` reports it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub child_name: Option<String>,
    pub child_age: Option<i64>,
    pub onboarding_complete: bool,
    pub review_count: i64,
    pub state: AccountState,
    pub redirect_to: &'static str,
    pub preferences: Option<UserPreferences>,
    pub children: Vec<ChildWithAge>,
    pub group_memberships: Vec<Membership>,
}

#[derive(Clone)]
pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(user)
    }

    /// Structured reviews written by the user; only these count toward the gate.
    pub async fn feedback_review_count(&self, user_id: UserId) -> AppResult<i64> {
        let mut conn = self.db.pool.acquire().await?;
        feedback_review_count(&mut conn, user_id).await
    }

    /// Lifecycle state from a fresh snapshot of the user row.
    pub async fn account_state(&self, user: &User) -> AppResult<(AccountState, i64)> {
        let reviews = self.feedback_review_count(user.id).await?;
        Ok((AccountState::derive(user.onboarding_complete, reviews), reviews))
    }

    pub async fn children_with_ages(&self, user_id: UserId) -> AppResult<Vec<ChildWithAge>> {
        let children = sqlx::query_as::<_, Child>(
            "SELECT * FROM children WHERE user_id = ? ORDER BY date_of_birth ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let on = today();
        Ok(children
            .into_iter()
            .map(|child| ChildWithAge {
                age: age_on(child.date_of_birth, on),
                child,
            })
            .collect())
    }

    pub async fn preferences(&self, user_id: UserId) -> AppResult<Option<UserPreferences>> {
        let prefs = sqlx::query_as::<_, UserPreferences>("SELECT * FROM user_preferences WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.db.pool)
            .await?;
        Ok(prefs)
    }

    pub async fn memberships(&self, user_id: UserId) -> AppResult<Vec<Membership>> {
        let rows = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE user_id = ? ORDER BY joined_at ASC, id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let groups: HashMap<i64, Group> = sqlx::query_as::<_, Group>(
            "SELECT g.* FROM community_groups g
             JOIN group_members m ON m.group_id = g.id
             WHERE m.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?
        .into_iter()
        .map(|group| (group.id, group))
        .collect();

        Ok(rows
            .into_iter()
            .filter_map(|membership| {
                groups.get(&membership.group_id).cloned().map(|group| Membership { membership, group })
            })
            .collect())
    }

    pub async fn current_user(&self, user: User) -> AppResult<CurrentUser> {
        let (state, review_count) = self.account_state(&user).await?;
        let preferences = self.preferences(user.id).await?;
        let children = self.children_with_ages(user.id).await?;
        let group_memberships = self.memberships(user.id).await?;

        Ok(CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            child_name: user.child_name,
            child_age: user.child_age,
            onboarding_complete: user.onboarding_complete,
            review_count,
            state,
            redirect_to: state.landing_path(),
            preferences,
            children,
            group_memberships,
        })
    }
}

pub async fn feedback_review_count(conn: &mut SqliteConnection, user_id: UserId) -> AppResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = ? AND feedback_completed = 1")
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;
    Ok(count)
}

/// Look up an account by its already-normalized email.
pub async fn find_by_email(conn: &mut SqliteConnection, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

/// Load the user behind a session, or reject a token whose account is gone.
pub async fn require_user(conn: &mut SqliteConnection, user_id: UserId) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found. Please log out and log back in.".to_string()))
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    async fn insert_user(db: &Database, email: &str) -> UserId {
        sqlx::query("INSERT INTO users (name, email, created_at) VALUES (?, ?, ?)")
            .bind("Sam")
            .bind(email)
            .bind(Utc::now())
            .execute(&db.pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Parent@Example.COM "), "parent@example.com");
    }

    #[tokio::test]
    async fn test_find_and_state() {
        let db = Database::new_in_memory().await.unwrap();
        let id = insert_user(&db, "sam@example.com").await;
        let users = UserService::new(db.clone());

        let mut conn = db.pool.acquire().await.unwrap();
        let user = find_by_email(&mut conn, "sam@example.com").await.unwrap().unwrap();
        assert!(find_by_email(&mut conn, "nobody@example.com").await.unwrap().is_none());
        drop(conn);
        assert_eq!(user.id, id);
        assert!(user.is_google_only());

        let (state, reviews) = users.account_state(&user).await.unwrap();
        assert_eq!(state, AccountState::OnboardingIncomplete);
        assert_eq!(reviews, 0);

        let current = users.current_user(user).await.unwrap();
        assert_eq!(current.redirect_to, "/onboarding");
        assert!(current.children.is_empty());
    }

    #[tokio::test]
    async fn test_require_user_missing() {
        let db = Database::new_in_memory().await.unwrap();
        let mut conn = db.pool.acquire().await.unwrap();
        let err = require_user(&mut conn, 999).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
