// ProfileService - onboarding submission and profile edits

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::info;

use crate::{
    database::Database,
    domains::{
        age::{age_on, today},
        AccountState, LifecycleEvent,
    },
    error::{AppError, AppResult},
    models::{ChildWithAge, Group, TagList, UserId, UserPreferences},
    services::{
        group_service::enroll_by_age,
        user_service::{feedback_review_count, require_user, Membership, UserService},
    },
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInput {
    #[serde(default)]
    pub name: String,
    pub date_of_birth: NaiveDate,
}

fn validate_children(children: &[ChildInput], on: NaiveDate) -> AppResult<()> {
    for child in children {
        if child.name.trim().is_empty() {
            return Err(AppError::Validation("Each child needs a name".to_string()));
        }
        if child.date_of_birth > on {
            return Err(AppError::Validation("Date of birth cannot be in the future".to_string()));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    #[serde(default)]
    pub children: Vec<ChildInput>,
    #[serde(default)]
    pub concerns: TagList,
    #[serde(default)]
    pub situations: TagList,
    #[serde(default)]
    pub content_prefs: TagList,
}

impl OnboardingRequest {
    pub fn validate(&self, on: NaiveDate) -> AppResult<()> {
        if self.children.is_empty() {
            return Err(AppError::Validation("At least one child is required".to_string()));
        }
        validate_children(&self.children, on)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingOutcome {
    pub success: bool,
    pub state: AccountState,
    pub redirect_to: &'static str,
    pub joined_groups: Vec<Group>,
}

/// Every field is optional; only the ones present are changed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub children: Option<Vec<ChildInput>>,
    pub concerns: Option<TagList>,
    pub situations: Option<TagList>,
    pub content_prefs: Option<TagList>,
}

impl ProfileUpdate {
    pub fn validate(&self, on: NaiveDate) -> AppResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Name cannot be empty".to_string()));
            }
        }
        if let Some(children) = &self.children {
            validate_children(children, on)?;
        }
        Ok(())
    }

    fn touches_preferences(&self) -> bool {
        self.concerns.is_some() || self.situations.is_some() || self.content_prefs.is_some()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityCounts {
    pub reviews: i64,
    pub posts: i64,
    pub comments: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub child_name: Option<String>,
    pub child_age: Option<i64>,
    pub children: Vec<ChildWithAge>,
    pub preferences: Option<UserPreferences>,
    pub group_memberships: Vec<Membership>,
    pub counts: ActivityCounts,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Database,
    users: UserService,
}

impl ProfileService {
    pub fn new(db: Database) -> Self {
        Self {
            users: UserService::new(db.clone()),
            db,
        }
    }

    /// Store the onboarding answers, mark onboarding complete and enroll the
    /// user into every group matching one of the children's ages.
    pub async fn submit_onboarding(&self, user_id: UserId, req: OnboardingRequest) -> AppResult<OnboardingOutcome> {
        let on = today();
        req.validate(on)?;

        let mut tx = self.db.pool.begin().await?;
        let user = require_user(&mut tx, user_id).await?;

        replace_children(&mut tx, user_id, &req.children, on).await?;
        upsert_preferences(&mut tx, user_id, &req.concerns, &req.situations, &req.content_prefs).await?;
        sqlx::query("UPDATE users SET onboarding_complete = 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let ages: Vec<i64> = req.children.iter().map(|c| age_on(c.date_of_birth, on)).collect();
        let joined_groups = enroll_by_age(&mut tx, user_id, &ages).await?;
        let reviews = feedback_review_count(&mut tx, user_id).await?;

        tx.commit().await?;

        // Reviews written before a re-submission still count toward the gate
        let state = AccountState::derive(user.onboarding_complete, reviews)
            .apply(LifecycleEvent::OnboardingSubmitted)
            .apply(LifecycleEvent::FeedbackCompleted { total: reviews });
        info!(user_id, children = req.children.len(), groups = joined_groups.len(), "Onboarding complete");

        Ok(OnboardingOutcome {
            success: true,
            state,
            redirect_to: state.landing_path(),
            joined_groups,
        })
    }

    pub async fn get_profile(&self, user_id: UserId) -> AppResult<Profile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let counts = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM reviews WHERE user_id = ?1),
                (SELECT COUNT(*) FROM posts WHERE user_id = ?1),
                (SELECT COUNT(*) FROM comments WHERE user_id = ?1)",
        )
        .bind(user_id)
        .fetch_one(&self.db.pool)
        .await?;

        Ok(Profile {
            id: user.id,
            name: user.name,
            email: user.email,
            child_name: user.child_name,
            child_age: user.child_age,
            children: self.users.children_with_ages(user_id).await?,
            preferences: self.users.preferences(user_id).await?,
            group_memberships: self.users.memberships(user_id).await?,
            counts: ActivityCounts {
                reviews: counts.0,
                posts: counts.1,
                comments: counts.2,
            },
        })
    }

    pub async fn update_profile(&self, user_id: UserId, update: ProfileUpdate) -> AppResult<Profile> {
        let on = today();
        update.validate(on)?;

        let mut tx = self.db.pool.begin().await?;
        require_user(&mut tx, user_id).await?;

        if let Some(name) = &update.name {
            sqlx::query("UPDATE users SET name = ? WHERE id = ?")
                .bind(name.trim())
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(children) = &update.children {
            replace_children(&mut tx, user_id, children, on).await?;
        }

        if update.touches_preferences() {
            let current = sqlx::query_as::<_, UserPreferences>("SELECT * FROM user_preferences WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
            let pick = |new: &Option<TagList>, old: Option<&TagList>| {
                new.clone().or_else(|| old.cloned()).unwrap_or_default()
            };
            let concerns = pick(&update.concerns, current.as_ref().map(|p| &p.concerns));
            let situations = pick(&update.situations, current.as_ref().map(|p| &p.situations));
            let content_prefs = pick(&update.content_prefs, current.as_ref().map(|p| &p.content_prefs));
            upsert_preferences(&mut tx, user_id, &concerns, &situations, &content_prefs).await?;
        }

        tx.commit().await?;
        info!(user_id, "Profile updated");

        self.get_profile(user_id).await
    }
}

/// Delete-all-then-recreate. The legacy single-child columns follow the
/// first child in the list.
async fn replace_children(
    conn: &mut SqliteConnection,
    user_id: UserId,
    children: &[ChildInput],
    on: NaiveDate,
) -> AppResult<()> {
    sqlx::query("DELETE FROM children WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let now = Utc::now();
    for child in children {
        sqlx::query("INSERT INTO children (user_id, name, date_of_birth, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(child.name.trim())
            .bind(child.date_of_birth)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }

    let first = children.first();
    sqlx::query("UPDATE users SET child_name = ?, child_age = ? WHERE id = ?")
        .bind(first.map(|c| c.name.trim().to_string()))
        .bind(first.map(|c| age_on(c.date_of_birth, on)))
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn upsert_preferences(
    conn: &mut SqliteConnection,
    user_id: UserId,
    concerns: &TagList,
    situations: &TagList,
    content_prefs: &TagList,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO user_preferences (user_id, concerns, situations, content_prefs)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(user_id) DO UPDATE SET
            concerns = excluded.concerns,
            situations = excluded.situations,
            content_prefs = excluded.content_prefs",
    )
    .bind(user_id)
    .bind(concerns.encode())
    .bind(situations.encode())
    .bind(content_prefs.encode())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration};

    fn years_ago(years: i32) -> NaiveDate {
        let on = today() - Duration::days(1);
        NaiveDate::from_ymd_opt(on.year() - years, on.month(), on.day().min(28)).unwrap()
    }

    async fn setup() -> (Database, UserId) {
        let db = Database::new_in_memory().await.unwrap();
        let user_id = sqlx::query("INSERT INTO users (name, email, created_at) VALUES ('Lee', 'lee@example.com', ?)")
            .bind(Utc::now())
            .execute(&db.pool)
            .await
            .unwrap()
            .last_insert_rowid();
        (db, user_id)
    }

    #[test]
    fn test_onboarding_requires_children() {
        let req = OnboardingRequest {
            children: vec![],
            concerns: TagList::default(),
            situations: TagList::default(),
            content_prefs: TagList::default(),
        };
        assert!(matches!(req.validate(today()), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_null_tag_fields_read_as_empty() {
        let req: OnboardingRequest = serde_json::from_str(
            r#"{"children":[{"name":"Ada","dateOfBirth":"2022-03-01"}],"concerns":null,"situations":["Travel"],"contentPrefs":null}"#,
        )
        .unwrap();
        assert!(req.concerns.is_empty());
        assert!(req.content_prefs.is_empty());
        assert!(req.situations.contains("Travel"));

        let update: ProfileUpdate = serde_json::from_str(r#"{"concerns":null}"#).unwrap();
        assert!(update.concerns.is_none());
    }

    #[test]
    fn test_future_birthday_rejected() {
        let child = ChildInput {
            name: "Ivy".to_string(),
            date_of_birth: today() + Duration::days(3),
        };
        assert!(validate_children(&[child], today()).is_err());
    }

    #[tokio::test]
    async fn test_onboarding_then_profile_edit() {
        let (db, user_id) = setup().await;
        let profiles = ProfileService::new(db);

        let outcome = profiles
            .submit_onboarding(
                user_id,
                OnboardingRequest {
                    children: vec![ChildInput {
                        name: "Ivy".to_string(),
                        date_of_birth: years_ago(3),
                    }],
                    concerns: ["screen time"].into_iter().collect(),
                    situations: TagList::default(),
                    content_prefs: ["music", "music"].into_iter().collect(),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.state, AccountState::InsufficientReviews);
        assert_eq!(outcome.redirect_to, "/review-gate");

        let profile = profiles.get_profile(user_id).await.unwrap();
        assert_eq!(profile.child_name.as_deref(), Some("Ivy"));
        assert_eq!(profile.child_age, Some(3));
        assert_eq!(profile.children.len(), 1);
        let prefs = profile.preferences.unwrap();
        assert_eq!(prefs.content_prefs.len(), 1);

        let updated = profiles
            .update_profile(
                user_id,
                ProfileUpdate {
                    name: Some("Lee Park".to_string()),
                    children: Some(vec![
                        ChildInput {
                            name: "Max".to_string(),
                            date_of_birth: years_ago(5),
                        },
                        ChildInput {
                            name: "Ivy".to_string(),
                            date_of_birth: years_ago(3),
                        },
                    ]),
                    situations: Some(["travel"].into_iter().collect()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Lee Park");
        assert_eq!(updated.children.len(), 2);
        assert_eq!(updated.child_name.as_deref(), Some("Max"));
        let prefs = updated.preferences.unwrap();
        assert!(prefs.concerns.contains("screen time"));
        assert!(prefs.situations.contains("travel"));
    }
}
