// End-to-end tests: the full router driven in-process with fake outbound services

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Months, Utc};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use parentpick::{
    app_state::AppState,
    config::Config,
    data_seeder,
    database::Database,
    error::AppResult,
    infrastructure::{
        google::{GoogleIdentity, GoogleVerifier},
        mailer::{EmailMessage, Mailer},
    },
    routes::create_router,
};

struct FixedGoogleVerifier;

#[async_trait]
impl GoogleVerifier for FixedGoogleVerifier {
    async fn verify_id_token(&self, _credential: &str) -> AppResult<GoogleIdentity> {
        Ok(GoogleIdentity {
            google_id: "google-sub-123".to_string(),
            email: Some("gpat@example.com".to_string()),
            email_verified: true,
            name: Some("Pat Google".to_string()),
        })
    }
}

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> AppResult<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    mailer: Arc<RecordingMailer>,
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    /// `token=...` pair from Set-Cookie, ready to send back.
    fn session_cookie(&self) -> Option<String> {
        self.set_cookie()
            .and_then(|value| value.split(';').next().map(str::to_string))
    }

    fn set_cookie(&self) -> Option<&str> {
        self.headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok())
    }

    fn clears_cookie(&self) -> bool {
        self.set_cookie().is_some_and(|v| v.starts_with("token=;") && v.contains("Max-Age=0"))
    }

    fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}

async fn spawn_app_with(config: Config) -> TestApp {
    let db = Database::new_in_memory().await.unwrap();
    data_seeder::seed_all(&db).await.unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::from_parts(db, config, Arc::new(FixedGoogleVerifier), mailer.clone());
    TestApp {
        router: create_router(state.clone()),
        state,
        mailer,
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(Config::for_tests()).await
}

impl TestApp {
    async fn request(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, headers, body }
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, cookie, None).await
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    async fn signup(&self, name: &str, email: &str) -> String {
        let response = self
            .post(
                "/api/auth/signup",
                None,
                json!({ "name": name, "email": email, "password": "password123" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.session_cookie().unwrap()
    }

    /// Signs up and finishes onboarding with one two-year-old; returns the
    /// refreshed cookie.
    async fn onboarded_user(&self, name: &str, email: &str) -> String {
        let cookie = self.signup(name, email).await;
        let response = self
            .post(
                "/api/onboarding",
                Some(cookie.as_str()),
                json!({ "children": [{ "name": "Kid", "dateOfBirth": months_ago(30) }] }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.session_cookie().unwrap()
    }

    async fn video_ids(&self) -> Vec<i64> {
        let response = self.get("/api/videos", None).await;
        response.body["videos"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_i64().unwrap())
            .collect()
    }

    async fn first_group_id(&self) -> i64 {
        let response = self.get("/api/groups", None).await;
        response.body["groups"][0]["id"].as_i64().unwrap()
    }
}

fn months_ago(months: u32) -> String {
    Utc::now()
        .date_naive()
        .checked_sub_months(Months::new(months))
        .unwrap()
        .to_string()
}

fn feedback(overall: i64) -> Value {
    json!({
        "educationalRating": 4,
        "ageAppropriateRating": 5,
        "engagementRating": 3,
        "stimulationRating": 2,
        "overallRating": overall,
        "contentTags": ["Calm"]
    })
}

#[tokio::test]
async fn test_signup_then_login_reports_incomplete_onboarding() {
    let app = spawn_app().await;
    app.signup("Jamie", "Jamie@Example.com").await;

    let duplicate = app
        .post(
            "/api/auth/signup",
            None,
            json!({ "name": "Again", "email": "jamie@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "jamie@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
    assert_eq!(login.body["user"]["onboardingComplete"], json!(false));
    assert_eq!(login.body["redirectTo"], json!("/onboarding"));
    assert!(login.session_cookie().unwrap().starts_with("token="));

    let wrong = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "jamie@example.com", "password": "nope-nope" }),
        )
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_onboarding_joins_matching_age_groups() {
    let app = spawn_app().await;
    let cookie = app.signup("Robin", "robin@example.com").await;

    let response = app
        .post(
            "/api/onboarding",
            Some(cookie.as_str()),
            json!({
                "children": [
                    { "name": "Ada", "dateOfBirth": months_ago(30) },
                    { "name": "Ben", "dateOfBirth": months_ago(66) }
                ],
                "concerns": ["Screen time"],
                "situations": ["Meal Prep"],
                "contentPrefs": ["Educational"]
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["redirectTo"], json!("/review-gate"));

    let mut slugs: Vec<String> = response.body["joinedGroups"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["slug"].as_str().unwrap().to_string())
        .collect();
    slugs.sort();
    assert_eq!(
        slugs,
        vec!["curious-toddlers", "kindergarten-kids", "preschool-pals", "tiny-explorers"]
    );

    let refreshed = response.session_cookie().unwrap();
    let me = app.get("/api/auth/me", Some(refreshed.as_str())).await;
    assert_eq!(me.body["user"]["onboardingComplete"], json!(true));
    assert_eq!(me.body["user"]["children"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_three_feedbacks_unlock_discover() {
    let app = spawn_app().await;
    let cookie = app.onboarded_user("Sam", "sam@example.com").await;
    let videos = app.video_ids().await;

    let me = app.get("/api/auth/me", Some(cookie.as_str())).await;
    assert_eq!(me.body["user"]["redirectTo"], json!("/review-gate"));

    for (i, video_id) in videos.iter().take(3).enumerate() {
        let response = app
            .post(&format!("/api/videos/{}/feedback", video_id), Some(cookie.as_str()), feedback(4))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        assert_eq!(response.body["reviewCount"], json!(i as i64 + 1));
    }

    let me = app.get("/api/auth/me", Some(cookie.as_str())).await;
    assert_eq!(me.body["user"]["reviewCount"], json!(3));
    assert_eq!(me.body["user"]["redirectTo"], json!("/discover"));

    let status = app
        .get(&format!("/api/videos/{}/feedback", videos[0]), Some(cookie.as_str()))
        .await;
    assert_eq!(status.body["feedbackCompleted"], json!(true));

    let bad = app
        .post(&format!("/api/videos/{}/feedback", videos[4]), Some(cookie.as_str()), feedback(9))
        .await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_casual_reviews_keep_review_gate_closed() {
    let app = spawn_app().await;
    let cookie = app.onboarded_user("Noor", "noor@example.com").await;
    let videos = app.video_ids().await;

    for video_id in videos.iter().take(3) {
        let response = app
            .post(
                &format!("/api/videos/{}/reviews", video_id),
                Some(cookie.as_str()),
                json!({ "rating": 5, "comment": "My kid liked it" }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    }

    let me = app.get("/api/auth/me", Some(cookie.as_str())).await;
    assert_eq!(me.body["user"]["reviewCount"], json!(0));
    assert_eq!(me.body["user"]["redirectTo"], json!("/review-gate"));

    let root = app.get("/", Some(cookie.as_str())).await;
    assert_eq!(root.location(), Some("/review-gate"));

    let pending = app.get("/api/reviews/pending", Some(cookie.as_str())).await;
    assert_eq!(pending.body["reviewCount"], json!(0));
    assert_eq!(pending.body["needsReviews"], json!(true));

    // The casual rating replaces the catalog placeholder in the public average
    let detail = app.get(&format!("/api/videos/{}", videos[0]), None).await;
    assert_eq!(detail.body["video"]["reviewCount"], json!(1));
    assert_eq!(detail.body["video"]["parentRating"], json!(5.0));
}

#[tokio::test]
async fn test_malformed_path_id_is_json_400() {
    let app = spawn_app().await;
    let response = app.get("/api/videos/abc", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["status"], json!(400));
    assert!(response.body["error"].as_str().unwrap().starts_with("Invalid path parameter"));
}

#[tokio::test]
async fn test_vote_toggle_and_flip() {
    let app = spawn_app().await;
    let cookie = app.onboarded_user("Lee", "lee@example.com").await;
    let group_id = app.first_group_id().await;

    let created = app
        .post(
            &format!("/api/groups/{}/posts", group_id),
            Some(cookie.as_str()),
            json!({ "title": "Car rides", "content": "What works for long drives?" }),
        )
        .await;
    assert_eq!(created.status, StatusCode::OK, "{}", created.body);
    let post_id = created.body["post"]["id"].as_i64().unwrap();
    let vote_uri = format!("/api/posts/{}/vote", post_id);

    let up = app.post(&vote_uri, Some(cookie.as_str()), json!({ "value": 1 })).await;
    assert_eq!(up.body["post"]["score"], json!(1));
    assert_eq!(up.body["userVote"], json!(1));

    let flipped = app.post(&vote_uri, Some(cookie.as_str()), json!({ "value": -1 })).await;
    assert_eq!(flipped.body["post"]["upvotes"], json!(0));
    assert_eq!(flipped.body["post"]["downvotes"], json!(1));
    assert_eq!(flipped.body["post"]["score"], json!(-1));

    let removed = app.post(&vote_uri, Some(cookie.as_str()), json!({ "value": -1 })).await;
    assert_eq!(removed.body["post"]["score"], json!(0));
    assert_eq!(removed.body["userVote"], json!(0));

    let invalid = app.post(&vote_uri, Some(cookie.as_str()), json!({ "value": 2 })).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_similar_group_name_is_rejected() {
    let app = spawn_app().await;
    let cookie = app.onboarded_user("Kai", "kai@example.com").await;

    let body = |name: &str| {
        json!({ "name": name, "description": "Parks and trails", "ageMin": 2, "ageMax": 5, "icon": "🌳" })
    };

    let first = app.post("/api/groups", Some(cookie.as_str()), body("Outdoor Fun")).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["group"]["slug"], json!("outdoor-fun"));
    assert_eq!(first.body["group"]["memberCount"], json!(1));

    let second = app.post("/api/groups", Some(cookie.as_str()), body("Outdoor Fun!!")).await;
    assert_eq!(second.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        second.body["error"],
        json!("A community with a similar name already exists")
    );
}

#[tokio::test]
async fn test_only_author_can_delete_post() {
    let app = spawn_app().await;
    let author = app.onboarded_user("Ari", "ari@example.com").await;
    let other = app.onboarded_user("Bo", "bo@example.com").await;
    let group_id = app.first_group_id().await;

    let created = app
        .post(
            &format!("/api/groups/{}/posts", group_id),
            Some(author.as_str()),
            json!({ "title": "Naps", "content": "Screens before naps?" }),
        )
        .await;
    let post_id = created.body["post"]["id"].as_i64().unwrap();

    app.post(
        &format!("/api/posts/{}/comments", post_id),
        Some(other.as_str()),
        json!({ "content": "We stop an hour before." }),
    )
    .await;

    let uri = format!("/api/posts/{}", post_id);
    let forbidden = app.request(Method::DELETE, &uri, Some(other.as_str()), None).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let anonymous = app.request(Method::DELETE, &uri, None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let deleted = app.request(Method::DELETE, &uri, Some(author.as_str()), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let comments = app.get(&format!("/api/posts/{}/comments", post_id), None).await;
    assert_eq!(comments.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_page_gate_redirects() {
    let app = spawn_app().await;
    let cookie = app.signup("Noor", "noor@example.com").await;

    let anonymous = app.get("/discover", None).await;
    assert_eq!(anonymous.status, StatusCode::SEE_OTHER);
    assert_eq!(anonymous.location(), Some("/login"));
    assert!(anonymous.set_cookie().is_none());

    let signed_in = app.get("/login", Some(cookie.as_str())).await;
    assert_eq!(signed_in.status, StatusCode::SEE_OTHER);
    assert_eq!(signed_in.location(), Some("/discover"));

    let garbage = app.get("/discover", Some("token=not-a-jwt")).await;
    assert_eq!(garbage.location(), Some("/login"));
    assert!(garbage.clears_cookie());

    // A public page with a stale cookie is served, minus the cookie
    let stale_public = app.get("/login", Some("token=not-a-jwt")).await;
    assert_ne!(stale_public.status, StatusCode::SEE_OTHER);
    assert!(stale_public.clears_cookie());

    // The API is never redirected
    let api = app.get("/api/auth/me", None).await;
    assert_eq!(api.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_root_redirect_follows_account_state() {
    let app = spawn_app().await;

    let anonymous = app.get("/", None).await;
    assert_eq!(anonymous.location(), Some("/login"));

    let cookie = app.signup("Ivy", "ivy@example.com").await;
    let fresh = app.get("/", Some(cookie.as_str())).await;
    assert_eq!(fresh.location(), Some("/onboarding"));

    let onboarded = app.onboarded_user("Jo", "jo@example.com").await;
    let gated = app.get("/", Some(onboarded.as_str())).await;
    assert_eq!(gated.location(), Some("/review-gate"));

    let garbage = app.get("/", Some("token=garbage")).await;
    assert_eq!(garbage.location(), Some("/login"));
    assert!(garbage.clears_cookie());
}

#[tokio::test]
async fn test_password_reset_with_mailed_link() {
    let app = spawn_app().await;
    app.signup("Mo", "mo@example.com").await;

    let unknown = app
        .post("/api/auth/forgot-password", None, json!({ "email": "nobody@example.com" }))
        .await;
    let known = app
        .post("/api/auth/forgot-password", None, json!({ "email": "mo@example.com" }))
        .await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(unknown.body, known.body);

    let token = {
        let sent = app.mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "mo@example.com");
        let pattern = regex::Regex::new(r"reset-password\?token=([0-9a-f]+)").unwrap();
        pattern.captures(&sent[0].html).unwrap()[1].to_string()
    };

    let reset = app
        .post(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK, "{}", reset.body);

    let reused = app
        .post(
            "/api/auth/reset-password",
            None,
            json!({ "token": token, "password": "another-pass" }),
        )
        .await;
    assert_eq!(reused.status, StatusCode::BAD_REQUEST);

    let login = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "mo@example.com", "password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn test_me_for_deleted_user_clears_cookie() {
    let app = spawn_app().await;
    let cookie = app.signup("Gone", "gone@example.com").await;

    sqlx::query("DELETE FROM users WHERE email = ?")
        .bind("gone@example.com")
        .execute(&app.state.db.pool)
        .await
        .unwrap();

    let me = app.get("/api/auth/me", Some(cookie.as_str())).await;
    assert_eq!(me.status, StatusCode::NOT_FOUND);
    assert!(me.clears_cookie());
}

#[tokio::test]
async fn test_google_sign_in_creates_then_reuses_account() {
    let app = spawn_app().await;

    let first = app.post("/api/auth/google", None, json!({ "credential": "id-token" })).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.body["user"]["isNewUser"], json!(true));
    assert_eq!(first.body["redirectTo"], json!("/onboarding"));

    let second = app.post("/api/auth/google", None, json!({ "credential": "id-token" })).await;
    assert_eq!(second.body["user"]["isNewUser"], json!(false));
    assert_eq!(second.body["user"]["id"], first.body["user"]["id"]);
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let app = spawn_app().await;
    let response = app.get("/api/nothing-here", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["status"], json!(404));
}

#[tokio::test]
async fn test_static_frontend_behind_gate() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("discover")).unwrap();
    std::fs::write(dir.path().join("discover/index.html"), "<h1>Discover</h1>").unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('hi')").unwrap();

    let mut config = Config::for_tests();
    config.server.static_dir = Some(dir.path().to_string_lossy().into_owned());
    let app = spawn_app_with(config).await;

    let asset = app.get("/app.js", None).await;
    assert_eq!(asset.status, StatusCode::OK);

    let gated = app.get("/discover", None).await;
    assert_eq!(gated.status, StatusCode::SEE_OTHER);

    let cookie = app.signup("Tess", "tess@example.com").await;
    let page = app.get("/discover/", Some(cookie.as_str())).await;
    assert_eq!(page.status, StatusCode::OK);
}
