//! HTTP-level tests against the full router on an in-memory database

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use super::{build_router, AppState};
use crate::config::{Config, ServerConfig};
use crate::db::{create_test_pool, migrations};

const PASSWORD: &str = "correct-horse-battery";

async fn test_server() -> TestServer {
    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let state = AppState::new(pool, &Config::default());
    TestServer::new(build_router(state, &ServerConfig::default())).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn client_ip(ip: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-forwarded-for"),
        HeaderValue::from_static(ip),
    )
}

/// Run first-time setup and return the admin session token
async fn admin_token(server: &TestServer) -> String {
    let response = server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "username": "partner",
            "email": "partner@firm.test",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_setup_runs_once() {
    let server = test_server().await;

    let before = server.get("/api/v1/auth/has-admin").await.json::<Value>();
    assert_eq!(before["has_admin"], false);

    let response = server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "username": "partner",
            "email": "partner@firm.test",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["user"]["role"], "admin");
    assert!(body["user"].get("password_hash").is_none());
    let cookie = response.header(header::SET_COOKIE);
    assert!(cookie.to_str().unwrap().starts_with("session="));

    let after = server.get("/api/v1/auth/has-admin").await.json::<Value>();
    assert_eq!(after["has_admin"], true);

    let again = server
        .post("/api/v1/auth/setup")
        .json(&json!({
            "username": "intruder",
            "email": "intruder@example.test",
            "password": PASSWORD,
        }))
        .await;
    again.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_and_me() {
    let server = test_server().await;
    admin_token(&server).await;

    let bad = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "partner", "password": "wrong-password" }))
        .await;
    bad.assert_status(StatusCode::UNAUTHORIZED);

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "PARTNER@firm.test", "password": PASSWORD }))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    let me = server
        .get("/api/v1/auth/me")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    me.assert_status_ok();
    assert_eq!(me.json::<Value>()["username"], "partner");
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = test_server().await;

    server.get("/api/v1/leads").await.assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/api/v1/admin/dashboard")
        .add_header(header::AUTHORIZATION, bearer("not-a-session"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_editor_cannot_manage_users() {
    let server = test_server().await;
    let admin = admin_token(&server).await;

    server
        .post("/api/v1/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "username": "associate",
            "email": "associate@firm.test",
            "password": PASSWORD,
            "role": "editor",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let login = server
        .post("/api/v1/auth/login")
        .json(&json!({ "username": "associate", "password": PASSWORD }))
        .await;
    let editor = login.json::<Value>()["token"].as_str().unwrap().to_string();

    server
        .get("/api/v1/admin/users")
        .add_header(header::AUTHORIZATION, bearer(&editor))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Editors still reach the staff dashboard
    server
        .get("/api/v1/leads/board")
        .add_header(header::AUTHORIZATION, bearer(&editor))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_contact_submission_converts_to_lead() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let submitted = server
        .post("/api/v1/contacts")
        .json(&json!({
            "name": "Dana Client",
            "email": "Dana@Example.test",
            "message": "I need help with a lease dispute.",
        }))
        .await;
    submitted.assert_status(StatusCode::CREATED);
    let contact_id = submitted.json::<Value>()["id"].as_i64().unwrap();

    let listed = server
        .get("/api/v1/contacts?status=pending")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["email"], "dana@example.test");

    let converted = server
        .post(&format!("/api/v1/contacts/{}/convert", contact_id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    converted.assert_status(StatusCode::CREATED);
    let lead = converted.json::<Value>();
    assert_eq!(lead["status"], "new");
    assert_eq!(lead["source"], "contact_form");

    server
        .post(&format!("/api/v1/contacts/{}/convert", contact_id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_contact_validation() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/contacts")
        .json(&json!({ "name": "", "email": "nobody", "message": "hi" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_form_submissions_are_rate_limited() {
    let server = test_server().await;
    let (name, value) = client_ip("203.0.113.9");

    for i in 0..5 {
        server
            .post("/api/v1/newsletter/subscribe")
            .add_header(name.clone(), value.clone())
            .json(&json!({ "email": format!("reader{}@example.test", i) }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let blocked = server
        .post("/api/v1/newsletter/subscribe")
        .add_header(name, value)
        .json(&json!({ "email": "reader-late@example.test" }))
        .await;
    blocked.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(blocked.json::<Value>()["error"]["code"], "RATE_LIMIT");
}

#[tokio::test]
async fn test_lead_moves_across_board() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let created = server
        .post("/api/v1/leads")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "name": "Acme Holdings",
            "email": "legal@acme.test",
            "estimated_value": 12000.0,
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let id = created.json::<Value>()["id"].as_i64().unwrap();

    let moved = server
        .patch(&format!("/api/v1/leads/{}/status", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "won" }))
        .await;
    moved.assert_status_ok();
    let change = moved.json::<Value>();
    assert_eq!(change["changed"], true);
    assert_eq!(change["lead"]["status"], "won");
    assert!(!change["lead"]["closed_at"].is_null());

    let board = server
        .get("/api/v1/leads/board")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    let columns = board.as_array().unwrap();
    assert_eq!(columns.len(), 7);
    let won = columns.iter().find(|c| c["status"] == "won").unwrap();
    assert_eq!(won["count"], 1);

    let detail = server
        .get(&format!("/api/v1/leads/{}", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    assert_eq!(detail["interactions"][0]["kind"], "status_change");

    let invalid = server
        .patch(&format!("/api/v1/leads/{}/status", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "archived" }))
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);

    server
        .patch("/api/v1/leads/9999/status")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "status": "won" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_lead_notes() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let id = server
        .post("/api/v1/leads")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "Sam Doe", "email": "sam@example.test" }))
        .await
        .json::<Value>()["id"]
        .as_i64()
        .unwrap();

    let note = server
        .post(&format!("/api/v1/leads/{}/notes", id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "content": "Prefers phone calls" }))
        .await;
    note.assert_status(StatusCode::CREATED);
    let note_id = note.json::<Value>()["id"].as_i64().unwrap();

    server
        .delete(&format!("/api/v1/leads/{}/notes/{}", id, note_id))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_practice_area_reorder_and_visibility() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let mut ids = Vec::new();
    for title in ["Family Law", "Estate Planning", "Business Law"] {
        let created = server
            .post("/api/v1/admin/services")
            .add_header(header::AUTHORIZATION, bearer(&token))
            .json(&json!({ "title": title, "summary": "Summary" }))
            .await;
        created.assert_status(StatusCode::CREATED);
        ids.push(created.json::<Value>()["id"].as_i64().unwrap());
    }

    server
        .put("/api/v1/admin/services/reorder")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "items": [
            { "id": ids[2], "order": 0 },
            { "id": ids[0], "order": 1 },
            { "id": ids[1], "order": 2 },
        ]}))
        .await
        .assert_status_ok();

    let public = server.get("/api/v1/services").await.json::<Value>();
    let slugs: Vec<&str> = public
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["business-law", "family-law", "estate-planning"]);

    server
        .post(&format!("/api/v1/admin/services/{}/toggle-active", ids[0]))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();
    server
        .get("/api/v1/services/family-law")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let partial = server
        .put("/api/v1/admin/services/reorder")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "items": [{ "id": ids[0], "order": 0 }] }))
        .await;
    partial.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blog_publication() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    server
        .post("/api/v1/admin/blog/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({
            "title": "Five Things To Know About Wills",
            "content": "A **will** is a legal document.",
            "category": "Estate",
            "status": "published",
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let draft = server
        .post("/api/v1/admin/blog/posts")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "title": "Unfinished", "content": "TBD" }))
        .await
        .json::<Value>();
    assert_eq!(draft["status"], "draft");

    let post = server
        .get("/api/v1/blog/posts/five-things-to-know-about-wills")
        .await;
    post.assert_status_ok();
    let body = post.json::<Value>();
    assert_eq!(body["meta"]["og_type"], "article");
    assert!(body["post"]["content_html"]
        .as_str()
        .unwrap()
        .contains("<strong>will</strong>"));

    server
        .get("/api/v1/blog/posts/unfinished")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let list = server.get("/api/v1/blog/posts").await.json::<Value>();
    assert_eq!(list["total"], 1);

    let categories = server.get("/api/v1/blog/categories").await.json::<Value>();
    assert_eq!(categories[0]["name"], "Estate");
    assert_eq!(categories[0]["count"], 1);
}

#[tokio::test]
async fn test_fee_estimate() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/estimate")
        .json(&json!({
            "service_type": "consultation",
            "complexity": "medium",
            "urgency": "priority",
            "company_size": "individual",
        }))
        .await;
    response.assert_status_ok();
    let estimate = response.json::<Value>();
    assert_eq!(estimate["fee"], 563);
    assert_eq!(estimate["low"], 478);
    assert_eq!(estimate["high"], 647);

    server
        .post("/api/v1/estimate")
        .json(&json!({
            "service_type": "space_law",
            "complexity": "medium",
            "urgency": "standard",
            "company_size": "individual",
        }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let options = server.get("/api/v1/estimate/options").await.json::<Value>();
    assert!(!options["service_types"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_newsletter_resubscribe_and_export() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let first = server
        .post("/api/v1/newsletter/subscribe")
        .json(&json!({ "email": "Reader@Example.test", "name": "Reader, Avid" }))
        .await;
    first.assert_status(StatusCode::CREATED);

    let second = server
        .post("/api/v1/newsletter/subscribe")
        .json(&json!({ "email": "reader@example.test" }))
        .await;
    second.assert_status_ok();
    let second = second.json::<Value>();
    assert_eq!(second["already_subscribed"], true);
    assert!(second.get("subscriber").is_none());
    assert!(second.get("unsubscribe_token").is_none());

    let export = server
        .get("/api/v1/admin/newsletter/export")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    export.assert_status_ok();
    assert!(export
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    assert!(export.text().contains("\"Reader, Avid\""));

    server
        .post("/api/v1/newsletter/unsubscribe")
        .json(&json!({ "token": "no-such-token" }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_newsletter_unsubscribe_with_issued_token() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    let subscribed = server
        .post("/api/v1/newsletter/subscribe")
        .json(&json!({ "email": "leaving@example.test" }))
        .await;
    subscribed.assert_status(StatusCode::CREATED);
    let body = subscribed.json::<Value>();
    assert_eq!(body["already_subscribed"], false);
    assert!(body["subscriber"].get("token").is_none());
    let unsubscribe_token = body["unsubscribe_token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        server
            .post("/api/v1/newsletter/unsubscribe")
            .json(&json!({ "token": &unsubscribe_token }))
            .await
            .assert_status_ok();
    }

    let listed = server
        .get("/api/v1/admin/newsletter/subscribers?status=unsubscribed")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .json::<Value>();
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["email"], "leaving@example.test");

    let again = server
        .post("/api/v1/newsletter/subscribe")
        .json(&json!({ "email": "leaving@example.test" }))
        .await;
    again.assert_status(StatusCode::CREATED);
    assert_ne!(again.json::<Value>()["unsubscribe_token"], unsubscribe_token.as_str());
}

#[tokio::test]
async fn test_sitemap_and_robots() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    server
        .post("/api/v1/admin/services")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "title": "Criminal Defense" }))
        .await
        .assert_status(StatusCode::CREATED);

    let sitemap = server.get("/sitemap.xml").await;
    sitemap.assert_status_ok();
    let xml = sitemap.text();
    assert!(xml.contains("<urlset"));
    assert!(xml.contains("/services/criminal-defense</loc>"));

    let robots = server.get("/robots.txt").await;
    robots.assert_status_ok();
    assert!(robots.text().contains("Sitemap:"));

    let site = server.get("/api/v1/site").await.json::<Value>();
    assert_eq!(site["meta"]["og_type"], "website");
}

#[tokio::test]
async fn test_dashboard_counts() {
    let server = test_server().await;
    let token = admin_token(&server).await;

    server
        .post("/api/v1/contacts")
        .json(&json!({
            "name": "Pat",
            "email": "pat@example.test",
            "message": "Question about a contract",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let stats = server
        .get("/api/v1/admin/dashboard")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    stats.assert_status_ok();
    let stats = stats.json::<Value>();
    assert_eq!(stats["pending_contacts"], 1);
    assert_eq!(stats["open_leads"], 0);
    assert_eq!(stats["leads_by_status"].as_array().unwrap().len(), 7);
    assert!(stats["request_count"].as_u64().unwrap() >= 2);
}
