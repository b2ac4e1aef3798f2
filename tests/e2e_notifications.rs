//! E2E tests for the per-user notification feed

mod common;

use std::time::Duration;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_registration_pushes_success_and_email_notifications() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let student = server.sign_up("sam@inst.example", "Sam").await;
    server.create_course(&admin, "c1", "Intro").await;

    server
        .post_json("/api/enrollments/c1", &student, json!({}))
        .await;

    let (status, feed) = server.get_json("/api/notifications", &student).await;
    assert_eq!(status, 200);
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[0]["type"], "success");
    assert!(feed[0]["message"].as_str().unwrap().contains("Intro"));
    assert_eq!(feed[1]["type"], "email");
    assert!(
        feed[1]["message"]
            .as_str()
            .unwrap()
            .starts_with("Email sent to sam@inst.example")
    );
    assert!(feed[0]["id"].as_u64().unwrap() < feed[1]["id"].as_u64().unwrap());

    // Feeds are private
    let (_, admin_feed) = server.get_json("/api/notifications", &admin).await;
    assert!(admin_feed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dismiss_removes_notification() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let student = server.sign_up("sam@inst.example", "Sam").await;
    server.create_course(&admin, "c1", "Intro").await;
    server
        .post_json("/api/enrollments/c1", &student, json!({}))
        .await;

    let (_, feed) = server.get_json("/api/notifications", &student).await;
    let id = feed[0]["id"].as_u64().unwrap();

    let dismiss = |id: u64| {
        server
            .client
            .delete(server.url(&format!("/api/notifications/{id}")))
            .bearer_auth(&student)
            .send()
    };
    assert_eq!(dismiss(id).await.unwrap().status(), 204);
    assert_eq!(dismiss(id).await.unwrap().status(), 404);

    let (_, feed) = server.get_json("/api/notifications", &student).await;
    let ids: Vec<u64> = feed
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n: &Value| n["id"].as_u64())
        .collect();
    assert!(!ids.contains(&id));
}

#[tokio::test]
async fn test_notifications_expire_after_ttl() {
    let server =
        TestServer::with_config(|config| config.notifications.ttl_seconds = 1).await;
    let admin = server.admin_token().await;
    let student = server.sign_up("sam@inst.example", "Sam").await;
    server.create_course(&admin, "c1", "Intro").await;
    server
        .post_json("/api/enrollments/c1", &student, json!({}))
        .await;

    let (_, feed) = server.get_json("/api/notifications", &student).await;
    assert!(!feed.as_array().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let (_, feed) = server.get_json("/api/notifications", &student).await;
    assert!(feed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_approval_notifies_the_student() {
    let server = TestServer::new().await;
    let admin = server.admin_token().await;
    let student = server.sign_up("sam@inst.example", "Sam").await;
    server.create_course(&admin, "c1", "Intro").await;
    server
        .post_json("/api/enrollments/c1", &student, json!({}))
        .await;
    server
        .post_json("/api/enrollments/c1/completion", &student, json!({}))
        .await;
    let (_, me) = server.get_json("/api/me", &student).await;
    let user_id = me["id"].as_str().unwrap().to_string();

    let (_, before) = server.get_json("/api/notifications", &student).await;
    let before = before.as_array().unwrap().len();

    server
        .post_json(
            &format!("/api/admin/reviews/{user_id}/c1/approve"),
            &admin,
            json!({}),
        )
        .await;

    let (_, after) = server.get_json("/api/notifications", &student).await;
    let after = after.as_array().unwrap();
    assert!(after.len() > before);
    assert!(after.iter().any(|n| n["type"] == "email"
        && n["message"].as_str().unwrap().contains("sam@inst.example")));
}
