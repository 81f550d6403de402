//! Votes and comments against Postgres.
//!
//! Run with: `cargo test -p tempt-api --test social_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::api_path;
use helpers::db::{setup_test_app, TestApp, TestUser};
use serde_json::{json, Value};
use tempt_core::models::UserRole;
use uuid::Uuid;

async fn vote(app: &TestApp, user: &TestUser, image_id: Uuid, value: i16) -> Value {
    let response = app
        .server
        .post(&api_path(&format!("/images/{}/vote", image_id)))
        .add_header("Authorization", user.bearer())
        .json(&json!({ "value": value }))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

async fn comment(app: &TestApp, user: &TestUser, image_id: Uuid, body: &str) -> Uuid {
    let response = app
        .server
        .post(&api_path(&format!("/images/{}/comments", image_id)))
        .add_header("Authorization", user.bearer())
        .json(&json!({ "body": body }))
        .await;
    assert_eq!(response.status_code(), 201);
    let created: Value = response.json();
    created["id"].as_str().unwrap().parse().unwrap()
}

async fn image(app: &TestApp, image_id: Uuid) -> Value {
    let response = app
        .server
        .get(&api_path(&format!("/images/{}", image_id)))
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

async fn stored_vote_sum(app: &TestApp, image_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(value), 0)::BIGINT FROM votes WHERE image_id = $1")
        .bind(image_id)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn vote_score_follows_casts_switches_and_retractions() {
    let app = setup_test_app().await;
    let owner = app.signup(UserRole::User).await;
    let alice = app.signup(UserRole::User).await;
    let bob = app.signup(UserRole::User).await;
    let image_id = app.completed_image(&owner).await;

    let outcome = vote(&app, &alice, image_id, 1).await;
    assert_eq!(outcome["vote_score"], 1);
    assert_eq!(outcome["user_vote"], 1);

    assert_eq!(vote(&app, &bob, image_id, -1).await["vote_score"], 0);

    // Same value again retracts
    let retracted = vote(&app, &alice, image_id, 1).await;
    assert_eq!(retracted["vote_score"], -1);
    assert!(retracted["user_vote"].is_null());

    // Switching sides moves the score by two
    assert_eq!(vote(&app, &bob, image_id, 1).await["vote_score"], 1);

    assert_eq!(image(&app, image_id).await["vote_score"], 1);
    assert_eq!(stored_vote_sum(&app, image_id).await, 1);
}

#[tokio::test]
async fn unfinished_images_cannot_be_voted_on() {
    let app = setup_test_app().await;
    let owner = app.signup(UserRole::User).await;
    let voter = app.signup(UserRole::User).await;
    let task_id = app.queue_image(&owner).await;
    let image_id = app.image_id(&task_id).await;

    let response = app
        .server
        .post(&api_path(&format!("/images/{}/vote", image_id)))
        .add_header("Authorization", voter.bearer())
        .json(&json!({ "value": 1 }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn comment_count_tracks_hide_and_delete() {
    let app = setup_test_app().await;
    let owner = app.signup(UserRole::User).await;
    let author = app.signup(UserRole::User).await;
    let moderator = app.signup(UserRole::Moderator).await;
    let image_id = app.completed_image(&owner).await;

    let first = comment(&app, &author, image_id, "lovely light").await;
    let second = comment(&app, &author, image_id, "which model?").await;
    assert_eq!(image(&app, image_id).await["comment_count"], 2);

    let hide = |id: Uuid| {
        app.server
            .post(&api_path(&format!("/admin/comments/{}/hide", id)))
            .add_header("Authorization", moderator.bearer())
    };
    assert_eq!(hide(first).await.status_code(), 204);
    assert_eq!(image(&app, image_id).await["comment_count"], 1);
    assert_eq!(hide(first).await.status_code(), 204);
    assert_eq!(image(&app, image_id).await["comment_count"], 1);

    let listed: Vec<Value> = app
        .server
        .get(&api_path(&format!("/images/{}/comments", image_id)))
        .await
        .json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], second.to_string());

    let delete = |id: Uuid| {
        app.server
            .delete(&api_path(&format!("/comments/{}", id)))
            .add_header("Authorization", author.bearer())
    };
    // Hidden comments were already taken off the count
    assert_eq!(delete(first).await.status_code(), 204);
    assert_eq!(image(&app, image_id).await["comment_count"], 1);
    assert_eq!(delete(second).await.status_code(), 204);
    assert_eq!(image(&app, image_id).await["comment_count"], 0);
}

#[tokio::test]
async fn only_authors_and_moderators_delete_comments() {
    let app = setup_test_app().await;
    let owner = app.signup(UserRole::User).await;
    let author = app.signup(UserRole::User).await;
    let stranger = app.signup(UserRole::User).await;
    let image_id = app.completed_image(&owner).await;
    let comment_id = comment(&app, &author, image_id, "nice").await;

    let response = app
        .server
        .delete(&api_path(&format!("/comments/{}", comment_id)))
        .add_header("Authorization", stranger.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(image(&app, image_id).await["comment_count"], 1);
}
