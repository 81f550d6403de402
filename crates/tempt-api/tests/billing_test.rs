//! Subscriptions, plan grants and the expiry sweep against Postgres.
//!
//! Run with: `cargo test -p tempt-api --test billing_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use chrono::Utc;
use helpers::api_path;
use helpers::db::{setup_test_app, TestApp, TestUser};
use serde_json::Value;
use tempt_core::models::UserRole;
use tempt_db::SubscriptionRepository;

async fn overview(app: &TestApp, user: &TestUser) -> Value {
    let response = app
        .server
        .get(&api_path("/me/subscription"))
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    response.json()
}

#[tokio::test]
async fn new_payment_replaces_subscription_and_grants_nuts() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;

    let basic = app.subscribe(user.id, "basic", "pay_1").await;
    assert_eq!(basic.status_code(), 201);
    let body: Value = basic.json();
    assert_eq!(body["effective_plan"], "basic");
    assert_eq!(body["nuts_balance"], 210);

    let upgrade = app.subscribe(user.id, "pro", "pay_2").await;
    assert_eq!(upgrade.status_code(), 201);

    let current = overview(&app, &user).await;
    assert_eq!(current["effective_plan"], "pro");
    assert_eq!(current["subscription"]["plan"], "pro");
    assert_eq!(current["nuts_balance"], 1010);
    assert!(current["features"]
        .as_array()
        .unwrap()
        .iter()
        .any(|f| f == "video_generation"));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn replayed_payment_is_a_conflict() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;

    assert_eq!(app.subscribe(user.id, "basic", "pay_1").await.status_code(), 201);
    let replay = app.subscribe(user.id, "basic", "pay_1").await;
    assert_eq!(replay.status_code(), 409);
    assert_eq!(app.balance(user.id).await, 210);

    // A reference belongs to one account
    let other = app.signup(UserRole::User).await;
    assert_eq!(app.subscribe(other.id, "basic", "pay_1").await.status_code(), 409);
    assert_eq!(app.balance(other.id).await, 10);
}

#[tokio::test]
async fn free_plan_cannot_be_purchased() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;

    assert_eq!(app.subscribe(user.id, "free", "pay_free").await.status_code(), 400);
}

#[tokio::test]
async fn canceled_subscription_keeps_plan_until_period_end() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;
    app.subscribe(user.id, "pro", "pay_1").await;

    let response = app
        .server
        .post(&api_path("/subscriptions/cancel"))
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 200);

    let current = overview(&app, &user).await;
    assert_eq!(current["subscription"]["status"], "canceled");
    assert_eq!(current["effective_plan"], "pro");
}

#[tokio::test]
async fn sweep_expires_lapsed_subscriptions() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;
    app.subscribe(user.id, "pro", "pay_1").await;

    sqlx::query(
        "UPDATE subscriptions SET current_period_start = NOW() - INTERVAL '31 days', \
         current_period_end = NOW() - INTERVAL '1 hour' WHERE user_id = $1",
    )
    .bind(user.id)
    .execute(&app.pool)
    .await
    .unwrap();

    // Still active in storage until the sweep runs
    assert_eq!(overview(&app, &user).await["effective_plan"], "pro");

    let repository = SubscriptionRepository::new(app.pool.clone());
    assert_eq!(repository.expire_lapsed(Utc::now()).await.unwrap(), 1);
    assert_eq!(repository.expire_lapsed(Utc::now()).await.unwrap(), 0);

    let current = overview(&app, &user).await;
    assert_eq!(current["subscription"]["status"], "expired");
    assert_eq!(current["effective_plan"], "free");
}
