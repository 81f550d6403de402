//! Generation accounting against Postgres: charges, refunds, quotas and the
//! nuts ledger.
//!
//! Run with: `cargo test -p tempt-api --test generation_test`
//! Requires Docker for testcontainers (Postgres).

mod helpers;

use helpers::api_path;
use helpers::db::setup_test_app;
use serde_json::Value;
use tempt_core::models::UserRole;

#[tokio::test]
async fn failed_generation_is_refunded_once() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;
    assert_eq!(app.balance(user.id).await, 10);

    let task_id = app.queue_image(&user).await;
    assert_eq!(app.balance(user.id).await, 9);
    assert_eq!(app.usage_rows(user.id).await[0].images_generated, 1);

    let first = app.callback(&task_id, "failed").await;
    assert_eq!(first.status_code(), 200);
    let report: Value = first.json();
    assert_eq!(report["status"], "failed");
    assert_eq!(app.balance(user.id).await, 10);

    let repeat = app.callback(&task_id, "failed").await;
    assert_eq!(repeat.status_code(), 200);
    assert_eq!(app.balance(user.id).await, 10);

    let usage = app.usage_rows(user.id).await;
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].images_generated, 0);
    assert_eq!(usage[0].nuts_spent, 0);

    let ledger: Vec<Value> = app
        .server
        .get(&api_path("/me/nuts"))
        .add_header("Authorization", user.bearer())
        .await
        .json();
    let kinds: Vec<&str> = ledger.iter().map(|e| e["kind"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["refund", "generation", "signup_bonus"]);
    let balances: Vec<i64> = ledger
        .iter()
        .map(|e| e["balance_after"].as_i64().unwrap())
        .collect();
    assert_eq!(balances, vec![10, 9, 10]);
}

#[tokio::test]
async fn completed_generation_cannot_fail_afterwards() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;
    let task_id = app.queue_image(&user).await;

    assert_eq!(app.callback(&task_id, "processing").await.status_code(), 200);
    assert_eq!(app.callback(&task_id, "completed").await.status_code(), 200);

    let late = app.callback(&task_id, "failed").await;
    assert_eq!(late.status_code(), 409);
    assert_eq!(app.balance(user.id).await, 9);
}

#[tokio::test]
async fn refund_releases_only_the_period_that_was_charged() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;

    // Charged to the free calendar month
    app.queue_image(&user).await;

    // Upgrading mid-month opens a paid period that overlaps the calendar month
    assert_eq!(app.subscribe(user.id, "pro", "pay_overlap").await.status_code(), 201);
    let paid_task = app.queue_image(&user).await;
    assert_eq!(app.callback(&paid_task, "failed").await.status_code(), 200);

    let usage = app.usage_rows(user.id).await;
    assert_eq!(usage.len(), 2);
    let (calendar, paid) = (&usage[0], &usage[1]);
    assert!(calendar.period_start < paid.period_start);
    assert!(calendar.period_end > paid.period_start);

    assert_eq!(calendar.images_generated, 1);
    assert_eq!(calendar.nuts_spent, 1);
    assert_eq!(paid.images_generated, 0);
    assert_eq!(paid.nuts_spent, 0);
}

#[tokio::test]
async fn period_quota_is_enforced() {
    let app = setup_test_app().await;
    sqlx::query("UPDATE plans SET image_quota = 1 WHERE tier = 'free'")
        .execute(&app.pool)
        .await
        .unwrap();
    let user = app.signup(UserRole::User).await;

    app.queue_image(&user).await;

    let response = app.try_queue_image(&user).await;
    assert_eq!(response.status_code(), 402);
    let body: Value = response.json();
    assert_eq!(body["code"], "USAGE_LIMIT_EXCEEDED");
    assert_eq!(app.balance(user.id).await, 9);
    assert_eq!(app.usage_rows(user.id).await[0].images_generated, 1);
}

#[tokio::test]
async fn empty_balance_is_rejected_without_side_effects() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;
    sqlx::query("UPDATE users SET nuts_balance = 0 WHERE id = $1")
        .bind(user.id)
        .execute(&app.pool)
        .await
        .unwrap();

    let response = app.try_queue_image(&user).await;
    assert_eq!(response.status_code(), 402);
    let body: Value = response.json();
    assert_eq!(body["code"], "INSUFFICIENT_NUTS");

    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE user_id = $1")
        .bind(user.id)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(images, 0);
    assert!(app.usage_rows(user.id).await.is_empty());
}

#[tokio::test]
async fn free_plan_cannot_generate_video() {
    let app = setup_test_app().await;
    let user = app.signup(UserRole::User).await;

    let response = app
        .server
        .post(&api_path("/generations/videos"))
        .add_header("Authorization", user.bearer())
        .json(&serde_json::json!({ "prompt": "waves", "model": "svd" }))
        .await;

    assert_eq!(response.status_code(), 402);
    let body: Value = response.json();
    assert_eq!(body["code"], "SUBSCRIPTION_REQUIRED");
    assert_eq!(app.balance(user.id).await, 10);
}
