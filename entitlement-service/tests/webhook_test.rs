//! Payment webhook reconciliation integration tests.

mod common;

use chrono::{Duration, Utc};
use entitlement_service::models::SubscriptionStatus;
use serde_json::json;
use uuid::Uuid;

async fn post_webhook(
    app: &common::TestApp,
    payload: serde_json::Value,
) -> reqwest::Response {
    app.client
        .post(&format!("{}/webhooks/kartapay", app.address))
        .header("content-type", "application/json")
        .body(payload.to_string())
        .send()
        .await
        .expect("Failed to execute request")
}

#[tokio::test]
async fn success_status_activates_for_thirty_days() {
    let Some(app) = common::TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let business_id = app.seed_business(Uuid::new_v4()).await;
    let subscription_id = app
        .seed_subscription(business_id, SubscriptionStatus::Pending, None, None)
        .await;

    let before = Utc::now();
    let response = post_webhook(
        &app,
        json!({
            "reference": subscription_id.to_string(),
            "transaction_id": "txn_123",
            "status": "success",
            "amount": 1000,
            "currency": "XOF",
        }),
    )
    .await;

    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "active");

    let subscription = app
        .db
        .get_subscription(subscription_id)
        .await
        .expect("query failed")
        .expect("subscription missing");
    assert_eq!(subscription.status(), SubscriptionStatus::Active);
    assert_eq!(
        subscription.provider_transaction_id.as_deref(),
        Some("txn_123")
    );
    let expires_at = subscription.expires_at.expect("expires_at not set");
    assert!(expires_at >= before + Duration::days(29));
    assert!(expires_at <= Utc::now() + Duration::days(31));

    app.cleanup().await;
}

#[tokio::test]
async fn terminal_statuses_map_to_the_contract_vocabulary() {
    let Some(app) = common::TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    for (provider_status, expected) in [
        ("declined", SubscriptionStatus::Failed),
        ("canceled", SubscriptionStatus::Cancelled),
        ("pending", SubscriptionStatus::Pending),
    ] {
        let business_id = app.seed_business(Uuid::new_v4()).await;
        let subscription_id = app
            .seed_subscription(business_id, SubscriptionStatus::Pending, None, None)
            .await;

        let response = post_webhook(
            &app,
            json!({
                "reference": subscription_id.to_string(),
                "status": provider_status,
            }),
        )
        .await;
        assert!(response.status().is_success(), "status {}", provider_status);

        let subscription = app
            .db
            .get_subscription(subscription_id)
            .await
            .expect("query failed")
            .expect("subscription missing");
        assert_eq!(subscription.status(), expected, "status {}", provider_status);
        // Only an activation touches the expiry.
        assert!(subscription.expires_at.is_none());
    }

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_status_keeps_the_current_state() {
    let Some(app) = common::TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let business_id = app.seed_business(Uuid::new_v4()).await;
    let subscription_id = app
        .seed_subscription(business_id, SubscriptionStatus::Pending, None, None)
        .await;

    let response = post_webhook(
        &app,
        json!({
            "reference": subscription_id.to_string(),
            "status": "mystery_state",
        }),
    )
    .await;
    assert!(response.status().is_success());

    let subscription = app
        .db
        .get_subscription(subscription_id)
        .await
        .expect("query failed")
        .expect("subscription missing");
    assert_eq!(subscription.status(), SubscriptionStatus::Pending);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_reference_is_rejected() {
    let Some(app) = common::TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let response = post_webhook(&app, json!({ "status": "success" })).await;
    assert_eq!(response.status().as_u16(), 400);

    let response = post_webhook(&app, json!({ "reference": "", "status": "success" })).await;
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_reference_is_not_found() {
    let Some(app) = common::TestApp::try_spawn().await else {
        eprintln!("TEST_DATABASE_URL not set; skipping");
        return;
    };

    let response = post_webhook(
        &app,
        json!({
            "reference": Uuid::new_v4().to_string(),
            "status": "success",
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);

    // A reference that is not a UUID cannot match any subscription.
    let response = post_webhook(
        &app,
        json!({
            "reference": "not-a-uuid",
            "status": "success",
        }),
    )
    .await;
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}
