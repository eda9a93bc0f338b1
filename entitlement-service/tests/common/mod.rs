//! Test helper module for entitlement-service integration tests.
//!
//! Provides common setup utilities for PostgreSQL-based tests. Tests are
//! skipped when TEST_DATABASE_URL is unset so the suite runs without a
//! database server.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use entitlement_service::config::{
    AdminConfig, AuthConfig, Config, DatabaseConfig, KartapayConfig, ServerConfig,
};
use entitlement_service::models::SubscriptionStatus;
use entitlement_service::services::{init_metrics, Database};
use entitlement_service::startup::Application;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret";
pub const TEST_ADMIN_API_KEY: &str = "test-admin-key";

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Get the database URL for testing from the environment, if set.
pub fn get_test_database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL").ok()
}

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_entitlement_{}_{}", std::process::id(), counter)
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub client: reqwest::Client,
    schema_name: String,
}

impl TestApp {
    /// Spawn a test application on a random port, or None when no test
    /// database is configured.
    pub async fn try_spawn() -> Option<Self> {
        init_metrics();

        let base_url = get_test_database_url()?;
        let schema_name = unique_schema_name();

        // Create schema for test isolation
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");

        pool.close().await;

        // Use ? or & depending on whether URL already has query parameters
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new(db_url_with_schema.clone()),
                max_connections: 5,
                min_connections: 1,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()),
            },
            admin: AdminConfig {
                api_key: Secret::new(TEST_ADMIN_API_KEY.to_string()),
            },
            kartapay: KartapayConfig {
                // Not configured: checkout endpoints respond with an error
                // instead of calling out.
                client_id: String::new(),
                client_secret: Secret::new(String::new()),
                merchant_id: String::new(),
                auth_url: "https://auth.kartapay.test/token".to_string(),
                api_base_url: "https://api.kartapay.test/v1".to_string(),
                webhook_secret: None,
                frontend_base_url: "http://localhost:5173".to_string(),
                webhook_base_url: "http://localhost:0".to_string(),
            },
            service_name: "entitlement-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = Database::new(&db_url_with_schema, 5, 1)
            .await
            .expect("Failed to create test database handle");

        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("http://127.0.0.1:{}/health", port);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Some(TestApp {
            address,
            port,
            db,
            client,
            schema_name,
        })
    }

    /// Mint a bearer token for a user id, signed with the test secret.
    pub fn bearer_token(&self, user_id: Uuid) -> String {
        #[derive(Serialize)]
        struct Claims {
            sub: String,
            exp: i64,
        }

        let claims = Claims {
            sub: user_id.to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("Failed to mint test token")
    }

    /// Insert a business owned by a user and return its id.
    pub async fn seed_business(&self, user_id: Uuid) -> Uuid {
        let business_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO businesses (id, user_id, name) VALUES ($1, $2, 'Test Business')",
        )
        .bind(business_id)
        .bind(user_id)
        .execute(self.db.pool())
        .await
        .expect("Failed to seed business");
        business_id
    }

    /// Insert a subscription row and return its id.
    pub async fn seed_subscription(
        &self,
        business_id: Uuid,
        status: SubscriptionStatus,
        expires_at: Option<DateTime<Utc>>,
        trial_ends_at: Option<DateTime<Utc>>,
    ) -> Uuid {
        let subscription_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, business_id, plan_id, status, amount, currency, expires_at, trial_ends_at)
            VALUES ($1, $2, 'trial', $3, 0, 'XOF', $4, $5)
            "#,
        )
        .bind(subscription_id)
        .bind(business_id)
        .bind(status.as_str())
        .bind(expires_at)
        .bind(trial_ends_at)
        .execute(self.db.pool())
        .await
        .expect("Failed to seed subscription");
        subscription_id
    }

    /// Insert an unused activation code and return the code string.
    pub async fn seed_code(&self, code: &str, expires_at: Option<DateTime<Utc>>) {
        sqlx::query(
            r#"
            INSERT INTO activation_codes (id, code, amount, duration_months, expires_at)
            VALUES ($1, $2, 10000, 12, $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(expires_at)
        .execute(self.db.pool())
        .await
        .expect("Failed to seed activation code");
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(&self) {
        if let Some(base_url) = get_test_database_url() {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(1)
                .connect(&base_url)
                .await
                .ok();

            if let Some(pool) = pool {
                let _ = sqlx::query(&format!(
                    "DROP SCHEMA IF EXISTS {} CASCADE",
                    self.schema_name
                ))
                .execute(&pool)
                .await;
                pool.close().await;
            }
        }
    }
}
