//! Database service for entitlement-service.

use crate::models::{
    ActivationCode, Business, CreateSubscription, Subscription, SubscriptionStatus,
    ANNUAL_PLAN_AMOUNT, ANNUAL_PLAN_CURRENCY, ANNUAL_PLAN_ID,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const SUBSCRIPTION_COLUMNS: &str = "id, business_id, plan_id, status, amount, currency, started_at, expires_at, trial_ends_at, activation_code, provider_transaction_id, created_at, updated_at";
const CODE_COLUMNS: &str =
    "id, code, is_used, used_by_business_id, used_at, amount, duration_months, expires_at, created_at";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "entitlement-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["health_check"])
            .start_timer();

        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;

        timer.observe_duration();
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Get the business owned by a user, if any.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_business_by_user(&self, user_id: Uuid) -> Result<Option<Business>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_business_by_user"])
            .start_timer();

        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT id, user_id, name, phone, address, created_at, updated_at
            FROM businesses
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get business: {}", e)))?;

        timer.observe_duration();

        Ok(business)
    }

    /// Get a business by ID.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn get_business(&self, business_id: Uuid) -> Result<Option<Business>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_business"])
            .start_timer();

        let business = sqlx::query_as::<_, Business>(
            r#"
            SELECT id, user_id, name, phone, address, created_at, updated_at
            FROM businesses
            WHERE id = $1
            "#,
        )
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get business: {}", e)))?;

        timer.observe_duration();

        Ok(business)
    }

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Get the current subscription for a business: the most recent row by
    /// creation time. Historical rows are kept but never authoritative.
    #[instrument(skip(self), fields(business_id = %business_id))]
    pub async fn latest_subscription(
        &self,
        business_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["latest_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE business_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    /// Get a subscription by ID.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn get_subscription(
        &self,
        subscription_id: Uuid,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_subscription"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS}
            FROM subscriptions
            WHERE id = $1
            "#,
        ))
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get subscription: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    /// Create a pending subscription row for a checkout.
    #[instrument(skip(self, input), fields(business_id = %input.business_id))]
    pub async fn create_pending_subscription(
        &self,
        input: &CreateSubscription,
    ) -> Result<Subscription, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_pending_subscription"])
            .start_timer();

        let subscription_id = Uuid::new_v4();
        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            INSERT INTO subscriptions (id, business_id, plan_id, status, amount, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(subscription_id)
        .bind(input.business_id)
        .bind(&input.plan_id)
        .bind(SubscriptionStatus::Pending.as_str())
        .bind(input.amount)
        .bind(&input.currency)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create subscription: {}", e))
        })?;

        timer.observe_duration();
        info!(subscription_id = %subscription.id, "Pending subscription created");

        Ok(subscription)
    }

    /// Record the provider transaction id returned at checkout.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn set_provider_transaction_id(
        &self,
        subscription_id: Uuid,
        transaction_id: &str,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["set_provider_transaction_id"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET provider_transaction_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(transaction_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to set transaction id: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    /// Mark a subscription failed after a provider error during checkout.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn mark_subscription_failed(&self, subscription_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["mark_subscription_failed"])
            .start_timer();

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(subscription_id)
        .bind(SubscriptionStatus::Failed.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to mark subscription failed: {}", e))
        })?;

        timer.observe_duration();

        Ok(())
    }

    /// Apply a webhook reconciliation to a subscription row. The transaction
    /// id is preserved when the payload carried none.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn apply_webhook_update(
        &self,
        subscription_id: Uuid,
        status: SubscriptionStatus,
        started_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
        transaction_id: Option<&str>,
    ) -> Result<Option<Subscription>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["apply_webhook_update"])
            .start_timer();

        let subscription = sqlx::query_as::<_, Subscription>(&format!(
            r#"
            UPDATE subscriptions
            SET status = $2,
                started_at = COALESCE($3, started_at),
                expires_at = COALESCE($4, expires_at),
                provider_transaction_id = COALESCE($5, provider_transaction_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SUBSCRIPTION_COLUMNS}
            "#,
        ))
        .bind(subscription_id)
        .bind(status.as_str())
        .bind(started_at)
        .bind(expires_at)
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to apply webhook update: {}", e))
        })?;

        timer.observe_duration();

        Ok(subscription)
    }

    // =========================================================================
    // Activation Code Operations
    // =========================================================================

    /// Look up an unused activation code by exact match.
    #[instrument(skip(self, code))]
    pub async fn find_unused_code(&self, code: &str) -> Result<Option<ActivationCode>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_unused_code"])
            .start_timer();

        let activation_code = sqlx::query_as::<_, ActivationCode>(&format!(
            r#"
            SELECT {CODE_COLUMNS}
            FROM activation_codes
            WHERE code = $1 AND is_used = FALSE
            "#,
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to look up activation code: {}", e))
        })?;

        timer.observe_duration();

        Ok(activation_code)
    }

    /// Consume an activation code and activate the subscription as one unit.
    ///
    /// Both writes run inside a single transaction so a failure of either
    /// leaves no visible state change. The code update is guarded by
    /// `is_used = FALSE`, which makes it the double-spend barrier: a
    /// concurrent redemption of the same code loses the race and rolls back.
    #[instrument(skip(self, code), fields(code_id = %code.id, subscription_id = %subscription.id, business_id = %business_id))]
    pub async fn redeem_code(
        &self,
        code: &ActivationCode,
        subscription: &Subscription,
        business_id: Uuid,
        now: DateTime<Utc>,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["redeem_code"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let consumed = sqlx::query(
            r#"
            UPDATE activation_codes
            SET is_used = TRUE, used_by_business_id = $2, used_at = $3
            WHERE id = $1 AND is_used = FALSE
            "#,
        )
        .bind(code.id)
        .bind(business_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to consume activation code: {}", e))
        })?;

        if consumed.rows_affected() == 0 {
            // Lost a race: someone consumed the code between lookup and here.
            tx.rollback().await.ok();
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid activation code"
            )));
        }

        // Optimistic check on updated_at: the expiry stacking in the handler
        // was computed from this exact row, so a concurrent write (e.g. a
        // webhook landing mid-redemption) invalidates it.
        let updated = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, plan_id = $3, amount = $4, currency = $5,
                started_at = $6, expires_at = $7, activation_code = $8,
                updated_at = NOW()
            WHERE id = $1 AND updated_at = $9
            "#,
        )
        .bind(subscription.id)
        .bind(SubscriptionStatus::Active.as_str())
        .bind(ANNUAL_PLAN_ID)
        .bind(ANNUAL_PLAN_AMOUNT)
        .bind(ANNUAL_PLAN_CURRENCY)
        .bind(now)
        .bind(new_expires_at)
        .bind(&code.code)
        .bind(subscription.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to activate subscription: {}", e))
        })?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.ok();
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Subscription was modified concurrently, please retry"
            )));
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit redemption: {}", e))
        })?;

        timer.observe_duration();
        info!(
            subscription_id = %subscription.id,
            expires_at = %new_expires_at,
            "Activation code redeemed"
        );

        Ok(())
    }

    /// Create a new activation code.
    #[instrument(skip(self, code))]
    pub async fn create_activation_code(
        &self,
        code: &str,
        amount: i64,
        duration_months: i32,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<ActivationCode, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_activation_code"])
            .start_timer();

        let code_id = Uuid::new_v4();
        let activation_code = sqlx::query_as::<_, ActivationCode>(&format!(
            r#"
            INSERT INTO activation_codes (id, code, amount, duration_months, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CODE_COLUMNS}
            "#,
        ))
        .bind(code_id)
        .bind(code)
        .bind(amount)
        .bind(duration_months)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Activation code collision"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!(
                "Failed to create activation code: {}",
                e
            )),
        })?;

        timer.observe_duration();
        info!(code_id = %activation_code.id, "Activation code created");

        Ok(activation_code)
    }

    /// List activation codes, newest first.
    #[instrument(skip(self))]
    pub async fn list_activation_codes(&self) -> Result<Vec<ActivationCode>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_activation_codes"])
            .start_timer();

        let codes = sqlx::query_as::<_, ActivationCode>(&format!(
            r#"
            SELECT {CODE_COLUMNS}
            FROM activation_codes
            ORDER BY created_at DESC
            "#,
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list activation codes: {}", e))
        })?;

        timer.observe_duration();

        Ok(codes)
    }

    /// Delete an activation code. Returns false when no row matched.
    #[instrument(skip(self), fields(code_id = %code_id))]
    pub async fn delete_activation_code(&self, code_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_activation_code"])
            .start_timer();

        let result = sqlx::query("DELETE FROM activation_codes WHERE id = $1")
            .bind(code_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete activation code: {}", e))
            })?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}
