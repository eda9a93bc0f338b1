//! Subscription model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Plan applied when an activation code is redeemed.
pub const ANNUAL_PLAN_ID: &str = "annual";
/// Fixed price of the annual plan, in whole currency units.
pub const ANNUAL_PLAN_AMOUNT: i64 = 5000;
pub const ANNUAL_PLAN_CURRENCY: &str = "KMF";

/// Currency used for provider checkout payments.
pub const CHECKOUT_CURRENCY: &str = "XOF";

/// Subscription status. The string values are part of the observable
/// contract; other systems match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Pending,
    Failed,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Failed => "failed",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Unknown strings fall back to `Expired`, the entitlement-safe default.
    pub fn from_string(s: &str) -> Self {
        match s {
            "trial" => SubscriptionStatus::Trial,
            "active" => SubscriptionStatus::Active,
            "pending" => SubscriptionStatus::Pending,
            "failed" => SubscriptionStatus::Failed,
            "cancelled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::Expired,
        }
    }
}

/// One entitlement period for a business. The current row for a business is
/// the most recent one by `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub business_id: Uuid,
    pub plan_id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub started_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    /// Legacy direct-reference field kept for compatibility with existing
    /// rows; redemption records the consumed code here.
    pub activation_code: Option<String>,
    pub provider_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_string(&self.status)
    }
}

/// Input for creating a pending subscription during checkout.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub business_id: Uuid,
    pub plan_id: String,
    pub amount: i64,
    pub currency: String,
}
