//! Activation code (single-use voucher) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single-use voucher. `is_used` is a one-way transition; a consumed code
/// is never redeemable again.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivationCode {
    pub id: Uuid,
    pub code: String,
    pub is_used: bool,
    pub used_by_business_id: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
    pub amount: i64,
    pub duration_months: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Voucher plan sold by the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePlan {
    Monthly,
    Annual,
}

impl CodePlan {
    pub fn amount(&self) -> i64 {
        match self {
            CodePlan::Monthly => 1000,
            CodePlan::Annual => 10000,
        }
    }

    pub fn duration_months(&self) -> i32 {
        match self {
            CodePlan::Monthly => 1,
            CodePlan::Annual => 12,
        }
    }
}
