//! Provider status vocabulary mapping for webhook reconciliation.

use crate::models::SubscriptionStatus;

/// Entitlement window granted when a payment webhook reports success.
/// Deliberately distinct from the one-year activation-code window; the two
/// monetization paths carry their own durations.
pub const WEBHOOK_ACTIVATION_DAYS: i64 = 30;

/// What a provider status string means for the subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Payment succeeded: activate and open a fresh 30-day window.
    Activate,
    /// Move to the given terminal or intermediate status.
    Set(SubscriptionStatus),
    /// Unrecognized vocabulary: keep the current status. Providers evolve
    /// their status strings, so unknown values fail open.
    Keep,
}

pub fn map_provider_status(status: Option<&str>) -> StatusAction {
    let Some(status) = status else {
        return StatusAction::Keep;
    };
    match status.to_ascii_lowercase().as_str() {
        "success" | "completed" | "paid" => StatusAction::Activate,
        "failed" | "declined" | "error" => StatusAction::Set(SubscriptionStatus::Failed),
        "cancelled" | "canceled" => StatusAction::Set(SubscriptionStatus::Cancelled),
        "pending" => StatusAction::Set(SubscriptionStatus::Pending),
        _ => StatusAction::Keep,
    }
}
