//! Expiry arithmetic for activation-code redemption.

use chrono::{DateTime, Months, Utc};

use crate::models::{Subscription, SubscriptionStatus};

/// A redeemed code grants one calendar year on top of whatever entitlement
/// time the business still has. Calendar semantics, so Feb 29 bases land on
/// Feb 28 in non-leap years.
pub fn renewal_expiry(subscription: &Subscription, now: DateTime<Utc>) -> DateTime<Utc> {
    let base = extension_base(subscription, now);
    base.checked_add_months(Months::new(12)).unwrap_or(base)
}

/// Remaining paid time stacks and unused trial days are preserved, never
/// discarded. Anything else extends from now.
pub fn extension_base(subscription: &Subscription, now: DateTime<Utc>) -> DateTime<Utc> {
    match subscription.status() {
        SubscriptionStatus::Active => match subscription.expires_at {
            Some(expires_at) if expires_at > now => expires_at,
            _ => now,
        },
        SubscriptionStatus::Trial => match subscription.trial_ends_at {
            Some(trial_ends_at) if trial_ends_at > now => trial_ends_at,
            _ => now,
        },
        _ => now,
    }
}
