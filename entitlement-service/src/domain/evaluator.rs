//! Subscription state evaluation.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Subscription, SubscriptionStatus};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Entitlement state derived from a subscription row at a point in time.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EntitlementSnapshot {
    pub is_active: bool,
    pub is_trial_expired: bool,
    pub trial_days_remaining: i64,
}

pub fn evaluate(subscription: Option<&Subscription>, now: DateTime<Utc>) -> EntitlementSnapshot {
    EntitlementSnapshot {
        is_active: is_active(subscription, now),
        is_trial_expired: is_trial_expired(subscription, now),
        trial_days_remaining: trial_days_remaining(subscription, now),
    }
}

/// A subscription grants access when it is `active` and not past its expiry,
/// or when it is a `trial` that has not run out. An `active` row with no
/// expiry date is a lifetime grant and stays active forever; this is
/// intentional.
pub fn is_active(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    let Some(sub) = subscription else {
        return false;
    };
    match sub.status() {
        SubscriptionStatus::Active => match sub.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        },
        SubscriptionStatus::Trial => !is_trial_expired(subscription, now),
        _ => false,
    }
}

/// No subscription counts as an expired trial, as does a trial row without
/// a `trial_ends_at` date.
pub fn is_trial_expired(subscription: Option<&Subscription>, now: DateTime<Utc>) -> bool {
    let Some(sub) = subscription else {
        return true;
    };
    if sub.status() == SubscriptionStatus::Active {
        return false;
    }
    match sub.trial_ends_at {
        Some(trial_ends_at) => trial_ends_at < now,
        None => true,
    }
}

/// Whole days left on the trial, rounded up, never negative.
pub fn trial_days_remaining(subscription: Option<&Subscription>, now: DateTime<Utc>) -> i64 {
    let Some(trial_ends_at) = subscription.and_then(|s| s.trial_ends_at) else {
        return 0;
    };
    let millis = (trial_ends_at - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn subscription(status: &str) -> Subscription {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Subscription {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            plan_id: "annual".to_string(),
            status: status.to_string(),
            amount: 5000,
            currency: "KMF".to_string(),
            started_at: None,
            expires_at: None,
            trial_ends_at: None,
            activation_code: None,
            provider_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn active_without_expiry_is_a_lifetime_grant() {
        let sub = subscription("active");
        assert!(is_active(Some(&sub), t0()));
        // Remains active arbitrarily far in the future.
        assert!(is_active(Some(&sub), t0() + Duration::days(36500)));
    }

    #[test]
    fn active_with_future_expiry_is_active() {
        let mut sub = subscription("active");
        sub.expires_at = Some(t0() + Duration::days(40));
        assert!(is_active(Some(&sub), t0()));
    }

    #[test]
    fn active_with_past_expiry_is_not_active() {
        let mut sub = subscription("active");
        sub.expires_at = Some(t0() - Duration::hours(1));
        assert!(!is_active(Some(&sub), t0()));
    }

    #[test]
    fn trial_activity_mirrors_trial_expiry() {
        let mut sub = subscription("trial");
        sub.trial_ends_at = Some(t0() + Duration::days(5));
        for offset in [0, 3, 5, 6, 30] {
            let now = t0() + Duration::days(offset);
            assert_eq!(
                is_active(Some(&sub), now),
                !is_trial_expired(Some(&sub), now),
                "offset {} days",
                offset
            );
        }
    }

    #[test]
    fn missing_subscription_counts_as_expired_trial() {
        assert!(is_trial_expired(None, t0()));
        assert!(!is_active(None, t0()));
        assert_eq!(trial_days_remaining(None, t0()), 0);
    }

    #[test]
    fn trial_without_end_date_counts_as_expired() {
        let sub = subscription("trial");
        assert!(is_trial_expired(Some(&sub), t0()));
        assert!(!is_active(Some(&sub), t0()));
    }

    #[test]
    fn active_status_is_never_trial_expired() {
        let sub = subscription("active");
        assert!(!is_trial_expired(Some(&sub), t0()));
    }

    #[test]
    fn trial_days_remaining_counts_down_to_zero() {
        let mut sub = subscription("trial");
        sub.trial_ends_at = Some(t0() + Duration::days(5));

        assert_eq!(trial_days_remaining(Some(&sub), t0()), 5);

        let later = t0() + Duration::days(6);
        assert_eq!(trial_days_remaining(Some(&sub), later), 0);
        assert!(is_trial_expired(Some(&sub), later));
    }

    #[test]
    fn partial_days_round_up() {
        let mut sub = subscription("trial");
        sub.trial_ends_at = Some(t0() + Duration::days(2) + Duration::hours(1));
        assert_eq!(trial_days_remaining(Some(&sub), t0()), 3);
    }

    #[test]
    fn pending_and_failed_grant_nothing() {
        for status in ["pending", "failed", "cancelled", "expired"] {
            let sub = subscription(status);
            assert!(!is_active(Some(&sub), t0()), "status {}", status);
        }
    }

    #[test]
    fn snapshot_bundles_all_three_values() {
        let mut sub = subscription("trial");
        sub.trial_ends_at = Some(t0() + Duration::days(10));
        let snapshot = evaluate(Some(&sub), t0());
        assert!(snapshot.is_active);
        assert!(!snapshot.is_trial_expired);
        assert_eq!(snapshot.trial_days_remaining, 10);
    }
}
