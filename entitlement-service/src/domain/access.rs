//! Route access decisions for the protected application shell.

use serde::Serialize;

/// Routes reachable while the subscription is inactive, so a blocked
/// merchant can still manage their account and pay.
pub const ROUTES_ALLOWED_WITHOUT_SUBSCRIPTION: &[&str] = &["/subscription", "/settings"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    RedirectToAuth,
    RedirectToSubscription,
}

/// Decide whether a navigation to `route` may proceed. Evaluated fresh on
/// every request; decisions are never cached.
pub fn decide(
    authenticated: bool,
    has_business: bool,
    is_active: bool,
    route: &str,
) -> AccessDecision {
    if !authenticated {
        return AccessDecision::RedirectToAuth;
    }
    // A user without a business record is mid-onboarding, not blocked.
    if !has_business {
        return AccessDecision::Allow;
    }
    if !is_active && !ROUTES_ALLOWED_WITHOUT_SUBSCRIPTION.contains(&route) {
        return AccessDecision::RedirectToSubscription;
    }
    AccessDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_always_redirects_to_auth() {
        for route in ["/", "/products", "/subscription"] {
            assert_eq!(
                decide(false, false, false, route),
                AccessDecision::RedirectToAuth
            );
        }
    }

    #[test]
    fn user_without_business_passes_through() {
        assert_eq!(decide(true, false, false, "/products"), AccessDecision::Allow);
    }

    #[test]
    fn inactive_subscription_blocks_protected_routes() {
        assert_eq!(
            decide(true, true, false, "/products"),
            AccessDecision::RedirectToSubscription
        );
        assert_eq!(
            decide(true, true, false, "/sales"),
            AccessDecision::RedirectToSubscription
        );
    }

    #[test]
    fn inactive_subscription_still_reaches_allowed_routes() {
        assert_eq!(
            decide(true, true, false, "/subscription"),
            AccessDecision::Allow
        );
        assert_eq!(decide(true, true, false, "/settings"), AccessDecision::Allow);
    }

    #[test]
    fn active_subscription_goes_anywhere() {
        for route in ["/", "/products", "/sales", "/settings"] {
            assert_eq!(decide(true, true, true, route), AccessDecision::Allow);
        }
    }
}
