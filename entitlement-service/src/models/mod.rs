pub mod activation_code;
pub mod business;
pub mod subscription;

pub use activation_code::{ActivationCode, CodePlan};
pub use business::Business;
pub use subscription::{
    CreateSubscription, Subscription, SubscriptionStatus, ANNUAL_PLAN_AMOUNT,
    ANNUAL_PLAN_CURRENCY, ANNUAL_PLAN_ID, CHECKOUT_CURRENCY,
};
