//! Pure entitlement logic. Nothing in this module performs I/O; every
//! function takes the subscription row and the current time as explicit
//! parameters so results are reproducible and testable.

pub mod access;
pub mod code;
pub mod evaluator;
pub mod reconcile;
pub mod renewal;
