pub mod database;
pub mod kartapay;
pub mod metrics;

pub use database::Database;
pub use kartapay::KartapayClient;
pub use metrics::{get_metrics, init_metrics};
