//! Utility modules

pub mod logger;
pub mod metrics;

pub use self::logger::init;
pub use self::metrics::init_metrics;
