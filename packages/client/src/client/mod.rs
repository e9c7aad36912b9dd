//! Client facade and its statistics

pub mod core;
pub mod stats;

pub use self::core::HttpClient;
pub use stats::{ClientStats, ClientStatsSnapshot};
