mod config;
mod filesystem_access;
mod time_calc;

pub use config::{DetectorConfig, CONFIG_FILE};
pub use filesystem_access::FsAccess;
pub use time_calc::TimeCalc;

pub(crate) const CROSS_MARK: &str = "❌";
