pub mod defaults;
pub mod paths;
pub mod service;

pub use paths::AppPaths;
pub use service::{config_str, config_usize, ConfigService};
