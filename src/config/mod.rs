//! Configuration loading and validation
//!
//! Configuration is a TOML file describing scraper behavior, storage
//! locations and quotas, and the set of scrape jobs to register at startup.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, JobEntry, ScraperConfig, StorageConfig};
pub use validation::validate;
