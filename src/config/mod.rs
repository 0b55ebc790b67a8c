//! Configuration module for Catalog-Harvest
//!
//! Configuration comes from an optional TOML file; every key has a default and
//! command-line flags override whatever the file sets.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Walking {} search pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractConfig, HttpConfig, OutputConfig, RendererKind,
};

pub use parser::{load_config, parse_config};
pub use validation::validate;
