//! Configuration management for qpx
//!
//! Configuration is layered, highest priority first:
//!
//! 1. Environment variables (`QPX_*`, plus `GNUPGHOME` for the keyring directory
//!    and `QPX_TOKEN` for publishing)
//! 2. Global `config.json` in the platform config directory (or `$QPX_HOME`)
//! 3. Built-in defaults
//!
//! # Example
//!
//! ```rust,no_run
//! use qpx_pm::config::Config;
//! use std::path::Path;
//!
//! let config = Config::build(Some(Path::new("/path/to/project")), true).unwrap();
//!
//! println!("Vendor dir: {:?}", config.get_vendor_dir());
//! println!("Process timeout: {}", config.process_timeout);
//! ```

mod config;
mod source;

pub use config::Config;
pub use source::{ConfigLoader, ConfigSource, RawConfig};
