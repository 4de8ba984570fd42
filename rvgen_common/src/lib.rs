//! rvgen Common Library
//!
//! Shared constants, configuration loading and hardware capability traits
//! for the rvgen workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide defaults and limits
//! - [`hal`] - Hardware capability traits, HAL configuration and sensor math
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust,no_run
//! use rvgen_common::config::ConfigLoader;
//! use rvgen_common::hal::config::GeneratorConfig;
//! use std::path::Path;
//!
//! let config = GeneratorConfig::load(Path::new("/etc/rvgen/rvgen.toml"));
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
