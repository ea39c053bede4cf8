//! Shared types and utilities for Operator Catalog Sync.
//!
//! This crate carries everything the pipeline stages have in common:
//! operator source records, the family registry, the versions manifest
//! model, layered TOML configuration, and logging/test-logging setup.

#![forbid(unsafe_code)]

pub mod config;
pub mod logging;
pub mod testing;
pub mod types;

pub use config::{CatalogConfig, ConfigError, FetchConfig, GeneralConfig, OpcatConfig};
pub use logging::{LogConfig, init_logging};
pub use types::{Family, FamilyRegistry, ManifestEntry, OperatorName, OperatorSource};
