//! Catalog pipeline core for Operator Catalog Sync.
//!
//! One normalized stage per module, run in sequence for every fetched
//! operator repository:
//!
//! 1. [`extract`] — locate and parse `catalog_def*.json` files.
//! 2. [`normalize`] — apply defaults against an explicit [`FamilyRegistry`].
//! 3. [`generate`] — turn a normalized definition into an ordered batch of
//!    parameterized statements.
//! 4. [`load`] — execute batches against the relational catalog store
//!    (behind the default-on `storage` feature).
//!
//! Per-file and per-repository failures are reported, never swallowed:
//! [`report`] carries the run-level aggregation.
//!
//! [`FamilyRegistry`]: opcat_common::FamilyRegistry

#![forbid(unsafe_code)]

pub mod definition;
pub mod extract;
pub mod generate;
#[cfg(feature = "storage")]
pub mod load;
pub mod normalize;
pub mod report;

pub use definition::{CatalogDefinition, DefinitionError, ProfileItem};
pub use extract::{Extraction, SkippedFile, extract_catalogs};
pub use generate::{GeneratorConfig, SqlValue, Statement, generate};
#[cfg(feature = "storage")]
pub use load::{CatalogStore, StoreError};
pub use normalize::normalize;
pub use report::{OperatorOutcome, OperatorReport, RunReport};
