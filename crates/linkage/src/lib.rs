//! `offergrade-linkage` — record linkage and similarity scoring for extracted
//! offer records.
//!
//! Links candidate records to labeled ground-truth records one-to-one
//! (maximum total similarity) and scores every field of every record.
//! Ingestion reads CSV and JSON from strings; file access stays with callers.

pub mod assignment;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod report;
pub mod row;
pub mod select;
pub mod similarity;
pub mod summary;

pub use config::{EvalConfig, ScoringConfig};
pub use engine::{evaluate, run_unit};
pub use error::{ErrorCategory, LinkageError};
pub use model::{Comparison, Evaluation, FieldKind, FieldValue, Linkage, Record, Role, UnitReport};
