//! cryptriage: format-aware feature extraction for encrypted-content
//! triage.
//!
//! Extracts a fixed-schema numeric/boolean feature vector from an
//! arbitrary file: a magic-byte sniffer, defensively-written structural
//! parsers for common container formats, encryption-marker parsers for
//! already-openable containers, a single-pass byte-statistics engine,
//! and a schema-driven aggregation layer producing exactly one record
//! per file.

/// Aggregation stages A (structural), B (encryption), C (statistics)
pub mod aggregate;
/// Directory-level parallel batch driver
pub mod batch;
/// Pipeline configuration
pub mod config;
/// Core data types: feature values, schema, records
pub mod core;
/// Encryption-marker parsers
pub mod enc;
/// Per-file extraction pipeline
pub mod extract;
/// Bounded file access
pub mod io;
/// Tracing setup
pub mod logging;
/// Structural container parsers
pub mod parsers;
/// Static parser registries
pub mod registry;
/// Magic-byte sniffer
pub mod sniff;
/// Byte-statistics engine
pub mod stats;

pub use crate::config::{FeaturizerConfig, SnifferConfig, StatsConfig};
pub use crate::core::errors::ExtractError;
pub use crate::core::feature::{FeatureRecord, FeatureValue};
pub use crate::core::schema::{Column, ColumnType, FeatureSchema, SchemaViolation};
pub use crate::core::sniff::SniffResult;
pub use crate::extract::{extract_features, ExtractContext};
