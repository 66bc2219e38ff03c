//! Core data types organized by submodule.

pub mod errors;
pub mod feature;
pub mod records;
pub mod schema;
pub mod sniff;

// Re-exports for convenient access under crate::core::*
pub use errors::{ExtractError, ParseError, ParseErrorKind};
pub use feature::{FeatureRecord, FeatureValue, PartialRecord};
pub use records::{
    GzipFeatures, JpegFeatures, Mp4Features, Ole2EncFeatures, Ole2Features, OoxmlFeatures,
    PdfEncFeatures, PdfFeatures, PngFeatures, RarFeatures, ZipEncFeatures, ZipFeatures,
};
pub use schema::{Column, ColumnType, FeatureSchema, SchemaViolation, SectionKind};
pub use sniff::SniffResult;
