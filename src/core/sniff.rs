//! Sniffer output type.

use crate::core::feature::{FeatureValue, PartialRecord};
use serde::{Deserialize, Serialize};

/// Result of the magic-byte sniff over one file.
///
/// Created once per file, immutable, consumed by Aggregator A.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SniffResult {
    /// Family a structural parser exists for, or `"other"`.
    pub format_family: String,
    /// Whether any known signature matched, parser or not.
    pub magic_ok: bool,
    /// Family of the matched signature, or `"unknown"`.
    pub magic_family: String,
    pub size_bytes: u64,
    /// `log10(size_bytes + 1)`, 0.0 for an empty file.
    pub log_size: f64,
}

impl SniffResult {
    /// The five keys Aggregator A consumes, nothing more.
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        out.insert(
            "format_family".into(),
            FeatureValue::Str(self.format_family.clone()),
        );
        out.insert("magic_ok".into(), FeatureValue::Bool(self.magic_ok));
        out.insert(
            "magic_family".into(),
            FeatureValue::Str(self.magic_family.clone()),
        );
        out.insert(
            "size_bytes".into(),
            FeatureValue::Int(self.size_bytes as i64),
        );
        out.insert("log_size".into(), FeatureValue::Float(self.log_size));
        out
    }
}
