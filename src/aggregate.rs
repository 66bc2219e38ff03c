//! The three aggregation stages, as pure functions over
//! `(schema, inputs)`.
//!
//! Aggregator A merges sniffer output with the structural record and
//! null-fills the structural schema columns; Aggregator B overlays one
//! `<family>_enc` section; Aggregator C overlays the byte-statistics
//! metrics the schema declares.

use crate::config::StatsConfig;
use crate::core::feature::{FeatureValue, PartialRecord};
use crate::core::schema::FeatureSchema;
use crate::core::sniff::SniffResult;
use crate::stats;
use std::path::Path;
use tracing::warn;

/// Merge sniffer output (its five keys only) with the structural
/// parser's record, then null-fill every structural schema column.
///
/// `parser_feats = None` means the registry had no parser for the
/// family; `parser_ok`/`structure_consistent` become null, not false.
pub fn aggregate_a(
    schema: &FeatureSchema,
    sniff: &SniffResult,
    parser_feats: Option<PartialRecord>,
) -> PartialRecord {
    let mut merged = sniff.emit();

    let mut parser_feats = parser_feats.unwrap_or_default();
    parser_feats
        .entry("parser_ok".to_string())
        .or_insert(FeatureValue::Null);
    parser_feats
        .entry("structure_consistent".to_string())
        .or_insert(FeatureValue::Null);
    merged.extend(parser_feats);

    let mut out: PartialRecord = schema
        .structural_columns()
        .map(|c| (c.name.clone(), FeatureValue::Null))
        .collect();
    for (key, value) in merged {
        if let Some(slot) = out.get_mut(&key) {
            *slot = value;
        }
    }
    out
}

/// Null-default the `<family>_enc` section and overlay the encryption
/// record's matching keys. Families without a declared section
/// contribute nothing.
pub fn aggregate_b(
    schema: &FeatureSchema,
    family_enc: &str,
    enc_feats: Option<PartialRecord>,
) -> PartialRecord {
    let cols = schema.enc_section_columns(family_enc);
    if cols.is_empty() {
        return PartialRecord::new();
    }

    let mut out: PartialRecord = cols
        .iter()
        .map(|c| (c.name.clone(), FeatureValue::Null))
        .collect();
    if let Some(feats) = enc_feats {
        for (key, value) in feats {
            if let Some(slot) = out.get_mut(&key) {
                *slot = value;
            }
        }
    }
    out
}

/// Null-default the statistic section and overlay the metrics whose
/// column names the schema declares. A failed statistics pass leaves
/// the defaults in place.
pub fn aggregate_c(schema: &FeatureSchema, path: &Path, cfg: &StatsConfig) -> PartialRecord {
    let mut out: PartialRecord = schema
        .statistic_columns()
        .map(|c| (c.name.clone(), FeatureValue::Null))
        .collect();
    if out.is_empty() {
        return out;
    }

    let stats = match stats::byte_statistics(path, cfg) {
        Ok(s) => s,
        Err(e) => {
            warn!("byte statistics failed for {:?}: {}", path, e);
            return out;
        }
    };

    let metrics: [(&str, Option<f64>); 6] = [
        ("entropy_global", stats.entropy_global()),
        ("min_entropy_global", stats.min_entropy_global()),
        ("entropy_head", stats.entropy_head()),
        ("entropy_tail", stats.entropy_tail()),
        ("byte_chi2", stats.byte_chi2()),
        ("ic_index", stats.ic_index()),
    ];
    for (name, value) in metrics {
        if let Some(slot) = out.get_mut(name) {
            *slot = value.map(FeatureValue::Float).unwrap_or(FeatureValue::Null);
        }
    }
    out
}
