//! Per-file extraction pipeline.
//!
//! sniff → structural parse → Aggregator A → (if `parser_ok`)
//! encryption parse → Aggregator B → byte statistics → Aggregator C →
//! strict schema reconciliation → type normalization. Parse failures
//! never escape; only a schema contract violation is an error.

use crate::aggregate;
use crate::config::FeaturizerConfig;
use crate::core::errors::ExtractError;
use crate::core::feature::{FeatureRecord, FeatureValue, PartialRecord};
use crate::core::schema::{ColumnType, FeatureSchema, SchemaViolation};
use crate::registry;
use crate::sniff;
use std::path::Path;
use tracing::debug;

/// Once-built context shared across files: config, schema, registries.
pub struct ExtractContext {
    pub config: FeaturizerConfig,
    pub schema: FeatureSchema,
}

impl ExtractContext {
    pub fn new(config: FeaturizerConfig, schema: FeatureSchema) -> Self {
        Self { config, schema }
    }

    /// Default config with the built-in schema.
    pub fn with_defaults() -> Self {
        Self::new(FeaturizerConfig::default(), FeatureSchema::builtin())
    }
}

/// Coerce a value to its declared column type. Failures pass the raw
/// value through unchanged rather than failing the record.
pub fn normalize_value(value: FeatureValue, ty: ColumnType) -> FeatureValue {
    use FeatureValue::*;
    if matches!(value, Null) {
        return Null;
    }
    match ty {
        ColumnType::Bool => value,
        ColumnType::Int => match value {
            Int(i) => Int(i),
            Float(f) => Int(f as i64),
            Bool(b) => Int(b as i64),
            Str(s) => match s.parse::<i64>() {
                Ok(i) => Int(i),
                Err(_) => Str(s),
            },
            Null => Null,
        },
        ColumnType::Float => match value {
            Float(f) => Float(f),
            Int(i) => Float(i as f64),
            Bool(b) => Float(if b { 1.0 } else { 0.0 }),
            Str(s) => match s.parse::<f64>() {
                Ok(f) => Float(f),
                Err(_) => Str(s),
            },
            Null => Null,
        },
        ColumnType::String => match value {
            Str(s) => Str(s),
            other => Str(other.render()),
        },
    }
}

/// Extract the full feature record for one file.
pub fn extract_features(path: &Path, ctx: &ExtractContext) -> Result<FeatureRecord, ExtractError> {
    // 1. sniff
    let snf = sniff::sniff(path, &ctx.config.sniffer).map_err(|source| ExtractError::Io {
        path: path.display().to_string(),
        source,
    })?;

    // 2. structural parse by family; no parser leaves the verdict null
    let parser_feats = registry::get_parser(&snf.format_family).map(|p| p.parse(path));
    let mut feats = aggregate::aggregate_a(&ctx.schema, &snf, parser_feats);

    // 3. encryption parse, only for a structurally-openable container
    let enc_family = format!("{}_enc", snf.format_family);
    let parser_ok = matches!(feats.get("parser_ok"), Some(FeatureValue::Bool(true)));
    let enc_feats = if parser_ok {
        registry::get_parser_enc(&enc_family).map(|p| p.parse(path))
    } else {
        None
    };
    feats.extend(aggregate::aggregate_b(&ctx.schema, &enc_family, enc_feats));
    for col in ctx.schema.enc_columns() {
        feats
            .entry(col.name.clone())
            .or_insert(FeatureValue::Null);
    }

    // 4. byte statistics
    feats.extend(aggregate::aggregate_c(
        &ctx.schema,
        path,
        &ctx.config.stats,
    ));
    for col in ctx.schema.statistic_columns() {
        feats
            .entry(col.name.clone())
            .or_insert(FeatureValue::Null);
    }

    // 5. strict reconciliation against the declared schema
    reconcile(path, &ctx.schema, &feats)?;

    // 6. normalize types, order by schema declaration
    let columns = ctx
        .schema
        .columns()
        .iter()
        .map(|col| {
            let value = feats.remove(&col.name).unwrap_or(FeatureValue::Null);
            (col.name.clone(), normalize_value(value, col.ty))
        })
        .collect();

    debug!("extracted {} columns for {:?}", ctx.schema.len(), path);
    Ok(FeatureRecord::new(columns))
}

fn reconcile(
    path: &Path,
    schema: &FeatureSchema,
    feats: &PartialRecord,
) -> Result<(), SchemaViolation> {
    let missing: Vec<String> = schema
        .names()
        .filter(|name| !feats.contains_key(*name))
        .map(|name| name.to_string())
        .collect();
    let mut extra: Vec<String> = feats
        .keys()
        .filter(|key| !schema.contains(key))
        .cloned()
        .collect();
    extra.sort_unstable();

    if missing.is_empty() && extra.is_empty() {
        Ok(())
    } else {
        Err(SchemaViolation {
            path: path.display().to_string(),
            missing,
            extra,
        })
    }
}
