//! Directory-level batch driver.
//!
//! Walks an input tree, extracts per file in parallel, and writes one
//! delimited row per file with a prepended `path` column. A corrupt
//! file never aborts the run; a schema contract violation always does.

use crate::core::errors::ExtractError;
use crate::core::feature::{FeatureRecord, FeatureValue};
use crate::extract::{extract_features, ExtractContext};
use anyhow::Context;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const OUTPUT_NAME: &str = "features.csv";

/// Summary of one batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub output_path: PathBuf,
    pub rows_written: usize,
    pub files_failed: usize,
}

/// Every regular file under `root`, sorted for deterministic output.
fn collect_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Minimal delimited-cell quoting: only cells carrying the delimiter,
/// quotes, or newlines get wrapped.
fn quote_cell(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_rows(
    out_path: &Path,
    ctx: &ExtractContext,
    rows: &[(String, FeatureRecord)],
) -> anyhow::Result<()> {
    let file = File::create(out_path)
        .with_context(|| format!("creating output file {}", out_path.display()))?;
    let mut w = BufWriter::new(file);

    let mut header = vec!["path".to_string()];
    header.extend(ctx.schema.names().map(|n| n.to_string()));
    writeln!(w, "{}", header.join(","))?;

    for (rel_path, record) in rows {
        let mut cells = vec![quote_cell(rel_path)];
        for value in record.values() {
            let rendered = match value {
                FeatureValue::Null => String::new(),
                other => other.render(),
            };
            cells.push(quote_cell(&rendered));
        }
        writeln!(w, "{}", cells.join(","))?;
    }
    w.flush()?;
    Ok(())
}

/// Extract every file under `input_dir` into one delimited table.
///
/// Per-file I/O failures are logged and counted, not fatal; a
/// `SchemaViolation` aborts immediately.
pub fn extract_directory(
    input_dir: &Path,
    output_dir: &Path,
    ctx: &ExtractContext,
) -> anyhow::Result<BatchOutcome> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output dir {}", output_dir.display()))?;
    let out_path = output_dir.join(OUTPUT_NAME);

    let files = collect_files(input_dir);
    info!("extracting {} files under {:?}", files.len(), input_dir);

    let results: Vec<(PathBuf, Result<FeatureRecord, ExtractError>)> = files
        .par_iter()
        .map(|path| (path.clone(), extract_features(path, ctx)))
        .collect();

    let mut rows = Vec::new();
    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(record) => rows.push((relative_slash_path(input_dir, &path), record)),
            Err(err) if err.is_fatal() => {
                return Err(anyhow::Error::new(err)
                    .context("schema contract violation, aborting the batch"));
            }
            Err(err) => {
                warn!("skipping {:?}: {}", path, err);
                failed += 1;
            }
        }
    }

    write_rows(&out_path, ctx, &rows)?;
    info!("wrote {} rows to {:?}", rows.len(), out_path);

    Ok(BatchOutcome {
        output_path: out_path,
        rows_written: rows.len(),
        files_failed: failed,
    })
}
