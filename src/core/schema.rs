//! Declared feature schema: ordered columns grouped by section.
//!
//! The schema arrives as an already-parsed, ordered list of
//! `(name, type, section)` entries (the YAML front-end lives outside this
//! crate). Sections whose name ends in `_enc` route to Aggregator B, the
//! `statistic` section routes to Aggregator C, everything else to
//! Aggregator A.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Declared value type of a schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    String,
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ColumnType,
    pub section: String,
}

impl Column {
    pub fn new(name: &str, ty: ColumnType, section: &str) -> Self {
        Self {
            name: name.to_string(),
            ty,
            section: section.to_string(),
        }
    }
}

/// Which aggregator a section belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Structural,
    Encryption,
    Statistic,
}

pub fn section_kind(section: &str) -> SectionKind {
    if section.ends_with("_enc") {
        SectionKind::Encryption
    } else if section == "statistic" {
        SectionKind::Statistic
    } else {
        SectionKind::Structural
    }
}

/// Raised when the merged feature map does not match the declared schema.
///
/// This is a configuration bug (parser code vs schema drift), not a data
/// problem, and aborts a batch run.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("schema mismatch for {path}: missing columns {missing:?}, unexpected columns {extra:?}")]
pub struct SchemaViolation {
    pub path: String,
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

/// Immutable, once-loaded feature schema.
///
/// Column order is declaration order; duplicate names keep the first
/// declaration and drop the rest.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<Column>,
    types: HashMap<String, ColumnType>,
}

impl FeatureSchema {
    /// Build a schema from declared columns, dropping duplicate names.
    pub fn from_columns(declared: Vec<Column>) -> Self {
        let mut columns = Vec::with_capacity(declared.len());
        let mut types = HashMap::new();
        let mut seen = HashSet::new();
        for col in declared {
            if col.name.is_empty() || !seen.insert(col.name.clone()) {
                continue;
            }
            types.insert(col.name.clone(), col.ty);
            columns.push(col);
        }
        Self { columns, types }
    }

    /// Parse a schema from a JSON array of `{name, type, section}` objects.
    pub fn from_json(doc: &str) -> Result<Self, serde_json::Error> {
        let declared: Vec<Column> = serde_json::from_str(doc)?;
        Ok(Self::from_columns(declared))
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.types.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Column names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Columns routed to Aggregator A (anything outside `_enc`/`statistic`).
    pub fn structural_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| section_kind(&c.section) == SectionKind::Structural)
    }

    /// Columns of one `<family>_enc` section, in order.
    pub fn enc_section_columns(&self, section: &str) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.section == section && section_kind(&c.section) == SectionKind::Encryption)
            .collect()
    }

    /// All `_enc` columns across sections, in order.
    pub fn enc_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| section_kind(&c.section) == SectionKind::Encryption)
    }

    /// Columns of the `statistic` section, in order.
    pub fn statistic_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| section_kind(&c.section) == SectionKind::Statistic)
    }

    /// The schema covering every column the built-in parsers emit.
    pub fn builtin() -> Self {
        use ColumnType::*;
        let mut cols = Vec::new();
        let mut push = |name: &str, ty: ColumnType, section: &str| {
            cols.push(Column::new(name, ty, section));
        };

        push("size_bytes", Int, "common");
        push("log_size", Float, "common");
        push("magic_ok", Bool, "common");
        push("format_family", String, "common");
        push("magic_family", String, "common");
        push("parser_ok", Bool, "common");
        push("structure_consistent", Bool, "common");

        push("gzip_header_ok", Bool, "gzip");
        push("gzip_mtime_present", Bool, "gzip");
        push("gzip_name_present", Bool, "gzip");

        push("jpeg_header_ok", Bool, "jpeg");
        push("jpeg_sof_present", Bool, "jpeg");
        push("jpeg_sos_present", Bool, "jpeg");
        push("jpeg_exif_present", Bool, "jpeg");
        push("jpeg_segments_count", Int, "jpeg");

        push("png_header_ok", Bool, "png");
        push("png_ihdr_ok", Bool, "png");
        push("png_chunks_count", Int, "png");
        push("png_idat_count", Int, "png");
        push("png_end_iend_ok", Bool, "png");

        push("mp4_ftyp_present", Bool, "mp4");
        push("mp4_moov_present", Bool, "mp4");
        push("mp4_mdat_present", Bool, "mp4");
        push("mp4_brand", String, "mp4");
        push("mp4_box_tree_ok", Bool, "mp4");

        push("ole_dir_ok", Bool, "ole2");
        push("ole_stream_count", Int, "ole2");
        push("ole_fat_ok", Bool, "ole2");
        push("ole_mini_fat_ok", Bool, "ole2");
        push("ole_root_entry_present", Bool, "ole2");
        push("ole_summaryinfo_present", Bool, "ole2");
        push("ole_expected_streams_present", Bool, "ole2");

        push("zip_central_dir_ok", Bool, "zip");
        push("zip_cd_offset_ok", Bool, "zip");
        push("zip_entry_count", Int, "zip");
        push("zip_has_content_types", Bool, "zip");
        push("zip_comment_len", Int, "zip");
        push("zip_names_utf8_fraction", Float, "zip");
        push("zip_crc_present_fraction", Float, "zip");

        push("ooxml_detected", Bool, "ooxml");
        push("ooxml_coreparts_present", Bool, "ooxml");
        push("ooxml_rel_count", Int, "ooxml");
        push("ooxml_pkg_ok", Bool, "ooxml");

        push("rar_header_ok", Bool, "rar");
        push("rar_main_header_flags_ok", Bool, "rar");
        push("rar_file_records_count", Int, "rar");
        push("rar_version_5", Bool, "rar");

        push("pdf_version", Float, "pdf");
        push("pdf_has_trailer", Bool, "pdf");
        push("pdf_startxref_found", Bool, "pdf");
        push("pdf_xref_ok", Bool, "pdf");
        push("pdf_ids_present", Bool, "pdf");
        push("pdf_root_present", Bool, "pdf");
        push("pdf_trailer_ok", Bool, "pdf");
        push("pdf_obj_count_est", Float, "pdf");

        push("encrypted_package_present", Bool, "ole2_enc");
        push("ooxml_encryption_info_present", Bool, "ole2_enc");
        push("ooxml_encryption_type", String, "ole2_enc");
        push("ole_crypto_provider", String, "ole2_enc");
        push("ole_rc4_meta_present", Bool, "ole2_enc");
        push("ole_rc4_triplet_present", Bool, "ole2_enc");

        push("pdf_encrypt_dict_present", Bool, "pdf_enc");
        push("pdf_encrypt_filter", String, "pdf_enc");
        push("pdf_encrypt_metadata", Bool, "pdf_enc");

        push("zip_any_entry_encrypted", Bool, "zip_enc");
        push("zip_encryption_method", String, "zip_enc");
        push("zip_all_headers_encrypted", Bool, "zip_enc");

        push("entropy_global", Float, "statistic");
        push("min_entropy_global", Float, "statistic");
        push("entropy_head", Float, "statistic");
        push("entropy_tail", Float, "statistic");
        push("byte_chi2", Float, "statistic");
        push("ic_index", Float, "statistic");

        Self::from_columns(cols)
    }
}
