//! Typed feature records emitted by the structural and encryption parsers.
//!
//! `Default` on each record is the format's failure record: every flag
//! false, every count zero, optionals absent. Parsers return these by
//! value and the registry flattens them into a `PartialRecord` keyed by
//! the schema column names.

use crate::core::feature::{FeatureValue, PartialRecord};
use serde::{Deserialize, Serialize};

fn put(out: &mut PartialRecord, name: &str, value: FeatureValue) {
    out.insert(name.to_string(), value);
}

/// GZIP member header features (RFC 1952).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GzipFeatures {
    pub header_ok: bool,
    pub mtime_present: bool,
    pub name_present: bool,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl GzipFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "gzip_header_ok", self.header_ok.into());
        put(&mut out, "gzip_mtime_present", self.mtime_present.into());
        put(&mut out, "gzip_name_present", self.name_present.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// JPEG marker-walk features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JpegFeatures {
    pub header_ok: bool,
    pub sof_present: bool,
    pub sos_present: bool,
    pub exif_present: bool,
    pub segments_count: i64,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl JpegFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "jpeg_header_ok", self.header_ok.into());
        put(&mut out, "jpeg_sof_present", self.sof_present.into());
        put(&mut out, "jpeg_sos_present", self.sos_present.into());
        put(&mut out, "jpeg_exif_present", self.exif_present.into());
        put(&mut out, "jpeg_segments_count", self.segments_count.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// PNG chunk-walk features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PngFeatures {
    pub header_ok: bool,
    pub ihdr_ok: bool,
    pub chunks_count: i64,
    pub idat_count: i64,
    pub iend_ok: bool,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl PngFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "png_header_ok", self.header_ok.into());
        put(&mut out, "png_ihdr_ok", self.ihdr_ok.into());
        put(&mut out, "png_chunks_count", self.chunks_count.into());
        put(&mut out, "png_idat_count", self.idat_count.into());
        put(&mut out, "png_end_iend_ok", self.iend_ok.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// MP4 / ISO-BMFF box-tree features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mp4Features {
    pub ftyp_present: bool,
    pub moov_present: bool,
    pub mdat_present: bool,
    pub brand: String,
    pub box_tree_ok: bool,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl Mp4Features {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "mp4_ftyp_present", self.ftyp_present.into());
        put(&mut out, "mp4_moov_present", self.moov_present.into());
        put(&mut out, "mp4_mdat_present", self.mdat_present.into());
        put(&mut out, "mp4_brand", self.brand.as_str().into());
        put(&mut out, "mp4_box_tree_ok", self.box_tree_ok.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// OLE2 / CFB directory and allocation-table features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ole2Features {
    pub dir_ok: bool,
    pub stream_count: i64,
    pub fat_ok: bool,
    pub mini_fat_ok: bool,
    pub root_entry_present: bool,
    pub summaryinfo_present: bool,
    pub expected_streams_present: bool,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl Ole2Features {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "ole_dir_ok", self.dir_ok.into());
        put(&mut out, "ole_stream_count", self.stream_count.into());
        put(&mut out, "ole_fat_ok", self.fat_ok.into());
        put(&mut out, "ole_mini_fat_ok", self.mini_fat_ok.into());
        put(
            &mut out,
            "ole_root_entry_present",
            self.root_entry_present.into(),
        );
        put(
            &mut out,
            "ole_summaryinfo_present",
            self.summaryinfo_present.into(),
        );
        put(
            &mut out,
            "ole_expected_streams_present",
            self.expected_streams_present.into(),
        );
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// ZIP central-directory features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZipFeatures {
    pub central_dir_ok: bool,
    pub cd_offset_ok: bool,
    pub entry_count: i64,
    pub has_content_types: bool,
    pub comment_len: i64,
    pub names_utf8_fraction: f64,
    pub crc_present_fraction: f64,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl ZipFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "zip_central_dir_ok", self.central_dir_ok.into());
        put(&mut out, "zip_cd_offset_ok", self.cd_offset_ok.into());
        put(&mut out, "zip_entry_count", self.entry_count.into());
        put(
            &mut out,
            "zip_has_content_types",
            self.has_content_types.into(),
        );
        put(&mut out, "zip_comment_len", self.comment_len.into());
        put(
            &mut out,
            "zip_names_utf8_fraction",
            self.names_utf8_fraction.into(),
        );
        put(
            &mut out,
            "zip_crc_present_fraction",
            self.crc_present_fraction.into(),
        );
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// OOXML package features, layered on the ZIP walker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OoxmlFeatures {
    pub detected: bool,
    pub coreparts_present: bool,
    pub rel_count: i64,
    pub pkg_ok: bool,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl OoxmlFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "ooxml_detected", self.detected.into());
        put(
            &mut out,
            "ooxml_coreparts_present",
            self.coreparts_present.into(),
        );
        put(&mut out, "ooxml_rel_count", self.rel_count.into());
        put(&mut out, "ooxml_pkg_ok", self.pkg_ok.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// RAR v4/v5 block-walk features.
///
/// `version_5` stays absent on the failure record; the aggregator fills
/// the column with null, matching the reference behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RarFeatures {
    pub header_ok: bool,
    pub main_header_flags_ok: bool,
    pub file_records_count: i64,
    pub version_5: Option<bool>,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl RarFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "rar_header_ok", self.header_ok.into());
        put(
            &mut out,
            "rar_main_header_flags_ok",
            self.main_header_flags_ok.into(),
        );
        put(
            &mut out,
            "rar_file_records_count",
            self.file_records_count.into(),
        );
        if let Some(v5) = self.version_5 {
            put(&mut out, "rar_version_5", v5.into());
        }
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// PDF trailer/xref plausibility features.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfFeatures {
    pub version: Option<f64>,
    pub has_trailer: bool,
    pub startxref_found: bool,
    pub xref_ok: bool,
    pub ids_present: bool,
    pub root_present: bool,
    pub trailer_ok: bool,
    pub obj_count_est: f64,
    pub parser_ok: bool,
    pub structure_consistent: bool,
}

impl PdfFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(&mut out, "pdf_version", self.version.into());
        put(&mut out, "pdf_has_trailer", self.has_trailer.into());
        put(
            &mut out,
            "pdf_startxref_found",
            self.startxref_found.into(),
        );
        put(&mut out, "pdf_xref_ok", self.xref_ok.into());
        put(&mut out, "pdf_ids_present", self.ids_present.into());
        put(&mut out, "pdf_root_present", self.root_present.into());
        put(&mut out, "pdf_trailer_ok", self.trailer_ok.into());
        put(&mut out, "pdf_obj_count_est", self.obj_count_est.into());
        put(&mut out, "parser_ok", self.parser_ok.into());
        put(
            &mut out,
            "structure_consistent",
            self.structure_consistent.into(),
        );
        out
    }
}

/// OLE2 legitimate-encryption markers (OOXML-in-CFB and legacy RC4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ole2EncFeatures {
    pub encrypted_package_present: bool,
    pub encryption_info_present: bool,
    pub encryption_type: Option<String>,
    pub crypto_provider: Option<String>,
    pub rc4_meta_present: bool,
    pub rc4_triplet_present: bool,
}

impl Ole2EncFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(
            &mut out,
            "encrypted_package_present",
            self.encrypted_package_present.into(),
        );
        put(
            &mut out,
            "ooxml_encryption_info_present",
            self.encryption_info_present.into(),
        );
        put(
            &mut out,
            "ooxml_encryption_type",
            self.encryption_type.clone().into(),
        );
        put(
            &mut out,
            "ole_crypto_provider",
            self.crypto_provider.clone().into(),
        );
        put(
            &mut out,
            "ole_rc4_meta_present",
            self.rc4_meta_present.into(),
        );
        put(
            &mut out,
            "ole_rc4_triplet_present",
            self.rc4_triplet_present.into(),
        );
        out
    }
}

/// PDF `/Encrypt` dictionary markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfEncFeatures {
    pub dict_present: bool,
    pub filter: Option<String>,
    pub metadata: Option<bool>,
}

impl PdfEncFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(
            &mut out,
            "pdf_encrypt_dict_present",
            self.dict_present.into(),
        );
        put(&mut out, "pdf_encrypt_filter", self.filter.clone().into());
        put(&mut out, "pdf_encrypt_metadata", self.metadata.into());
        out
    }
}

/// ZIP per-entry encryption markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZipEncFeatures {
    pub any_entry_encrypted: bool,
    pub method: Option<String>,
    pub all_headers_encrypted: bool,
}

impl ZipEncFeatures {
    pub fn emit(&self) -> PartialRecord {
        let mut out = PartialRecord::new();
        put(
            &mut out,
            "zip_any_entry_encrypted",
            self.any_entry_encrypted.into(),
        );
        put(&mut out, "zip_encryption_method", self.method.clone().into());
        put(
            &mut out,
            "zip_all_headers_encrypted",
            self.all_headers_encrypted.into(),
        );
        out
    }
}
