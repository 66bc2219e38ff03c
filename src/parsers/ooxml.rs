//! OOXML package detection, layered on the ZIP central directory.
//!
//! Looks for `[Content_Types].xml` plus the Office root directories,
//! counts `.rels` parts with an early stop, and probes the first 4 KiB
//! of the content-types part for an XML `Types` declaration. The probe
//! inflates a deflated entry; it never decompresses the whole package.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::OoxmlFeatures;
use crate::io::BoundedFile;
use crate::parsers::zip::{find_eocd, read_central_directory, CdEntry, LFH_SIG};
use crate::parsers::{u16_le, u32_le, StructuralParser};
use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;

const CONTENT_TYPES: &[u8] = b"[Content_Types].xml";
const CORE_DOCX: &[u8] = b"word/document.xml";
const CORE_XLSX: &[u8] = b"xl/workbook.xml";
const CORE_PPTX: &[u8] = b"ppt/presentation.xml";

/// Early stop for `.rels` counting on huge packages.
const RELS_EARLY_STOP: i64 = 20;
/// How much of `[Content_Types].xml` the package probe reads.
const CT_SCAN_BYTES: usize = 4096;
/// Compressed bytes read for the inflate probe.
const CT_COMPRESSED_READ: usize = 64 * 1024;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

pub struct OoxmlParser;

impl StructuralParser for OoxmlParser {
    fn family(&self) -> &'static str {
        "ooxml"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_ooxml(path).emit()
    }
}

fn is_office_dir(name: &[u8]) -> bool {
    name.starts_with(b"word/") || name.starts_with(b"xl/") || name.starts_with(b"ppt/")
}

fn rel_count(entries: &[CdEntry]) -> i64 {
    let mut cnt = 0i64;
    for e in entries {
        if e.name.ends_with(b".rels") || e.name.ends_with(b".RELS") {
            cnt += 1;
            if cnt > RELS_EARLY_STOP {
                return RELS_EARLY_STOP + 1;
            }
        }
    }
    cnt
}

/// First `CT_SCAN_BYTES` of a stored or deflated entry's data.
fn read_entry_head(file: &mut BoundedFile, entry: &CdEntry) -> Option<Vec<u8>> {
    let lfh = file.read_at(entry.lfh_offset as u64, 30).ok()?;
    if lfh.len() < 30 || u32_le(&lfh, 0) != Some(LFH_SIG) {
        return None;
    }
    let name_len = u16_le(&lfh, 26)? as u64;
    let extra_len = u16_le(&lfh, 28)? as u64;
    let data_off = entry.lfh_offset as u64 + 30 + name_len + extra_len;

    match entry.method {
        METHOD_STORED => file.read_at(data_off, CT_SCAN_BYTES).ok(),
        METHOD_DEFLATE => {
            let compressed = file.read_at(data_off, CT_COMPRESSED_READ).ok()?;
            let mut out = vec![0u8; CT_SCAN_BYTES];
            let mut decoder = DeflateDecoder::new(&compressed[..]);
            let mut filled = 0usize;
            while filled < out.len() {
                match decoder.read(&mut out[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(_) => break,
                }
            }
            if filled == 0 {
                return None;
            }
            out.truncate(filled);
            Some(out)
        }
        _ => None,
    }
}

fn pkg_ok(
    file: &mut BoundedFile,
    content_types: Option<&CdEntry>,
    core_present: bool,
    has_office_dirs: bool,
) -> bool {
    let Some(ct) = content_types else {
        return false;
    };
    if !(core_present || has_office_dirs) {
        return false;
    }
    match read_entry_head(file, ct) {
        // cheap XML signature checks, with and without a namespace prefix
        Some(head) => {
            memchr::memmem::find(&head, b"<Types").is_some()
                || memchr::memmem::find(&head, b":Types").is_some()
        }
        None => false,
    }
}

pub fn parse_ooxml(path: &Path) -> OoxmlFeatures {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<OoxmlFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let eocd = find_eocd(&mut file)?.ok_or_else(ParseError::bad_magic)?;
    let entries = read_central_directory(&mut file, &eocd)?;

    let content_types = entries.iter().find(|e| e.name == CONTENT_TYPES);
    let core_present = entries
        .iter()
        .any(|e| e.name == CORE_DOCX || e.name == CORE_XLSX || e.name == CORE_PPTX);
    let has_office_dirs = entries.iter().any(|e| is_office_dir(&e.name));

    let detected = content_types.is_some() && (core_present || has_office_dirs);
    let rels = rel_count(&entries);
    let package_ok = pkg_ok(&mut file, content_types, core_present, has_office_dirs);

    let parser_ok = detected && package_ok && (core_present || rels > 0);
    let structure_consistent = parser_ok && core_present && rels >= 2;

    Ok(OoxmlFeatures {
        detected,
        coreparts_present: core_present,
        rel_count: rels,
        pkg_ok: package_ok,
        parser_ok,
        structure_consistent,
    })
}

/// Shallow archive-listing probe used by the sniffer to resolve a ZIP
/// signature into the OOXML family. Never decompresses anything.
pub(crate) fn zip_names_look_like_ooxml(path: &Path) -> bool {
    let Ok(mut file) = BoundedFile::open(path) else {
        return false;
    };
    let Ok(Some(eocd)) = find_eocd(&mut file) else {
        return false;
    };
    let Ok(entries) = read_central_directory(&mut file, &eocd) else {
        return false;
    };
    entries.iter().any(|e| e.name == CONTENT_TYPES)
        && entries.iter().any(|e| is_office_dir(&e.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::zip::test_support::{build_zip, Entry};
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(data: &[u8]) -> NamedTempFile {
        let f = NamedTempFile::new().unwrap();
        f.as_file().write_all(data).unwrap();
        f
    }

    fn docx_entries() -> Vec<Entry> {
        vec![
            Entry::stored(
                "[Content_Types].xml",
                b"<?xml version=\"1.0\"?><Types xmlns=\"ct\"><Override/></Types>",
            ),
            Entry::stored("_rels/.rels", b"<Relationships/>"),
            Entry::stored("word/_rels/document.xml.rels", b"<Relationships/>"),
            Entry::stored("word/document.xml", b"<w:document/>"),
        ]
    }

    #[test]
    fn stored_docx_package_is_consistent() {
        let data = build_zip(&docx_entries());
        let f = write_fixture(&data);
        let feats = parse_ooxml(f.path());
        assert!(feats.detected);
        assert!(feats.coreparts_present);
        assert_eq!(feats.rel_count, 2);
        assert!(feats.pkg_ok);
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn deflated_content_types_probe() {
        let xml = b"<?xml version=\"1.0\"?><Types xmlns=\"ct\"></Types>";
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(xml).unwrap();
        let compressed = enc.finish().unwrap();

        let mut ct = Entry::stored("[Content_Types].xml", &compressed);
        ct.method = 8;
        let entries = vec![
            ct,
            Entry::stored("_rels/.rels", b"<Relationships/>"),
            Entry::stored("xl/_rels/workbook.xml.rels", b"<Relationships/>"),
            Entry::stored("xl/workbook.xml", b"<workbook/>"),
        ];
        let data = build_zip(&entries);
        let f = write_fixture(&data);
        let feats = parse_ooxml(f.path());
        assert!(feats.pkg_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn plain_zip_is_not_a_package() {
        let data = build_zip(&[Entry::stored("readme.txt", b"hi")]);
        let f = write_fixture(&data);
        let feats = parse_ooxml(f.path());
        assert!(!feats.detected);
        assert!(!feats.parser_ok);
    }

    #[test]
    fn content_types_without_types_decl_fails_pkg() {
        let entries = vec![
            Entry::stored("[Content_Types].xml", b"not xml at all"),
            Entry::stored("word/document.xml", b"<w:document/>"),
            Entry::stored("_rels/.rels", b"<Relationships/>"),
            Entry::stored("word/_rels/document.xml.rels", b"<Relationships/>"),
        ];
        let data = build_zip(&entries);
        let f = write_fixture(&data);
        let feats = parse_ooxml(f.path());
        assert!(feats.detected);
        assert!(!feats.pkg_ok);
        assert!(!feats.parser_ok);
    }

    #[test]
    fn sniffer_probe_detects_office_layout() {
        let data = build_zip(&docx_entries());
        let f = write_fixture(&data);
        assert!(zip_names_look_like_ooxml(f.path()));

        let plain = build_zip(&[Entry::stored("a.txt", b"x")]);
        let f2 = write_fixture(&plain);
        assert!(!zip_names_look_like_ooxml(f2.path()));
    }

    #[test]
    fn non_zip_is_default() {
        let f = write_fixture(b"random bytes, no trailer");
        assert_eq!(parse_ooxml(f.path()), OoxmlFeatures::default());
    }
}
