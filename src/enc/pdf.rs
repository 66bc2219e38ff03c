//! PDF `/Encrypt` dictionary markers.
//!
//! Scans the tail window first (where the trailer lives), falling back
//! to the head; around the first `/Encrypt` hit, a bounded window is
//! searched for the filter name and the metadata-encryption flag.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::PdfEncFeatures;
use crate::enc::EncryptionParser;
use crate::io::BoundedFile;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::path::Path;

const TAIL_READ: usize = 256 * 1024;
const HEAD_READ: usize = 1024 * 1024;
const WINDOW_BEFORE: usize = 2 * 1024;
const WINDOW_AFTER: usize = 8 * 1024;

static RE_FILTER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/Filter\s*/([A-Za-z0-9]+)").expect("static regex"));
static RE_ENCRYPT_METADATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/EncryptMetadata\s+(true|false)").expect("static regex"));

pub struct PdfEncParser;

impl EncryptionParser for PdfEncParser {
    fn family(&self) -> &'static str {
        "pdf_enc"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_pdf_enc(path).emit()
    }
}

pub fn parse_pdf_enc(path: &Path) -> PdfEncFeatures {
    parse_inner(path).unwrap_or_default()
}

fn scan_encrypt_window(buf: &[u8]) -> PdfEncFeatures {
    let Some(pos) = memchr::memmem::find(buf, b"/Encrypt") else {
        return PdfEncFeatures::default();
    };

    let start = pos.saturating_sub(WINDOW_BEFORE);
    let end = (pos + WINDOW_AFTER).min(buf.len());
    let win = &buf[start..end];

    let mut filter = RE_FILTER_NAME
        .captures(win)
        .and_then(|c| c.get(1))
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());
    let mut metadata = RE_ENCRYPT_METADATA
        .captures(win)
        .and_then(|c| c.get(1))
        .map(|m| m.as_bytes().eq_ignore_ascii_case(b"true"));

    // widen to the whole buffer when the local window came up empty
    if filter.is_none() {
        filter = RE_FILTER_NAME
            .captures(buf)
            .and_then(|c| c.get(1))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned());
    }
    if metadata.is_none() {
        metadata = RE_ENCRYPT_METADATA
            .captures(buf)
            .and_then(|c| c.get(1))
            .map(|m| m.as_bytes().eq_ignore_ascii_case(b"true"));
    }

    PdfEncFeatures {
        dict_present: true,
        filter,
        metadata,
    }
}

fn parse_inner(path: &Path) -> Result<PdfEncFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;

    let tail = file.read_suffix(TAIL_READ)?;
    let from_tail = scan_encrypt_window(&tail);
    if from_tail.dict_present {
        return Ok(from_tail);
    }

    let head = file.read_prefix(HEAD_READ)?;
    let from_head = scan_encrypt_window(&head);
    if from_head.dict_present {
        return Ok(from_head);
    }

    Ok(PdfEncFeatures::default())
}
