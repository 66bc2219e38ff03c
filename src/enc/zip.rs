//! ZIP per-entry encryption markers.
//!
//! Walks the central directory testing general-purpose bit 0 and the
//! AES extra field (header id 0x9901), then infers the archive-wide
//! method.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::ZipEncFeatures;
use crate::enc::EncryptionParser;
use crate::io::BoundedFile;
use crate::parsers::u16_le;
use crate::parsers::zip::{find_eocd, read_central_directory, CdEntry, GpFlags};
use std::path::Path;

/// Extra-field header id assigned to AE-x AES encryption.
const AES_EXTRA_ID: u16 = 0x9901;

pub struct ZipEncParser;

impl EncryptionParser for ZipEncParser {
    fn family(&self) -> &'static str {
        "zip_enc"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_zip_enc(path).emit()
    }
}

pub fn parse_zip_enc(path: &Path) -> ZipEncFeatures {
    parse_inner(path).unwrap_or_default()
}

fn is_encrypted(entry: &CdEntry) -> bool {
    entry.flags.contains(GpFlags::ENCRYPTED)
}

/// Walk the extra-field records for the AES header id.
fn has_aes_extra(entry: &CdEntry) -> bool {
    let data = &entry.extra;
    let n = data.len();
    let mut i = 0usize;
    while i + 4 <= n {
        let header_id = u16_le(data, i).unwrap_or(0);
        let sz = u16_le(data, i + 2).unwrap_or(0) as usize;
        i += 4;
        if i + sz > n {
            break;
        }
        if header_id == AES_EXTRA_ID {
            return true;
        }
        i += sz;
    }
    false
}

fn entry_method(entry: &CdEntry) -> Option<&'static str> {
    if !is_encrypted(entry) {
        return None;
    }
    if has_aes_extra(entry) {
        Some("AES")
    } else {
        Some("ZipCrypto")
    }
}

fn parse_inner(path: &Path) -> Result<ZipEncFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let eocd = find_eocd(&mut file)?.ok_or_else(ParseError::bad_magic)?;
    let entries = read_central_directory(&mut file, &eocd)?;
    if entries.is_empty() {
        return Ok(ZipEncFeatures::default());
    }

    let mut any_enc = false;
    let mut all_enc = true;
    let mut seen_aes = false;
    let mut seen_zipcrypto = false;
    for entry in &entries {
        let enc = is_encrypted(entry);
        any_enc = any_enc || enc;
        all_enc = all_enc && enc;
        match entry_method(entry) {
            Some("AES") => seen_aes = true,
            Some("ZipCrypto") => seen_zipcrypto = true,
            _ => {}
        }
    }

    let (method, all_enc) = if !any_enc {
        (None, false)
    } else {
        let m = match (seen_aes, seen_zipcrypto) {
            (true, true) => "Mixed",
            (true, false) => "AES",
            (false, true) => "ZipCrypto",
            // encrypted entries with no recognizable method
            (false, false) => "ZipCrypto",
        };
        (Some(m.to_string()), all_enc)
    };

    Ok(ZipEncFeatures {
        any_entry_encrypted: any_enc,
        method,
        all_headers_encrypted: all_enc,
    })
}
