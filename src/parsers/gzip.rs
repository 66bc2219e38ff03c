//! GZIP member header walk (RFC 1952).
//!
//! Everything of interest lives in the first kilobytes, so the parser
//! reads at most 64 KiB and never touches the deflate stream.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::GzipFeatures;
use crate::io;
use crate::parsers::{u16_le, u32_le, StructuralParser};
use bitflags::bitflags;
use std::path::Path;

const ID1: u8 = 0x1F;
const ID2: u8 = 0x8B;
const CM_DEFLATE: u8 = 8;

const BASE_HDR_LEN: usize = 10;
const MAX_READ: usize = 64 * 1024;

bitflags! {
    /// FLG bits in RFC 1952 order of appearance.
    #[derive(Debug, Clone, Copy)]
    struct GzipFlags: u8 {
        const FHCRC    = 0x02;
        const FEXTRA   = 0x04;
        const FNAME    = 0x08;
        const FCOMMENT = 0x10;
    }
}

pub struct GzipParser;

impl StructuralParser for GzipParser {
    fn family(&self) -> &'static str {
        "gzip"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_gzip(path).emit()
    }
}

/// Public boundary: failures collapse into the default record.
pub fn parse_gzip(path: &Path) -> GzipFeatures {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<GzipFeatures, ParseError> {
    let data = io::read_prefix(path, MAX_READ)?;
    if data.len() < BASE_HDR_LEN {
        return Err(ParseError::short_read());
    }

    let header_ok = data[0] == ID1 && data[1] == ID2 && data[2] == CM_DEFLATE;
    let flags = GzipFlags::from_bits_truncate(data[3]);
    let mtime_present = u32_le(&data, 4).map(|m| m != 0).unwrap_or(false);

    let mut pos = BASE_HDR_LEN;
    let n = data.len();

    // Truncation while skipping FEXTRA yields the partial record; the
    // summary flags stay tied to header validity alone.
    let truncated = GzipFeatures {
        header_ok,
        mtime_present,
        name_present: false,
        parser_ok: header_ok,
        structure_consistent: header_ok,
    };

    if flags.contains(GzipFlags::FEXTRA) {
        let Some(xlen) = u16_le(&data, pos) else {
            return Ok(truncated);
        };
        pos += 2 + xlen as usize;
        if pos > n {
            return Ok(truncated);
        }
    }

    let mut name_present = false;
    if flags.contains(GzipFlags::FNAME) {
        let start = pos;
        while pos < n && data[pos] != 0 {
            pos += 1;
        }
        if pos < n && pos > start {
            name_present = true;
        }
        if pos < n {
            pos += 1; // terminating NUL
        }
    }

    if flags.contains(GzipFlags::FCOMMENT) {
        while pos < n && data[pos] != 0 {
            pos += 1;
        }
    }

    // FHCRC is a fixed 2-byte CRC16 after the optional fields; nothing
    // beyond this point contributes a feature.

    Ok(GzipFeatures {
        header_ok,
        mtime_present,
        name_present,
        parser_ok: header_ok,
        structure_consistent: header_ok,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(data: &[u8]) -> NamedTempFile {
        let f = NamedTempFile::new().unwrap();
        f.as_file().write_all(data).unwrap();
        f
    }

    #[test]
    fn minimal_valid_header() {
        let f = write_fixture(&[0x1F, 0x8B, 0x08, 0x00, 0, 0, 0, 0, 0x00, 0x03]);
        let feats = parse_gzip(f.path());
        assert!(feats.header_ok);
        assert!(!feats.mtime_present);
        assert!(!feats.name_present);
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn fname_flag_with_name() {
        let mut data = vec![0x1F, 0x8B, 0x08, 0x08, 0x78, 0x56, 0x34, 0x12, 0x00, 0x03];
        data.extend_from_slice(b"archive.tar\x00");
        data.extend_from_slice(&[0xAB; 16]);
        let f = write_fixture(&data);
        let feats = parse_gzip(f.path());
        assert!(feats.header_ok);
        assert!(feats.mtime_present);
        assert!(feats.name_present);
    }

    #[test]
    fn truncated_fextra_keeps_header_verdict() {
        // FEXTRA set but only one length byte present
        let data = vec![0x1F, 0x8B, 0x08, 0x04, 0, 0, 0, 0, 0x00, 0x03, 0x40];
        let f = write_fixture(&data);
        let feats = parse_gzip(f.path());
        assert!(feats.header_ok);
        assert!(feats.parser_ok);
        assert!(!feats.name_present);
    }

    #[test]
    fn short_input_is_default() {
        let f = write_fixture(&[0x1F, 0x8B, 0x08]);
        let feats = parse_gzip(f.path());
        assert_eq!(feats, GzipFeatures::default());
    }

    #[test]
    fn wrong_magic_fails_open() {
        let f = write_fixture(&[0x50, 0x4B, 0x03, 0x04, 0, 0, 0, 0, 0, 0]);
        let feats = parse_gzip(f.path());
        assert!(!feats.header_ok);
        assert!(!feats.parser_ok);
        assert!(!feats.structure_consistent);
    }
}
