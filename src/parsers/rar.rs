//! RAR v4 block walk and RAR v5 shallow plausibility check.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::RarFeatures;
use crate::io::BoundedFile;
use crate::parsers::{u16_le, u32_le, StructuralParser};
use std::path::Path;

const RAR4_SIG: &[u8; 7] = b"Rar!\x1A\x07\x00";
const RAR5_SIG: &[u8; 8] = b"Rar!\x1A\x07\x01\x00";

const BLOCK_MAIN: u8 = 0x73;
const BLOCK_FILE: u8 = 0x74;
const BLOCK_ENDARC: u8 = 0x7B;

/// ADD_SIZE flag: a 4-byte additional length follows the fixed header.
const FLAG_ADD_SIZE: u16 = 0x8000;

pub struct RarParser;

impl StructuralParser for RarParser {
    fn family(&self) -> &'static str {
        "rar"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_rar(path).emit()
    }
}

pub fn parse_rar(path: &Path) -> RarFeatures {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<RarFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let head = file.read_prefix(10)?;
    if head.starts_with(RAR5_SIG) {
        parse_rar5(&mut file)
    } else if head.starts_with(RAR4_SIG) {
        parse_rar4(&mut file)
    } else {
        // a bare v4 stream without its mark header is out of scope
        Err(ParseError::bad_magic())
    }
}

/// Walk v4 blocks: CRC(2) Type(1) Flags(2) Size(2), plus a 4-byte
/// ADD_SIZE when flagged.
///
/// The advance deliberately uses `head_size + add_size` even though the
/// ADD_SIZE field is read from inside the `head_size` span; reference
/// archives step exactly this way, so the walk reproduces it.
fn parse_rar4(file: &mut BoundedFile) -> Result<RarFeatures, ParseError> {
    let size = file.size();
    let mut pos = RAR4_SIG.len() as u64;

    let mut file_count: i64 = 0;
    let mut header_ok = false;
    let mut main_flags_ok = false;
    let mut seen_main = false;

    loop {
        if pos + 7 > size {
            break;
        }
        let hdr = file.read_at(pos, 7)?;
        if hdr.len() < 7 {
            break;
        }

        let head_type = hdr[2];
        let head_flags = u16_le(&hdr, 3).unwrap_or(0);
        let head_size = u16_le(&hdr, 5).unwrap_or(0);
        if head_size < 7 {
            break;
        }

        let mut add_size = 0u64;
        if head_flags & FLAG_ADD_SIZE != 0 {
            if pos + 7 + 4 > size {
                break;
            }
            let extra = file.read_at(pos + 7, 4)?;
            add_size = u32_le(&extra, 0).unwrap_or(0) as u64;
        }

        let block_total = head_size as u64 + add_size;
        if pos + block_total > size {
            break;
        }

        if head_type == BLOCK_MAIN {
            seen_main = true;
            main_flags_ok = true;
        }
        if head_type == BLOCK_FILE {
            file_count += 1;
        }

        header_ok = true;
        pos += block_total;

        if head_type == BLOCK_ENDARC {
            break;
        }
    }

    let parser_ok = header_ok && main_flags_ok;
    let structure_consistent = parser_ok && file_count > 0;

    Ok(RarFeatures {
        header_ok: header_ok && seen_main,
        main_header_flags_ok: main_flags_ok,
        file_records_count: file_count,
        version_5: Some(false),
        parser_ok,
        structure_consistent,
    })
}

/// v5 carries variable-length integers; only the first post-signature
/// block gets a plausibility glance.
fn parse_rar5(file: &mut BoundedFile) -> Result<RarFeatures, ParseError> {
    let data = file.read_at(8, 64)?;
    let blocks_present = if data.len() >= 7 {
        let block_size = u32_le(&data, 0).unwrap_or(0);
        let block_type = data[4];
        (1..=0x7F).contains(&block_type) && block_size > 0 && block_size < 65536
    } else {
        false
    };

    Ok(RarFeatures {
        header_ok: true,
        main_header_flags_ok: true,
        file_records_count: 0,
        version_5: Some(true),
        parser_ok: true,
        structure_consistent: blocks_present,
    })
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(data: &[u8]) -> NamedTempFile {
        let f = NamedTempFile::new().unwrap();
        f.as_file().write_all(data).unwrap();
        f
    }

    #[test]
    fn v4_main_and_file_blocks() {
        let data = rar4_archive(&[
            rar4_block(0x73, 0, None),
            rar4_block(0x74, 0, None),
            rar4_block(0x7B, 0, None),
        ]);
        let f = write_fixture(&data);
        let feats = parse_rar(f.path());
        assert!(feats.header_ok);
        assert!(feats.main_header_flags_ok);
        assert_eq!(feats.file_records_count, 1);
        assert_eq!(feats.version_5, Some(false));
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn v4_without_main_header_fails() {
        let data = rar4_archive(&[rar4_block(0x74, 0, None)]);
        let f = write_fixture(&data);
        let feats = parse_rar(f.path());
        assert!(!feats.header_ok);
        assert!(!feats.parser_ok);
    }

    #[test]
    fn v5_signature_reports_ok() {
        let mut data = RAR5_SIG.to_vec();
        // first block: size 32, type 1
        data.extend_from_slice(&32u32.to_le_bytes());
        data.push(1);
        data.extend_from_slice(&[0u8; 40]);
        let f = write_fixture(&data);
        let feats = parse_rar(f.path());
        assert_eq!(feats.version_5, Some(true));
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn v5_garbage_block_is_not_consistent() {
        let mut data = RAR5_SIG.to_vec();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0xFF);
        data.extend_from_slice(&[0u8; 8]);
        let f = write_fixture(&data);
        let feats = parse_rar(f.path());
        assert!(feats.parser_ok);
        assert!(!feats.structure_consistent);
    }

    #[test]
    fn wrong_signature_is_default() {
        let f = write_fixture(b"Rat!\x1A\x07\x00rest");
        assert_eq!(parse_rar(f.path()), RarFeatures::default());
    }

    #[test]
    fn truncated_block_stops_walk() {
        let mut data = RAR4_SIG.to_vec();
        data.extend_from_slice(&[0, 0, 0x73, 0, 0]); // incomplete header
        let f = write_fixture(&data);
        let feats = parse_rar(f.path());
        assert!(!feats.header_ok);
        assert!(!feats.parser_ok);
    }
}
