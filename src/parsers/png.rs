//! PNG chunk walk: IHDR first, IDAT occurrences, IEND terminator.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::PngFeatures;
use crate::io::BoundedFile;
use crate::parsers::{u32_be, StructuralParser};
use std::path::Path;

const PNG_SIG: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const SIG_LEN: usize = 8;
const MAX_CHUNKS: u64 = 100_000;

pub struct PngParser;

impl StructuralParser for PngParser {
    fn family(&self) -> &'static str {
        "png"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_png(path).emit()
    }
}

pub fn parse_png(path: &Path) -> PngFeatures {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<PngFeatures, ParseError> {
    let data = BoundedFile::open(path)?.read_all()?;
    let n = data.len() as u64;

    // signature plus one complete chunk header is the floor
    if !data.starts_with(PNG_SIG) || data.len() < SIG_LEN + 12 {
        return Err(ParseError::bad_magic());
    }

    let mut chunks_count: i64 = 0;
    let mut idat_count: i64 = 0;
    let mut iend_ok = false;

    // First chunk must be IHDR with declared length 13, fully in bounds.
    let mut pos = SIG_LEN as u64;
    let ihdr_len = u32_be(&data, pos as usize).expect("length checked above") as u64;
    let ihdr_type = &data[pos as usize + 4..pos as usize + 8];
    let ihdr_ok = ihdr_type == b"IHDR" && ihdr_len == 13 && pos + 12 + ihdr_len <= n;
    pos += 8 + ihdr_len + 4; // len + type + data + crc
    chunks_count += 1;

    let mut steps = 0u64;
    while pos + 8 <= n && steps < MAX_CHUNKS {
        steps += 1;
        let length = u32_be(&data, pos as usize).expect("header fits") as u64;
        let ctype = &data[pos as usize + 4..pos as usize + 8];
        let next_pos = pos + 8 + length + 4;
        if next_pos > n {
            // declared extent runs past the file: corruption, stop here
            break;
        }
        chunks_count += 1;
        if ctype == b"IDAT" {
            idat_count += 1;
        } else if ctype == b"IEND" {
            iend_ok = true;
            break;
        }
        pos = next_pos;
    }

    let parser_ok = ihdr_ok && chunks_count >= 2;
    let structure_consistent = parser_ok && idat_count >= 1 && iend_ok;

    Ok(PngFeatures {
        header_ok: true,
        ihdr_ok,
        chunks_count,
        idat_count,
        iend_ok,
        parser_ok,
        structure_consistent,
    })
}
