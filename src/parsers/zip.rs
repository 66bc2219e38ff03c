//! ZIP central-directory walk.
//!
//! Locates the End-Of-Central-Directory record by reverse-scanning the
//! file tail, then iterates the fixed-size central-directory headers.
//! The same machinery backs the OOXML probe and the ZIP encryption
//! parser.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::ZipFeatures;
use crate::io::BoundedFile;
use crate::parsers::{u16_le, u32_le, StructuralParser};
use bitflags::bitflags;
use std::path::Path;

const EOCD_SIG: &[u8; 4] = b"PK\x05\x06";
const CDH_SIG: u32 = 0x0201_4B50;
pub(crate) const LFH_SIG: u32 = 0x0403_4B50;

/// EOCD lives in the last 64 KiB (max comment) plus its fixed 22 bytes.
const MAX_EOCD_SEARCH: usize = 0x10000 + 22;
const CDH_FIXED_LEN: usize = 46;

bitflags! {
    /// General-purpose bit flags carried per central-directory entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct GpFlags: u16 {
        const ENCRYPTED  = 0x0001;
        const UTF8_NAMES = 0x0800;
    }
}

/// Parsed fixed part of the End-Of-Central-Directory record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Eocd {
    pub entries_total: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

/// One central-directory entry, fields this crate consumes.
#[derive(Debug, Clone)]
pub(crate) struct CdEntry {
    pub name: Vec<u8>,
    pub flags: GpFlags,
    pub crc32: u32,
    pub method: u16,
    pub extra: Vec<u8>,
    pub lfh_offset: u32,
}

impl CdEntry {
    pub(crate) fn name_str(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Reverse-scan the tail window for the EOCD signature.
pub(crate) fn find_eocd(file: &mut BoundedFile) -> std::io::Result<Option<Eocd>> {
    let fsize = file.size();
    let search = (MAX_EOCD_SEARCH as u64).min(fsize);
    let tail = file.read_suffix(search as usize)?;

    let Some(idx) = memchr::memmem::rfind(&tail, EOCD_SIG) else {
        return Ok(None);
    };
    let pos = fsize - search + idx as u64;
    let eocd = file.read_at(pos, 22)?;
    if eocd.len() < 22 {
        return Ok(None);
    }
    // fields after the signature: disk numbers, entry counts, cd extent
    let entries_total = u16_le(&eocd, 10).unwrap_or(0);
    let cd_size = u32_le(&eocd, 12).unwrap_or(0);
    let cd_offset = u32_le(&eocd, 16).unwrap_or(0);
    let comment_len = u16_le(&eocd, 20).unwrap_or(0);
    Ok(Some(Eocd {
        entries_total,
        cd_size,
        cd_offset,
        comment_len,
    }))
}

/// Iterate central-directory headers. Stops on a broken signature, a
/// name running past the directory, or the declared entry count.
pub(crate) fn read_central_directory(
    file: &mut BoundedFile,
    eocd: &Eocd,
) -> std::io::Result<Vec<CdEntry>> {
    let data = file.read_at(eocd.cd_offset as u64, eocd.cd_size as usize)?;
    let mut entries = Vec::new();
    let mut pos = 0usize;

    while pos + CDH_FIXED_LEN <= data.len() {
        if u32_le(&data, pos) != Some(CDH_SIG) {
            break;
        }
        let gpbf = u16_le(&data, pos + 8).unwrap_or(0);
        let method = u16_le(&data, pos + 10).unwrap_or(0);
        let crc32 = u32_le(&data, pos + 16).unwrap_or(0);
        let fname_len = u16_le(&data, pos + 28).unwrap_or(0) as usize;
        let extra_len = u16_le(&data, pos + 30).unwrap_or(0) as usize;
        let comment_len = u16_le(&data, pos + 32).unwrap_or(0) as usize;
        let lfh_offset = u32_le(&data, pos + 42).unwrap_or(0);

        let name_start = pos + CDH_FIXED_LEN;
        let name_end = name_start + fname_len;
        if name_end > data.len() {
            break;
        }
        let name = data[name_start..name_end].to_vec();
        let extra_end = (name_end + extra_len).min(data.len());
        let extra = data[name_end..extra_end].to_vec();

        entries.push(CdEntry {
            name,
            flags: GpFlags::from_bits_truncate(gpbf),
            crc32,
            method,
            extra,
            lfh_offset,
        });

        pos += CDH_FIXED_LEN + fname_len + extra_len + comment_len;
        if eocd.entries_total > 0 && entries.len() >= eocd.entries_total as usize {
            break;
        }
    }

    Ok(entries)
}

pub struct ZipParser;

impl StructuralParser for ZipParser {
    fn family(&self) -> &'static str {
        "zip"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_zip(path).emit()
    }
}

pub fn parse_zip(path: &Path) -> ZipFeatures {
    parse_inner(path).unwrap_or_default()
}

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

fn parse_inner(path: &Path) -> Result<ZipFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let fsize = file.size();

    let eocd = find_eocd(&mut file)?.ok_or_else(ParseError::bad_magic)?;

    // plausibility of the declared directory extent, plus a CDH
    // signature sitting at its offset
    let in_bounds = eocd.cd_offset as u64 + eocd.cd_size as u64 <= fsize;
    let cd_offset_ok = if in_bounds {
        let sig = file.read_at(eocd.cd_offset as u64, 4)?;
        if sig.len() < 4 {
            return Err(ParseError::truncated());
        }
        u32_le(&sig, 0) == Some(CDH_SIG)
    } else {
        false
    };

    let entries = read_central_directory(&mut file, &eocd)?;
    let entry_count = entries.len() as i64;
    let mut utf8_count = 0i64;
    let mut crc_present_count = 0i64;
    let mut has_content_types = false;
    for entry in &entries {
        if entry.flags.contains(GpFlags::UTF8_NAMES) {
            utf8_count += 1;
        }
        if entry.crc32 != 0 {
            crc_present_count += 1;
        }
        if entry.name == b"[Content_Types].xml" {
            has_content_types = true;
        }
    }

    // the directory is complete when every declared entry was read
    let central_dir_ok = (eocd.entries_total == 0 && entry_count == 0)
        || entry_count == eocd.entries_total as i64;

    let utf8_fraction = if entry_count > 0 {
        round6(utf8_count as f64 / entry_count as f64)
    } else {
        0.0
    };
    let crc_fraction = if entry_count > 0 {
        round6(crc_present_count as f64 / entry_count as f64)
    } else {
        0.0
    };

    let parser_ok = central_dir_ok && cd_offset_ok && entry_count >= 1;
    let structure_consistent = parser_ok && crc_fraction >= 0.65;

    Ok(ZipFeatures {
        central_dir_ok,
        cd_offset_ok,
        entry_count,
        has_content_types,
        comment_len: eocd.comment_len as i64,
        names_utf8_fraction: utf8_fraction,
        crc_present_fraction: crc_fraction,
        parser_ok,
        structure_consistent,
    })
}
