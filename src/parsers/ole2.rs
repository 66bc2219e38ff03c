//! OLE2 / Compound File Binary structural walk.
//!
//! Decodes the 512-byte header, materializes the FAT by following the
//! DIFAT (cycle-guarded, capped), walks the directory stream chain, and
//! classifies directory entries. The sector tables are decoded into
//! indexable arrays once and traversed by integer index with a visited
//! set, so crafted chains terminate within the cap.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::Ole2Features;
use crate::io::BoundedFile;
use crate::parsers::{u16_le, u32_le, StructuralParser};
use std::collections::HashSet;
use std::path::Path;

pub(crate) const HEADER_SIZE: usize = 512;
pub(crate) const FREESECT: u32 = 0xFFFF_FFFF;
pub(crate) const ENDOFCHAIN: u32 = 0xFFFF_FFFE;

const CFB_SIG: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";
const DIR_ENTRY_SIZE: usize = 128;
/// Guard against cycles and oversized chains in every sector walk.
pub(crate) const MAX_SECTORS_READ: usize = 8192;

const OBJ_UNUSED: u8 = 0;
const OBJ_STORAGE: u8 = 1;
const OBJ_STREAM: u8 = 2;
const OBJ_ROOT: u8 = 5;

/// Decoded CFB header fields.
#[derive(Debug, Clone)]
pub(crate) struct CfbHeader {
    pub sector_size: u64,
    pub mini_sector_size: u64,
    pub first_dir_sector: u32,
    pub mini_stream_cutoff: u32,
    pub first_minifat: u32,
    pub num_minifat_sectors: u32,
    pub first_difat: u32,
    pub num_difat_sectors: u32,
    pub difat0: Vec<u32>,
}

/// One 128-byte directory entry, as far as this crate cares.
#[derive(Debug, Clone)]
pub(crate) struct DirEntry {
    pub name: String,
    pub obj_type: u8,
    pub start_sector: u32,
    pub size: u64,
}

/// A CFB container with its FAT decoded into an indexable table.
pub(crate) struct Cfb {
    data: Vec<u8>,
    pub header: CfbHeader,
    pub fat: Vec<u32>,
    pub fat_ok: bool,
}

impl Cfb {
    pub(crate) fn open(path: &Path) -> Result<Self, ParseError> {
        let data = BoundedFile::open(path)?.read_all()?;
        let header = parse_header(&data).ok_or_else(ParseError::bad_magic)?;
        let (fat, fat_ok) = build_fat(&data, &header);
        Ok(Self {
            data,
            header,
            fat,
            fat_ok,
        })
    }

    /// One whole sector, or empty when the index leaves the file.
    pub(crate) fn read_sector(&self, index: u32) -> &[u8] {
        sector_slice(&self.data, self.header.sector_size, index)
    }

    /// Concatenate the FAT chain starting at `start` until ENDOFCHAIN,
    /// bounded by the sector cap and a visited set.
    pub(crate) fn follow_chain(&self, start: u32) -> Vec<u8> {
        if start == FREESECT || start == ENDOFCHAIN {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = start;
        let mut hops = 0usize;
        while cur != FREESECT && cur != ENDOFCHAIN && hops < MAX_SECTORS_READ {
            if !seen.insert(cur) || cur as usize >= self.fat.len() {
                break;
            }
            let sec = self.read_sector(cur);
            if sec.len() != self.header.sector_size as usize {
                break;
            }
            out.extend_from_slice(sec);
            cur = self.fat[cur as usize];
            hops += 1;
        }
        out
    }

    /// Directory entries from the directory stream chain, plus whether
    /// every entry parsed with a coherent object type.
    pub(crate) fn directory_entries(&self) -> (Vec<DirEntry>, bool) {
        let dir_bytes = self.follow_chain(self.header.first_dir_sector);
        parse_directory_stream(&dir_bytes)
    }

    /// Bounded stream read by directory entry, transparently using the
    /// mini stream for entries below the cutoff.
    pub(crate) fn read_stream(&self, entries: &[DirEntry], entry: &DirEntry, max_len: usize) -> Vec<u8> {
        let take = entry.size.min(max_len as u64) as usize;
        if entry.size >= self.header.mini_stream_cutoff as u64 {
            let mut bytes = self.follow_chain(entry.start_sector);
            bytes.truncate(take);
            return bytes;
        }

        // mini stream path: container chain hangs off the root entry
        let Some(root) = entries.iter().find(|e| e.obj_type == OBJ_ROOT) else {
            return Vec::new();
        };
        let ministream = self.follow_chain(root.start_sector);
        let minifat_bytes = self.follow_chain(self.header.first_minifat);
        let minifat: Vec<u32> = minifat_bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        let mini = self.header.mini_sector_size as usize;
        if mini == 0 {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut cur = entry.start_sector;
        let mut hops = 0usize;
        while cur != FREESECT && cur != ENDOFCHAIN && hops < MAX_SECTORS_READ {
            if !seen.insert(cur) || cur as usize >= minifat.len() {
                break;
            }
            let off = cur as usize * mini;
            if off + mini > ministream.len() {
                break;
            }
            out.extend_from_slice(&ministream[off..off + mini]);
            if out.len() >= take {
                break;
            }
            cur = minifat[cur as usize];
            hops += 1;
        }
        out.truncate(take);
        out
    }

    /// True when no MiniFAT is declared, or its first sector is readable.
    pub(crate) fn mini_fat_ok(&self) -> bool {
        if self.header.num_minifat_sectors == 0
            || self.header.first_minifat == FREESECT
            || self.header.first_minifat == ENDOFCHAIN
        {
            return true;
        }
        let buf = self.read_sector(self.header.first_minifat);
        buf.len() == self.header.sector_size as usize
    }
}

fn sector_slice(data: &[u8], sector_size: u64, index: u32) -> &[u8] {
    // first sector starts right after the 512-byte header
    let off = HEADER_SIZE as u64 + index as u64 * sector_size;
    let end = off + sector_size;
    if end > data.len() as u64 {
        return &[];
    }
    &data[off as usize..end as usize]
}

fn parse_header(data: &[u8]) -> Option<CfbHeader> {
    if data.len() < HEADER_SIZE || &data[..8] != CFB_SIG {
        return None;
    }

    let sector_shift = u16_le(data, 0x1E)?;
    let mini_sector_shift = u16_le(data, 0x20)?;
    let first_dir_sector = u32_le(data, 0x30)?;
    let mini_stream_cutoff = u32_le(data, 0x38)?;
    let first_minifat = u32_le(data, 0x3C)?;
    let num_minifat_sectors = u32_le(data, 0x40)?;
    let first_difat = u32_le(data, 0x44)?;
    let num_difat_sectors = u32_le(data, 0x48)?;

    // inline DIFAT: 109 entries from 0x4C
    let mut difat0 = Vec::with_capacity(109);
    for i in 0..109 {
        difat0.push(u32_le(data, 0x4C + i * 4)?);
    }

    // implausible shifts would overflow every offset computation; the
    // clamp keeps reads failing instead of panicking
    let sector_size = 1u64 << sector_shift.min(48);
    let mini_sector_size = 1u64 << mini_sector_shift.min(48);

    Some(CfbHeader {
        sector_size,
        mini_sector_size,
        first_dir_sector,
        mini_stream_cutoff,
        first_minifat,
        num_minifat_sectors,
        first_difat,
        num_difat_sectors,
        difat0,
    })
}

/// Collect FAT sector indices from the inline DIFAT and the DIFAT chain,
/// then decode each referenced FAT sector into the allocation table.
fn build_fat(data: &[u8], header: &CfbHeader) -> (Vec<u32>, bool) {
    let mut fat_sector_indices: Vec<u32> = header
        .difat0
        .iter()
        .copied()
        .filter(|&s| s != FREESECT)
        .collect();

    let mut difat_sect = header.first_difat;
    let mut difat_remaining = header.num_difat_sectors;
    let mut visited = HashSet::new();
    while difat_sect != FREESECT
        && difat_sect != ENDOFCHAIN
        && difat_remaining > 0
        && visited.len() < MAX_SECTORS_READ
    {
        if !visited.insert(difat_sect) {
            break;
        }
        let buf = sector_slice(data, header.sector_size, difat_sect);
        if buf.len() != header.sector_size as usize {
            break;
        }
        let count = (header.sector_size as usize / 4).saturating_sub(1);
        for i in 0..count {
            let s = u32::from_le_bytes([buf[i * 4], buf[i * 4 + 1], buf[i * 4 + 2], buf[i * 4 + 3]]);
            if s != FREESECT {
                fat_sector_indices.push(s);
            }
        }
        difat_sect = u32::from_le_bytes([
            buf[buf.len() - 4],
            buf[buf.len() - 3],
            buf[buf.len() - 2],
            buf[buf.len() - 1],
        ]);
        difat_remaining -= 1;
    }

    let mut fat = Vec::new();
    let mut fat_ok = true;
    for &sidx in &fat_sector_indices {
        let sbuf = sector_slice(data, header.sector_size, sidx);
        if sbuf.len() != header.sector_size as usize {
            fat_ok = false;
            break;
        }
        for c in sbuf.chunks_exact(4) {
            fat.push(u32::from_le_bytes([c[0], c[1], c[2], c[3]]));
        }
    }

    if fat.is_empty() {
        fat_ok = false;
    }
    (fat, fat_ok)
}

/// Scan 128-byte directory entries. Returns the parsed entries and
/// whether the stream was coherent (an unknown object type aborts).
fn parse_directory_stream(dir_bytes: &[u8]) -> (Vec<DirEntry>, bool) {
    let mut entries = Vec::new();
    if dir_bytes.len() < DIR_ENTRY_SIZE {
        return (entries, false);
    }

    for chunk in dir_bytes.chunks_exact(DIR_ENTRY_SIZE) {
        // name: 64 UTF-16LE code units; length field counts bytes
        // including the terminating NUL
        let mut name_len = u16_le(chunk, 0x40).unwrap_or(0) as usize;
        if name_len > 128 {
            name_len = 128;
        }
        if name_len % 2 == 1 {
            name_len -= 1;
        }

        let obj_type = chunk[0x42];
        if !matches!(obj_type, OBJ_UNUSED | OBJ_STORAGE | OBJ_STREAM | OBJ_ROOT) {
            return (entries, false);
        }

        let name = if name_len > 0 {
            let (decoded, _, _) = encoding_rs::UTF_16LE.decode(&chunk[..name_len]);
            decoded.trim_end_matches('\u{0}').to_string()
        } else {
            String::new()
        };

        let start_sector = u32_le(chunk, 0x74).unwrap_or(FREESECT);
        let size = u32_le(chunk, 0x78).unwrap_or(0) as u64;

        entries.push(DirEntry {
            name,
            obj_type,
            start_sector,
            size,
        });
    }

    (entries, true)
}

pub struct Ole2Parser;

impl StructuralParser for Ole2Parser {
    fn family(&self) -> &'static str {
        "ole2"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_ole2(path).emit()
    }
}

pub fn parse_ole2(path: &Path) -> Ole2Features {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<Ole2Features, ParseError> {
    let cfb = Cfb::open(path)?;

    let (entries, dir_ok) = cfb.directory_entries();

    let mut stream_count: i64 = 0;
    let mut root_present = false;
    let mut summaryinfo_present = false;
    let mut expected_present = false;
    for entry in &entries {
        match entry.obj_type {
            OBJ_ROOT => root_present = true,
            OBJ_STREAM => stream_count += 1,
            _ => {}
        }
        if entry.name == "\u{5}SummaryInformation" {
            summaryinfo_present = true;
        }
        if matches!(
            entry.name.as_str(),
            "WordDocument" | "Workbook" | "PowerPoint Document"
        ) {
            expected_present = true;
        }
    }

    let mini_fat_ok = cfb.mini_fat_ok();

    let parser_ok = dir_ok && root_present && cfb.fat_ok && stream_count >= 1;
    let structure_consistent = parser_ok
        && (expected_present || summaryinfo_present)
        && (mini_fat_ok || stream_count <= 1);

    Ok(Ole2Features {
        dir_ok,
        stream_count,
        fat_ok: cfb.fat_ok,
        mini_fat_ok,
        root_entry_present: root_present,
        summaryinfo_present,
        expected_streams_present: expected_present,
        parser_ok,
        structure_consistent,
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
    fn word_like_container_is_consistent() {
        let data = word_fixture(b"word body bytes");
        let f = write_fixture(&data);
        let feats = parse_ole2(f.path());
        assert!(feats.dir_ok);
        assert!(feats.fat_ok);
        assert!(feats.root_entry_present);
        assert!(feats.summaryinfo_present);
        assert!(feats.expected_streams_present);
        assert_eq!(feats.stream_count, 2);
        assert!(feats.mini_fat_ok);
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
    }

    #[test]
    fn bad_signature_is_default() {
        let f = write_fixture(&vec![0u8; 1024]);
        assert_eq!(parse_ole2(f.path()), Ole2Features::default());
    }

    #[test]
    fn short_file_is_default() {
        let f = write_fixture(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1 too short");
        assert_eq!(parse_ole2(f.path()), Ole2Features::default());
    }

    #[test]
    fn cyclic_fat_chain_terminates() {
        // directory chain: sector 1 -> 2 -> 1 (cycle)
        let fat = [FATSECT_MARK, 2, 1];
        let mut dir = Vec::new();
        dir.extend(dir_entry("Root Entry", OBJ_ROOT, ENDOFCHAIN, 0));
        dir.extend(dir_entry("Workbook", OBJ_STREAM, ENDOFCHAIN, 0));
        let data = build_container(&fat, &[dir.clone(), dir]);
        let f = write_fixture(&data);
        // must return, not hang; the cycle still yields readable entries
        let feats = parse_ole2(f.path());
        assert!(feats.dir_ok);
        assert!(feats.root_entry_present);
    }

    #[test]
    fn unknown_object_type_breaks_directory() {
        let fat = [FATSECT_MARK, ENDOFCHAIN];
        let mut dir = Vec::new();
        dir.extend(dir_entry("Root Entry", OBJ_ROOT, ENDOFCHAIN, 0));
        let mut bogus = dir_entry("Weird", OBJ_STREAM, ENDOFCHAIN, 0);
        bogus[0x42] = 9; // invalid object type
        dir.extend(bogus);
        let data = build_container(&fat, &[dir]);
        let f = write_fixture(&data);
        let feats = parse_ole2(f.path());
        assert!(!feats.dir_ok);
        assert!(!feats.parser_ok);
    }
}
