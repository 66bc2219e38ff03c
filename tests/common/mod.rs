//! Shared fixture builders for the integration tests.

#![allow(dead_code)]

use std::io::Write;
use tempfile::NamedTempFile;

pub fn write_fixture(data: &[u8]) -> NamedTempFile {
    let f = NamedTempFile::new().unwrap();
    f.as_file().write_all(data).unwrap();
    f
}

/// Deterministic pseudo-random bytes (LCG, no external crates).
pub fn lcg_bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect()
}

// ---- GZIP ----

/// The minimal valid deflate member header, MTIME zero, OS 3 (unix).
pub fn gzip_minimal() -> Vec<u8> {
    vec![0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03]
}

// ---- PNG ----

pub fn png_chunk(ctype: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(ctype);
    out.extend_from_slice(payload);
    out.extend_from_slice(&[0u8; 4]);
    out
}

pub fn png_minimal() -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend(png_chunk(b"IHDR", &[0u8; 13]));
    data.extend(png_chunk(b"IDAT", b""));
    data.extend(png_chunk(b"IEND", b""));
    data
}

// ---- MP4 ----

pub fn mp4_box(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(typ);
    out.extend_from_slice(payload);
    out
}

pub fn mp4_minimal() -> Vec<u8> {
    let mut data = mp4_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso2");
    data.extend(mp4_box(b"moov", &mp4_box(b"mvhd", &[0u8; 32])));
    data.extend(mp4_box(b"mdat", &[0xABu8; 32]));
    data
}

// ---- ZIP ----

pub struct ZipEntry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub gpbf: u16,
    pub crc32: u32,
    pub method: u16,
    pub extra: Vec<u8>,
}

impl ZipEntry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            gpbf: 0,
            crc32: if data.is_empty() { 0 } else { 0xDEAD_BEEF },
            method: 0,
            extra: Vec::new(),
        }
    }
}

pub fn build_zip(entries: &[ZipEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::new();

    for e in entries {
        offsets.push(out.len() as u32);
        out.extend_from_slice(&0x0403_4B50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&e.gpbf.to_le_bytes());
        out.extend_from_slice(&e.method.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&e.crc32.to_le_bytes());
        out.extend_from_slice(&(e.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&e.name);
        out.extend_from_slice(&e.data);
    }

    let cd_offset = out.len() as u32;
    for (e, &off) in entries.iter().zip(&offsets) {
        out.extend_from_slice(&0x0201_4B50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&e.gpbf.to_le_bytes());
        out.extend_from_slice(&e.method.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&e.crc32.to_le_bytes());
        out.extend_from_slice(&(e.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(e.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&(e.extra.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&[0u8; 2]);
        out.extend_from_slice(&[0u8; 2]);
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&off.to_le_bytes());
        out.extend_from_slice(&e.name);
        out.extend_from_slice(&e.extra);
    }
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

pub fn docx_zip() -> Vec<u8> {
    build_zip(&[
        ZipEntry::stored(
            "[Content_Types].xml",
            b"<?xml version=\"1.0\"?><Types xmlns=\"ct\"><Override/></Types>",
        ),
        ZipEntry::stored("_rels/.rels", b"<Relationships/>"),
        ZipEntry::stored("word/_rels/document.xml.rels", b"<Relationships/>"),
        ZipEntry::stored("word/document.xml", b"<w:document/>"),
    ])
}

// ---- OLE2 / CFB ----

pub const CFB_FREESECT: u32 = 0xFFFF_FFFF;
pub const CFB_ENDOFCHAIN: u32 = 0xFFFF_FFFE;
pub const CFB_FATSECT: u32 = 0xFFFF_FFFD;

pub fn cfb_dir_entry(name: &str, obj_type: u8, start: u32, size: u32) -> Vec<u8> {
    let mut entry = vec![0u8; 128];
    let utf16: Vec<u8> = name.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    let name_bytes = utf16.len().min(126);
    entry[..name_bytes].copy_from_slice(&utf16[..name_bytes]);
    entry[0x40..0x42].copy_from_slice(&((name_bytes + 2) as u16).to_le_bytes());
    entry[0x42] = obj_type;
    entry[0x74..0x78].copy_from_slice(&start.to_le_bytes());
    entry[0x78..0x7C].copy_from_slice(&size.to_le_bytes());
    entry
}

/// Header + FAT sector 0 + caller sectors, 512-byte sectors throughout.
pub fn cfb_container(fat: &[u32], sectors: &[Vec<u8>]) -> Vec<u8> {
    let mut header = vec![0u8; 512];
    header[..8].copy_from_slice(b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1");
    header[0x1E..0x20].copy_from_slice(&9u16.to_le_bytes());
    header[0x20..0x22].copy_from_slice(&6u16.to_le_bytes());
    header[0x30..0x34].copy_from_slice(&1u32.to_le_bytes());
    header[0x38..0x3C].copy_from_slice(&4096u32.to_le_bytes());
    header[0x3C..0x40].copy_from_slice(&CFB_ENDOFCHAIN.to_le_bytes());
    header[0x44..0x48].copy_from_slice(&CFB_ENDOFCHAIN.to_le_bytes());
    header[0x4C..0x50].copy_from_slice(&0u32.to_le_bytes());
    for i in 1..109 {
        let off = 0x4C + i * 4;
        header[off..off + 4].copy_from_slice(&CFB_FREESECT.to_le_bytes());
    }

    let mut fat_sector = vec![0u8; 512];
    for i in 0..128 {
        let v = fat.get(i).copied().unwrap_or(CFB_FREESECT);
        fat_sector[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }

    let mut data = header;
    data.extend_from_slice(&fat_sector);
    for s in sectors {
        let mut sec = s.clone();
        sec.resize(512, 0);
        data.extend_from_slice(&sec);
    }
    data
}

/// A Word-shaped document: root + WordDocument + SummaryInformation.
pub fn cfb_word_doc() -> Vec<u8> {
    let fat = [CFB_FATSECT, CFB_ENDOFCHAIN, CFB_ENDOFCHAIN, CFB_ENDOFCHAIN];
    let mut dir = Vec::new();
    dir.extend(cfb_dir_entry("Root Entry", 5, CFB_ENDOFCHAIN, 0));
    dir.extend(cfb_dir_entry("WordDocument", 2, 2, 4096));
    dir.extend(cfb_dir_entry("\u{5}SummaryInformation", 2, 3, 4096));
    cfb_container(&fat, &[dir, vec![0x42u8; 512], vec![0u8; 512]])
}

// ---- RAR ----

pub fn rar4_block(block_type: u8, flags: u16, add_data: Option<&[u8]>) -> Vec<u8> {
    let has_add = add_data.is_some();
    let flags = if has_add { flags | 0x8000 } else { flags };
    let head_size: u16 = if has_add { 11 } else { 7 };
    let mut out = Vec::new();
    out.extend_from_slice(&0u16.to_le_bytes());
    out.push(block_type);
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&head_size.to_le_bytes());
    if let Some(d) = add_data {
        out.extend_from_slice(&(d.len() as u32).to_le_bytes());
        out.extend_from_slice(d);
    }
    out
}

pub fn rar4_archive(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"Rar!\x1A\x07\x00".to_vec();
    for b in blocks {
        out.extend_from_slice(b);
    }
    out
}

// ---- PDF ----

pub fn pdf_minimal() -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(b"%PDF-1.4\n");
    body.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    body.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
    let xref_pos = body.len();
    body.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
    body.extend_from_slice(b"0000000009 00000 n \n0000000060 00000 n \n");
    body.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R /ID [<31323334> <31323334>] >>\n");
    body.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_pos).as_bytes());
    body
}

pub fn pdf_encrypted() -> Vec<u8> {
    let mut body = pdf_minimal();
    // splice an /Encrypt reference and dictionary before EOF
    let tail = b"9 0 obj\n<< /Filter /Standard /V 2 /EncryptMetadata false >>\nendobj\ntrailer\n<< /Size 9 /Root 1 0 R /Encrypt 9 0 R >>\n%%EOF\n";
    body.extend_from_slice(tail);
    body
}
