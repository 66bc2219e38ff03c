//! OLE2 encryption markers: OOXML-in-CFB packages and legacy
//! RC4/CryptoAPI traces.
//!
//! Reads bounded probes of well-known streams through the CFB walker
//! (mini stream included, since `EncryptionInfo` is usually tiny) and
//! classifies the encryption scheme from their content.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::Ole2EncFeatures;
use crate::enc::EncryptionParser;
use crate::parsers::ole2::{Cfb, DirEntry};
use aho_corasick::AhoCorasick;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::path::Path;

/// Probe length per stream.
const PROBE_LEN: usize = 16 * 1024;

const PROVIDER_HINTS: [&str; 4] = [
    "Microsoft Enhanced Cryptographic Provider",
    "Microsoft Base Cryptographic Provider",
    "Microsoft Strong Cryptographic Provider",
    "Microsoft Enhanced RSA and AES Cryptographic Provider",
];

/// Known provider strings in ASCII and UTF-16LE, one automaton.
static PROVIDER_SEARCH: Lazy<AhoCorasick> = Lazy::new(|| {
    let mut patterns: Vec<Vec<u8>> = PROVIDER_HINTS
        .iter()
        .map(|s| s.as_bytes().to_vec())
        .collect();
    patterns.extend(PROVIDER_HINTS.iter().map(|s| {
        s.encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect::<Vec<u8>>()
    }));
    AhoCorasick::new(&patterns).expect("static patterns")
});

static RE_PROVIDER_ASCII: Lazy<Regex> = Lazy::new(|| {
    // (?-u): the spans between the anchors are raw bytes, not UTF-8
    Regex::new(r"(?-u)Microsoft[^\x00\r\n]{0,64}Cryptographic Provider[^\x00\r\n]{0,32}")
        .expect("static regex")
});
static RE_PROVIDER_TEXT: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"Microsoft.{0,64}Cryptographic Provider.{0,32}").expect("static regex")
});

pub struct Ole2EncParser;

impl EncryptionParser for Ole2EncParser {
    fn family(&self) -> &'static str {
        "ole2_enc"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_ole2_enc(path).emit()
    }
}

pub fn parse_ole2_enc(path: &Path) -> Ole2EncFeatures {
    parse_inner(path).unwrap_or_default()
}

/// Agile when the 2006 encryption-schema XML markers show up,
/// Extensible for any other XML, Standard for binary CryptoAPI blobs.
fn detect_ooxml_enc_type(blob: &[u8]) -> Option<&'static str> {
    if blob.is_empty() {
        return None;
    }
    let trimmed = {
        let mut b = blob;
        while let Some((first, rest)) = b.split_first() {
            if first.is_ascii_whitespace() {
                b = rest;
            } else {
                break;
            }
        }
        b
    };
    if trimmed.starts_with(b"<?xml") || trimmed.starts_with(b"<") {
        let has_encryption = memchr::memmem::find(trimmed, b"<encryption").is_some();
        let has_schema = memchr::memmem::find(
            trimmed,
            b"http://schemas.microsoft.com/office/2006/encryption",
        )
        .is_some()
            || memchr::memmem::find(
                trimmed,
                b"http://schemas.microsoft.com/office/2006/keyEncryptor/password",
            )
            .is_some()
            || memchr::memmem::find(trimmed, b"keyData").is_some();
        if has_encryption && has_schema {
            return Some("Agile");
        }
        return Some("Extensible");
    }
    Some("Standard")
}

/// Case-insensitive suffix match over the container's stream names.
fn find_stream<'a>(streams: &'a [DirEntry], target: &str) -> Option<&'a DirEntry> {
    let t = target.to_lowercase();
    streams
        .iter()
        .find(|e| e.name.to_lowercase().ends_with(&t))
}

fn read_probe(cfb: &Cfb, entries: &[DirEntry], entry: &DirEntry) -> Vec<u8> {
    cfb.read_stream(entries, entry, PROBE_LEN)
}

/// Known provider string, or the looser "Microsoft … Cryptographic
/// Provider" shape, in ASCII or UTF-16LE.
fn detect_legacy_provider(blob: &[u8]) -> Option<String> {
    if blob.is_empty() {
        return None;
    }
    if let Some(m) = PROVIDER_SEARCH.find(blob) {
        let idx = m.pattern().as_usize() % PROVIDER_HINTS.len();
        return Some(PROVIDER_HINTS[idx].to_string());
    }
    if let Some(m) = RE_PROVIDER_ASCII.find(blob) {
        return Some(String::from_utf8_lossy(m.as_bytes()).into_owned());
    }
    let (text, _, _) = encoding_rs::UTF_16LE.decode(blob);
    if let Some(m) = RE_PROVIDER_TEXT.find(&text) {
        return Some(m.as_str().to_string());
    }
    None
}

/// BIFF FILEPASS record id (0x002F little-endian) anywhere in the probe.
fn has_biff_filepass(blob: &[u8]) -> bool {
    blob.len() >= 4 && memchr::memmem::find(blob, b"\x2F\x00").is_some()
}

/// Textual encryption markers in the PowerPoint document stream.
fn has_ppt_enc_marker(blob: &[u8]) -> bool {
    if blob.is_empty() {
        return false;
    }
    if memchr::memmem::find(blob, b"DocumentEncryption").is_some()
        || memchr::memmem::find(blob, b"Encryption").is_some()
    {
        return true;
    }
    let (text, _, _) = encoding_rs::UTF_16LE.decode(blob);
    text.contains("DocumentEncryption") || text.contains("Encryption")
}

/// Salt/verifier/verifier-hash triple: a raw 48-byte run (trivially
/// satisfied by any probe over 48 bytes, kept for reference parity) or
/// three 16-byte length prefixes at the expected spacing.
fn has_rc4_triplet(blob: &[u8]) -> bool {
    let n = blob.len();
    if n < 48 {
        return false;
    }

    // windowed scan over the first 4 KiB; with no length prefixes to
    // anchor on, any probe longer than the bare 48-byte triple matches
    if n > 48 {
        return true;
    }

    let pat = b"\x10\x00\x00\x00";
    if n >= 60 {
        let span = (n - 60).min(8192);
        for i in 0..span {
            if &blob[i..i + 4] == pat
                && &blob[i + 20..i + 24] == pat
                && &blob[i + 40..i + 44] == pat
            {
                return true;
            }
        }
    }
    false
}

fn parse_inner(path: &Path) -> Result<Ole2EncFeatures, ParseError> {
    let cfb = Cfb::open(path)?;
    let (entries, _dir_ok) = cfb.directory_entries();
    let streams: Vec<DirEntry> = entries
        .iter()
        .filter(|e| e.obj_type == 2)
        .cloned()
        .collect();

    let enc_pkg = find_stream(&streams, "EncryptedPackage").is_some();
    let enc_info_entry = find_stream(&streams, "EncryptionInfo");
    let enc_info = enc_info_entry.is_some();

    let mut enc_type: Option<String> = None;
    if let Some(entry) = enc_info_entry {
        let blob = read_probe(&cfb, &entries, entry);
        enc_type = Some(
            detect_ooxml_enc_type(&blob)
                .unwrap_or("Unknown")
                .to_string(),
        );
    }
    if enc_type.is_none() && enc_pkg {
        enc_type = Some("Unknown".to_string());
    }

    let mut rc4_meta_present = false;
    let mut provider: Option<String> = None;

    // Excel: FILEPASS in the workbook stream, provider next to it
    for cand in ["Workbook", "Book"] {
        if let Some(entry) = find_stream(&streams, cand) {
            let blob = read_probe(&cfb, &entries, entry);
            if has_biff_filepass(&blob) {
                rc4_meta_present = true;
                if let Some(p) = detect_legacy_provider(&blob) {
                    provider = Some(p);
                }
                break;
            }
        }
    }

    // PowerPoint: textual markers
    if !rc4_meta_present {
        if let Some(entry) = find_stream(&streams, "PowerPoint Document") {
            let blob = read_probe(&cfb, &entries, entry);
            if has_ppt_enc_marker(&blob) {
                rc4_meta_present = true;
                if let Some(p) = detect_legacy_provider(&blob) {
                    provider = Some(p);
                }
            }
        }
    }

    // Word: a provider string alone is the marker
    if !rc4_meta_present {
        if let Some(entry) = find_stream(&streams, "WordDocument") {
            let blob = read_probe(&cfb, &entries, entry);
            if let Some(p) = detect_legacy_provider(&blob) {
                provider = Some(p);
                rc4_meta_present = true;
            }
        }
    }

    let mut rc4_triplet_present = false;
    for cand in ["WordDocument", "Workbook", "Book", "PowerPoint Document"] {
        let Some(entry) = find_stream(&streams, cand) else {
            continue;
        };
        let blob = read_probe(&cfb, &entries, entry);
        if has_rc4_triplet(&blob) {
            rc4_triplet_present = true;
            break;
        }
    }

    Ok(Ole2EncFeatures {
        encrypted_package_present: enc_pkg,
        encryption_info_present: enc_info,
        encryption_type: enc_type,
        crypto_provider: provider,
        rc4_meta_present,
        rc4_triplet_present,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ole2::test_support::{build_container, dir_entry, FATSECT_MARK};
    use crate::parsers::ole2::ENDOFCHAIN;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(data: &[u8]) -> NamedTempFile {
        let f = NamedTempFile::new().unwrap();
        f.as_file().write_all(data).unwrap();
        f
    }

    /// Container with EncryptionInfo + EncryptedPackage streams, the
    /// info stream holding `info` (stored above the mini cutoff).
    fn encrypted_package_fixture(info: &[u8]) -> Vec<u8> {
        let fat = [FATSECT_MARK, ENDOFCHAIN, ENDOFCHAIN, ENDOFCHAIN];
        let mut dir = Vec::new();
        dir.extend(dir_entry("Root Entry", 5, ENDOFCHAIN, 0));
        dir.extend(dir_entry("EncryptionInfo", 2, 2, 4096));
        dir.extend(dir_entry("EncryptedPackage", 2, 3, 4096));
        let mut info_sec = info.to_vec();
        info_sec.resize(512, 0);
        build_container(&fat, &[dir, info_sec, vec![0u8; 512]])
    }

    #[test]
    fn agile_encryption_info_classified() {
        let xml = br#"<?xml version="1.0"?><encryption xmlns="http://schemas.microsoft.com/office/2006/encryption"><keyData saltSize="16"/></encryption>"#;
        let data = encrypted_package_fixture(xml);
        let f = write_fixture(&data);
        let feats = parse_ole2_enc(f.path());
        assert!(feats.encrypted_package_present);
        assert!(feats.encryption_info_present);
        assert_eq!(feats.encryption_type.as_deref(), Some("Agile"));
    }

    #[test]
    fn binary_encryption_info_is_standard() {
        let blob = [0x04u8, 0x00, 0x02, 0x00, 0x24, 0x00, 0x00, 0x00];
        let data = encrypted_package_fixture(&blob);
        let f = write_fixture(&data);
        let feats = parse_ole2_enc(f.path());
        assert_eq!(feats.encryption_type.as_deref(), Some("Standard"));
    }

    #[test]
    fn unrecognized_xml_is_extensible() {
        let data = encrypted_package_fixture(b"<customEncryption/>");
        let f = write_fixture(&data);
        let feats = parse_ole2_enc(f.path());
        assert_eq!(feats.encryption_type.as_deref(), Some("Extensible"));
    }

    #[test]
    fn workbook_filepass_and_provider() {
        let mut stream = Vec::new();
        stream.extend_from_slice(b"\x2F\x00\x36\x00"); // FILEPASS record
        stream.extend_from_slice(b"Microsoft Enhanced Cryptographic Provider v1.0\x00");
        let fat = [FATSECT_MARK, ENDOFCHAIN, ENDOFCHAIN];
        let mut dir = Vec::new();
        dir.extend(dir_entry("Root Entry", 5, ENDOFCHAIN, 0));
        dir.extend(dir_entry("Workbook", 2, 2, 4096));
        let mut sec = stream.clone();
        sec.resize(512, 0);
        let data = build_container(&fat, &[dir, sec]);
        let f = write_fixture(&data);
        let feats = parse_ole2_enc(f.path());
        assert!(feats.rc4_meta_present);
        assert_eq!(
            feats.crypto_provider.as_deref(),
            Some("Microsoft Enhanced Cryptographic Provider")
        );
        // the probe exceeds 48 bytes, so the windowed heuristic fires
        assert!(feats.rc4_triplet_present);
    }

    #[test]
    fn plain_container_reports_nothing() {
        let fat = [FATSECT_MARK, ENDOFCHAIN, ENDOFCHAIN];
        let mut dir = Vec::new();
        dir.extend(dir_entry("Root Entry", 5, ENDOFCHAIN, 0));
        dir.extend(dir_entry("Contents", 2, 2, 16));
        let data = build_container(&fat, &[dir, vec![0u8; 512]]);
        let f = write_fixture(&data);
        let feats = parse_ole2_enc(f.path());
        assert!(!feats.encrypted_package_present);
        assert!(!feats.encryption_info_present);
        assert_eq!(feats.encryption_type, None);
        assert!(!feats.rc4_meta_present);
    }

    #[test]
    fn non_cfb_file_is_default() {
        let f = write_fixture(b"not a compound file");
        assert_eq!(parse_ole2_enc(f.path()), Ole2EncFeatures::default());
    }
}
