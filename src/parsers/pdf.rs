//! PDF trailer and cross-reference plausibility walk.
//!
//! Works entirely over bounded head/tail windows: version digits after
//! `%PDF-`, a reverse `startxref` hunt, a small window around the
//! declared xref offset (classical table or cross-reference stream),
//! `/Root` and `/ID` key presence in the tail, and a smoothed
//! object-count estimate.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::PdfFeatures;
use crate::io::BoundedFile;
use crate::parsers::StructuralParser;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::path::Path;

const HEAD_READ: usize = 64 * 1024;
const TAIL_READ: usize = 128 * 1024;
const STARTXREF_SCAN: usize = 256 * 1024;
const NEAR_WINDOW: usize = 4096;

static RE_CLASSIC_XREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)xref\s+((?:\d+\s+\d+\s*)+)").expect("static regex"));
static RE_SUBSECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+(\d+)").expect("static regex"));
static RE_XREF_SIZE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/Size\s+(\d+)").expect("static regex"));
static RE_OBJ_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\s+0\s+obj").expect("static regex"));

pub struct PdfParser;

impl StructuralParser for PdfParser {
    fn family(&self) -> &'static str {
        "pdf"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_pdf(path).emit()
    }
}

pub fn parse_pdf(path: &Path) -> PdfFeatures {
    parse_inner(path).unwrap_or_default()
}

/// Version digits right after `%PDF-`. Zero parses to absent.
fn sniff_version(head: &[u8]) -> Option<f64> {
    if !head.starts_with(b"%PDF-") {
        return None;
    }
    let raw = head.get(5..8)?;
    let text: String = raw
        .iter()
        .map(|&b| b as char)
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let ver: f64 = text.parse().ok()?;
    if ver == 0.0 {
        None
    } else {
        Some(ver)
    }
}

/// Reverse-search the last `STARTXREF_SCAN` bytes for `startxref` and
/// the ASCII integer following it.
fn find_startxref(file: &mut BoundedFile) -> std::io::Result<(bool, Option<u64>)> {
    let scan = STARTXREF_SCAN.min(file.size() as usize);
    let tail = file.read_suffix(scan)?;
    let Some(idx) = memchr::memmem::rfind(&tail, b"startxref") else {
        return Ok((false, None));
    };
    let after_start = idx + b"startxref".len();
    let after_end = (after_start + 64).min(tail.len());
    let mut digits = String::new();
    for &b in &tail[after_start..after_end] {
        if b.is_ascii_digit() {
            digits.push(b as char);
        } else if !digits.is_empty() {
            break;
        }
    }
    Ok((true, digits.parse().ok()))
}

/// Classical `xref` table or `/Type /XRef` stream near the offset, plus
/// the declared table size when one is readable.
fn check_xref_at_offset(
    file: &mut BoundedFile,
    xref_off: Option<u64>,
) -> std::io::Result<(bool, bool, Option<u64>)> {
    let Some(off) = xref_off else {
        return Ok((false, false, None));
    };
    let start = off.saturating_sub(16);
    let buf = file.read_at(start, NEAR_WINDOW)?;
    if buf.is_empty() {
        return Ok((false, false, None));
    }

    let probe = &buf[..buf.len().min(128)];
    let classic = memchr::memmem::find(probe, b"xref").is_some();
    let has_trailer_kw = memchr::memmem::find(&buf, b"trailer").is_some();
    let xref_stream = memchr::memmem::find(&buf, b"/Type").is_some()
        && memchr::memmem::find(&buf, b"/XRef").is_some();

    let xref_ok = classic || xref_stream;

    let mut xref_size: Option<u64> = None;
    if classic {
        // sum the per-subsection entry counts
        if let Some(caps) = RE_CLASSIC_XREF.captures(&buf) {
            let body = caps.get(1).map(|m| m.as_bytes()).unwrap_or(b"");
            let mut sum = 0u64;
            let mut any = false;
            for pair in RE_SUBSECTION.captures_iter(body) {
                if let Some(count) = pair.get(2) {
                    if let Ok(v) = std::str::from_utf8(count.as_bytes())
                        .unwrap_or("")
                        .parse::<u64>()
                    {
                        sum = sum.saturating_add(v);
                        any = true;
                    }
                }
            }
            if any {
                xref_size = Some(sum);
            }
        }
    } else if xref_stream {
        if let Some(caps) = RE_XREF_SIZE.captures(&buf) {
            xref_size = caps
                .get(1)
                .and_then(|m| std::str::from_utf8(m.as_bytes()).ok())
                .and_then(|s| s.parse().ok());
        }
    }

    Ok((xref_ok, has_trailer_kw, xref_size))
}

/// Count `N 0 obj` tokens over bounded head and tail buffers.
fn scan_obj_tokens(file: &mut BoundedFile, cap_kib: u64) -> std::io::Result<u64> {
    let total = file.size();
    let max_bytes = cap_kib * 1024;

    let head_n = max_bytes.min(total);
    let head = file.read_at(0, head_n as usize)?;
    let tail_n = max_bytes.min(total - head.len() as u64);
    let tail = if tail_n > 0 {
        file.read_at(total - tail_n, tail_n as usize)?
    } else {
        Vec::new()
    };

    let mut combined = head;
    combined.push(b'\n');
    combined.extend_from_slice(&tail);
    Ok(RE_OBJ_TOKEN.find_iter(&combined).count() as u64)
}

fn parse_inner(path: &Path) -> Result<PdfFeatures, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let size = file.size();
    let head = file.read_prefix(HEAD_READ)?;

    let version = sniff_version(&head);

    let (startxref_found, xref_off) = find_startxref(&mut file)?;
    let (xref_ok, has_trailer, xref_size) = if startxref_found {
        check_xref_at_offset(&mut file, xref_off)?
    } else {
        (false, false, None)
    };

    let tail = file.read_suffix(TAIL_READ.min(size as usize))?;
    let root_present = memchr::memmem::find(&tail, b"/Root").is_some();
    let ids_present = memchr::memmem::find(&tail, b"/ID").is_some();

    let trailer_ok = startxref_found && xref_ok && (has_trailer || root_present);

    let obj_count = match xref_size {
        Some(n) if xref_ok && n > 0 => n,
        _ => {
            let cap_kib = (size / 4096).clamp(512, 4096);
            scan_obj_tokens(&mut file, cap_kib)?
        }
    };
    let obj_count_est = (obj_count as f64).ln_1p();

    let parser_ok = (has_trailer && startxref_found) || xref_ok || trailer_ok;
    let structure_consistent = parser_ok
        && ((xref_ok && trailer_ok && root_present)
            || (trailer_ok && root_present && ids_present));

    Ok(PdfFeatures {
        version,
        has_trailer,
        startxref_found,
        xref_ok,
        ids_present,
        root_present,
        trailer_ok,
        obj_count_est,
        parser_ok,
        structure_consistent,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    /// A tiny classical-xref PDF with `/Root` and `/ID` in the trailer.
    pub(crate) fn minimal_pdf() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(b"%PDF-1.4\n");
        body.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
        body.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n");
        let xref_pos = body.len();
        body.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
        body.extend_from_slice(b"0000000009 00000 n \n0000000060 00000 n \n");
        body.extend_from_slice(
            b"trailer\n<< /Size 3 /Root 1 0 R /ID [<31323334> <31323334>] >>\n",
        );
        body.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_pos).as_bytes());
        body
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::minimal_pdf;
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fixture(data: &[u8]) -> NamedTempFile {
        let f = NamedTempFile::new().unwrap();
        f.as_file().write_all(data).unwrap();
        f
    }

    #[test]
    fn classical_pdf_is_consistent() {
        let f = write_fixture(&minimal_pdf());
        let feats = parse_pdf(f.path());
        assert_eq!(feats.version, Some(1.4));
        assert!(feats.startxref_found);
        assert!(feats.xref_ok);
        assert!(feats.has_trailer);
        assert!(feats.root_present);
        assert!(feats.ids_present);
        assert!(feats.trailer_ok);
        assert!(feats.parser_ok);
        assert!(feats.structure_consistent);
        // declared-size estimate: the subsection sum also swallows the
        // first free-entry line (0 65535), log1p-smoothed
        assert!((feats.obj_count_est - 65538.0f64.ln_1p()).abs() < 1e-9);
    }

    #[test]
    fn xref_stream_counts_as_xref() {
        let mut body: Vec<u8> = b"%PDF-1.7\n".to_vec();
        let xref_pos = body.len();
        body.extend_from_slice(b"5 0 obj\n<< /Type /XRef /Size 6 /Root 1 0 R /W [1 2 1] >>\nstream\nendstream\nendobj\n");
        body.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_pos).as_bytes());
        let f = write_fixture(&body);
        let feats = parse_pdf(f.path());
        assert!(feats.xref_ok);
        assert!(!feats.has_trailer);
        assert!(feats.root_present);
        assert!(feats.trailer_ok);
        assert!(feats.parser_ok);
    }

    #[test]
    fn no_startxref_falls_back_to_token_scan() {
        let body = b"%PDF-1.5\n1 0 obj\n<<>>\nendobj\n2 0 obj\n<<>>\nendobj\n".to_vec();
        let f = write_fixture(&body);
        let feats = parse_pdf(f.path());
        assert!(!feats.startxref_found);
        assert!(!feats.parser_ok);
        // two "N 0 obj" tokens, log1p-smoothed
        assert!((feats.obj_count_est - 3.0f64.ln()).abs() < 1e-9);
    }

    #[test]
    fn garbage_offset_still_reports_startxref() {
        let body = b"%PDF-1.4\nstartxref\n999999\n%%EOF\n".to_vec();
        let f = write_fixture(&body);
        let feats = parse_pdf(f.path());
        assert!(feats.startxref_found);
        assert!(!feats.xref_ok);
        assert!(!feats.structure_consistent);
    }

    #[test]
    fn non_pdf_has_no_version() {
        let f = write_fixture(b"just text, nothing else");
        let feats = parse_pdf(f.path());
        assert_eq!(feats.version, None);
        assert!(!feats.parser_ok);
    }
}
