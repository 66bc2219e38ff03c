//! JPEG marker-segment walk.
//!
//! Scans marker-delimited segments from SOI, stopping at SOS (the start
//! of entropy-coded scan data) or EOI, with a hard step cap against
//! crafted marker chains.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::JpegFeatures;
use crate::io::BoundedFile;
use crate::parsers::{u16_be, StructuralParser};
use std::path::Path;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;
const RST0: u8 = 0xD0;
const RST7: u8 = 0xD7;
const APP1: u8 = 0xE1;

const MAX_SEGMENTS: u64 = 200_000;

fn is_sof(marker: u8) -> bool {
    matches!(
        marker,
        0xC0 | 0xC1 | 0xC2 | 0xC3 | 0xC5 | 0xC6 | 0xC7 | 0xC9 | 0xCA | 0xCB | 0xCD | 0xCE | 0xCF
    )
}

pub struct JpegParser;

impl StructuralParser for JpegParser {
    fn family(&self) -> &'static str {
        "jpeg"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_jpeg(path).emit()
    }
}

pub fn parse_jpeg(path: &Path) -> JpegFeatures {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<JpegFeatures, ParseError> {
    let data = BoundedFile::open(path)?.read_all()?;
    let n = data.len();

    if n < 2 || data[0] != 0xFF || data[1] != SOI {
        return Err(ParseError::bad_magic());
    }

    let mut pos = 2usize;
    let mut steps = 0u64;
    let mut segments_count: i64 = 0;
    let mut sof_present = false;
    let mut sos_present = false;
    let mut exif_present = false;

    while pos < n && steps < MAX_SEGMENTS {
        steps += 1;

        // Inside compressed scan data the next 0xFF may be far away; once
        // SOS was seen the walk is done.
        if data[pos] != 0xFF {
            if sos_present {
                break;
            }
            match memchr::memchr(0xFF, &data[pos..]) {
                Some(idx) => pos += idx,
                None => break,
            }
        }

        // skip fill bytes
        while pos < n && data[pos] == 0xFF {
            pos += 1;
        }
        if pos >= n {
            break;
        }

        let marker = data[pos];
        pos += 1;

        // markers that carry no length field
        if (RST0..=RST7).contains(&marker) || marker == TEM {
            segments_count += 1;
            continue;
        }
        // stray SOI inside the stream
        if marker == SOI {
            segments_count += 1;
            continue;
        }
        if marker == EOI {
            segments_count += 1;
            break;
        }

        let Some(seg_len) = u16_be(&data, pos) else {
            break;
        };
        let seg_data_start = pos + 2;
        if seg_len < 2 {
            break;
        }
        let seg_data_end = seg_data_start + seg_len as usize - 2;
        if seg_data_end > n {
            break;
        }

        if is_sof(marker) {
            sof_present = true;
        }
        if marker == SOS {
            sos_present = true;
        }
        if marker == APP1
            && seg_data_start + 6 <= n
            && &data[seg_data_start..seg_data_start + 6] == b"Exif\x00\x00"
        {
            exif_present = true;
        }

        segments_count += 1;

        if marker == SOS {
            break;
        }
        pos = seg_data_end;
    }

    let parser_ok = (sof_present || sos_present) && segments_count >= 3;
    let structure_consistent = sof_present && sos_present && segments_count >= 4;

    Ok(JpegFeatures {
        header_ok: true,
        sof_present,
        sos_present,
        exif_present,
        segments_count,
        parser_ok,
        structure_consistent,
    })
}
