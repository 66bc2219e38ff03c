//! MP4 / ISO-BMFF box-tree walk.
//!
//! Boxes are iterated over `[start, end)` with the three size forms
//! (compact, 64-bit largesize, to-end-of-container). A box whose size is
//! smaller than its own header or whose end leaves the container halts
//! iteration and marks the range invalid; the walker never reads past
//! the container end.

use crate::core::errors::ParseError;
use crate::core::feature::PartialRecord;
use crate::core::records::Mp4Features;
use crate::io::BoundedFile;
use crate::parsers::{u32_be, u64_be, StructuralParser};
use std::path::Path;

const MAX_STEPS: u64 = 1_000_000;

pub struct Mp4Parser;

impl StructuralParser for Mp4Parser {
    fn family(&self) -> &'static str {
        "mp4"
    }

    fn parse(&self, path: &Path) -> PartialRecord {
        parse_mp4(path).emit()
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxInfo {
    typ: [u8; 4],
    start: u64,
    size: u64,
    header: u64,
}

enum BoxStep {
    Next(BoxInfo),
    /// clean end: no further complete header in range
    End,
    /// a box with an impossible size or extent
    Invalid,
}

/// Sequential box walker over one container range.
struct BoxWalker {
    pos: u64,
    limit: u64,
    steps: u64,
}

impl BoxWalker {
    fn new(start: u64, end: u64) -> Self {
        Self {
            pos: start,
            limit: end,
            steps: 0,
        }
    }

    fn step(&mut self, file: &mut BoundedFile) -> std::io::Result<BoxStep> {
        if self.pos + 8 > self.limit || self.steps >= MAX_STEPS {
            return Ok(BoxStep::End);
        }
        self.steps += 1;

        let head = file.read_at(self.pos, 16)?;
        if head.len() < 8 {
            return Ok(BoxStep::End);
        }
        let size32 = u32_be(&head, 0).expect("8 bytes read") as u64;
        let mut typ = [0u8; 4];
        typ.copy_from_slice(&head[4..8]);

        let (box_size, header) = if size32 == 1 {
            // 64-bit largesize follows the compact header
            let Some(largesize) = u64_be(&head, 8) else {
                return Ok(BoxStep::Invalid);
            };
            if largesize < 16 {
                return Ok(BoxStep::Invalid);
            }
            (largesize, 16)
        } else if size32 == 0 {
            // box extends to the container end
            (self.limit - self.pos, 8)
        } else {
            (size32, 8)
        };

        if box_size < header {
            return Ok(BoxStep::Invalid);
        }
        match self.pos.checked_add(box_size) {
            Some(end) if end <= self.limit => {}
            _ => return Ok(BoxStep::Invalid),
        }

        let info = BoxInfo {
            typ,
            start: self.pos,
            size: box_size,
            header,
        };
        self.pos += box_size;
        Ok(BoxStep::Next(info))
    }
}

/// Walk a range without extracting anything; true when every box header
/// encountered was coherent and in bounds.
fn validate_box_range(file: &mut BoundedFile, start: u64, end: u64) -> std::io::Result<bool> {
    let mut walker = BoxWalker::new(start, end);
    loop {
        match walker.step(file)? {
            BoxStep::Next(_) => {}
            BoxStep::End => return Ok(true),
            BoxStep::Invalid => return Ok(false),
        }
    }
}

pub fn parse_mp4(path: &Path) -> Mp4Features {
    parse_inner(path).unwrap_or_default()
}

fn parse_inner(path: &Path) -> Result<Mp4Features, ParseError> {
    let mut file = BoundedFile::open(path)?;
    let size = file.size();
    if size < 8 {
        return Err(ParseError::short_read());
    }

    let mut ftyp_present = false;
    let mut moov_present = false;
    let mut mdat_present = false;
    let mut brand = String::new();
    let mut toplevel_ok = true;

    let mut walker = BoxWalker::new(0, size);
    loop {
        match walker.step(&mut file)? {
            BoxStep::End => break,
            BoxStep::Invalid => {
                toplevel_ok = false;
                break;
            }
            BoxStep::Next(b) => match &b.typ {
                b"ftyp" => {
                    ftyp_present = true;
                    // major brand: first 4 payload bytes
                    let head = file.read_at(b.start + b.header, 8)?;
                    if head.len() >= 4 {
                        brand = head[..4]
                            .iter()
                            .filter(|c| c.is_ascii())
                            .map(|&c| c as char)
                            .collect();
                    }
                }
                b"moov" => {
                    moov_present = true;
                    let inner_ok =
                        validate_box_range(&mut file, b.start + b.header, b.start + b.size)?;
                    toplevel_ok = toplevel_ok && inner_ok;
                }
                b"mdat" => {
                    mdat_present = true;
                }
                // free, skip, wide, mfra and friends carry no signal
                _ => {}
            },
        }
    }

    let parser_ok = ftyp_present && toplevel_ok && (moov_present || mdat_present);
    let structure_consistent = ftyp_present && toplevel_ok && moov_present && mdat_present;

    Ok(Mp4Features {
        ftyp_present,
        moov_present,
        mdat_present,
        brand,
        box_tree_ok: toplevel_ok,
        parser_ok,
        structure_consistent,
    })
}
