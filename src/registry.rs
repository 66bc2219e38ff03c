//! Static parser registries.
//!
//! Format families map to their parser implementations through tables
//! built once at first use; unknown families simply have no parser.

use crate::enc::{ole2::Ole2EncParser, pdf::PdfEncParser, zip::ZipEncParser, EncryptionParser};
use crate::parsers::{
    gzip::GzipParser, jpeg::JpegParser, mp4::Mp4Parser, ole2::Ole2Parser, ooxml::OoxmlParser,
    pdf::PdfParser, png::PngParser, rar::RarParser, zip::ZipParser, StructuralParser,
};
use once_cell::sync::Lazy;
use std::collections::HashMap;

static GZIP: GzipParser = GzipParser;
static JPEG: JpegParser = JpegParser;
static PNG: PngParser = PngParser;
static MP4: Mp4Parser = Mp4Parser;
static OLE2: Ole2Parser = Ole2Parser;
static ZIP: ZipParser = ZipParser;
static OOXML: OoxmlParser = OoxmlParser;
static RAR: RarParser = RarParser;
static PDF: PdfParser = PdfParser;

static OLE2_ENC: Ole2EncParser = Ole2EncParser;
static PDF_ENC: PdfEncParser = PdfEncParser;
static ZIP_ENC: ZipEncParser = ZipEncParser;

static STRUCTURAL: Lazy<HashMap<&'static str, &'static dyn StructuralParser>> = Lazy::new(|| {
    let parsers: [&'static dyn StructuralParser; 9] = [
        &GZIP, &JPEG, &PNG, &MP4, &OLE2, &ZIP, &OOXML, &RAR, &PDF,
    ];
    parsers.iter().map(|p| (p.family(), *p)).collect()
});

static ENCRYPTION: Lazy<HashMap<&'static str, &'static dyn EncryptionParser>> = Lazy::new(|| {
    let parsers: [&'static dyn EncryptionParser; 3] = [&OLE2_ENC, &PDF_ENC, &ZIP_ENC];
    parsers.iter().map(|p| (p.family(), *p)).collect()
});

/// Structural parser for a format family, if one exists.
pub fn get_parser(family: &str) -> Option<&'static dyn StructuralParser> {
    STRUCTURAL.get(family).copied()
}

/// Encryption parser for a `<family>_enc` name, if one exists.
pub fn get_parser_enc(family: &str) -> Option<&'static dyn EncryptionParser> {
    ENCRYPTION.get(family).copied()
}

/// Families with a structural parser, sorted.
pub fn available_families() -> Vec<&'static str> {
    let mut names: Vec<_> = STRUCTURAL.keys().copied().collect();
    names.sort_unstable();
    names
}

/// `_enc` sections with an encryption parser, sorted.
pub fn available_families_enc() -> Vec<&'static str> {
    let mut names: Vec<_> = ENCRYPTION.keys().copied().collect();
    names.sort_unstable();
    names
}
