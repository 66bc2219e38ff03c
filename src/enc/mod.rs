//! Legitimate-encryption marker parsers.
//!
//! Only invoked for a family whose structural parser reported
//! `parser_ok = true`. Same boundary contract as the structural side:
//! failures collapse into the family's default (all-null/false) record.

pub mod ole2;
pub mod pdf;
pub mod zip;

use crate::core::feature::PartialRecord;
use std::path::Path;

/// Encryption-marker parser for one `<family>_enc` section.
pub trait EncryptionParser: Send + Sync {
    /// Section name this parser serves, e.g. `"pdf_enc"`.
    fn family(&self) -> &'static str;
    fn parse(&self, path: &Path) -> PartialRecord;
}
