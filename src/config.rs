//! Configuration for the extraction pipeline.
//!
//! One struct per concern with hand-written defaults; all serde-friendly
//! so an external loader can deserialize them from its own format.

use serde::{Deserialize, Serialize};

/// Master configuration consumed by the sniffer and statistics engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturizerConfig {
    pub sniffer: SnifferConfig,
    pub stats: StatsConfig,
}

/// Sniffer window sizes and the set of families with parsers enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnifferConfig {
    /// Head window read for signature tests.
    pub head_bytes: usize,
    /// Tail window; files shorter than this reuse the head window.
    pub tail_bytes: usize,
    /// Families the handler chain may report. A disabled family falls
    /// through to `"other"` even when its signature matches.
    pub enabled_families: Vec<String>,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            head_bytes: 16 * 1024,
            tail_bytes: 16 * 1024,
            enabled_families: [
                "pdf", "png", "jpeg", "gzip", "ole2", "rar", "mp4", "zip", "ooxml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl SnifferConfig {
    pub fn is_enabled(&self, family: &str) -> bool {
        self.enabled_families.iter().any(|f| f == family)
    }
}

/// Byte-statistics pass parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Streaming read chunk size.
    pub chunk_size: usize,
    /// Captured head segment and tail ring capacity.
    pub segment_size: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64 * 1024,
            segment_size: 32 * 1024,
        }
    }
}
