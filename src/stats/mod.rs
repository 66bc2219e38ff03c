//! Single-pass byte statistics: histogram, head segment, tail ring.
//!
//! The accumulator is deterministic and order-independent in its derived
//! metrics: two passes over identical bytes produce bit-for-bit equal
//! entropy, chi-square, and index-of-coincidence values.

pub mod metrics;

use crate::config::StatsConfig;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fixed-capacity ring keeping the last `cap` bytes seen.
#[derive(Debug, Clone)]
struct TailRing {
    buf: Vec<u8>,
    cap: usize,
    pos: usize,
    full: bool,
}

impl TailRing {
    fn new(cap: usize) -> Self {
        Self {
            buf: vec![0u8; cap],
            cap,
            pos: 0,
            full: false,
        }
    }

    fn extend(&mut self, chunk: &[u8]) {
        if self.cap == 0 {
            return;
        }
        // a chunk at least as large as the ring replaces it outright
        if chunk.len() >= self.cap {
            self.buf.copy_from_slice(&chunk[chunk.len() - self.cap..]);
            self.pos = 0;
            self.full = true;
            return;
        }
        for &b in chunk {
            self.buf[self.pos] = b;
            self.pos = (self.pos + 1) % self.cap;
            if self.pos == 0 {
                self.full = true;
            }
        }
    }

    fn to_vec(&self) -> Vec<u8> {
        if self.full {
            let mut out = Vec::with_capacity(self.cap);
            out.extend_from_slice(&self.buf[self.pos..]);
            out.extend_from_slice(&self.buf[..self.pos]);
            out
        } else {
            self.buf[..self.pos].to_vec()
        }
    }
}

/// Accumulated single-pass statistics over one byte stream.
#[derive(Debug, Clone)]
pub struct ByteStatistics {
    histogram: [u64; 256],
    total: u64,
    head: Vec<u8>,
    tail: TailRing,
    segment_size: usize,
}

impl ByteStatistics {
    pub fn new(segment_size: usize) -> Self {
        Self {
            histogram: [0u64; 256],
            total: 0,
            head: Vec::new(),
            tail: TailRing::new(segment_size),
            segment_size,
        }
    }

    /// Feed the next chunk of the stream.
    pub fn update(&mut self, chunk: &[u8]) {
        self.total += chunk.len() as u64;
        for &b in chunk {
            self.histogram[b as usize] += 1;
        }
        if self.head.len() < self.segment_size {
            let need = self.segment_size - self.head.len();
            self.head.extend_from_slice(&chunk[..need.min(chunk.len())]);
        }
        self.tail.extend(chunk);
    }

    pub fn histogram(&self) -> &[u64; 256] {
        &self.histogram
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn head(&self) -> &[u8] {
        &self.head
    }

    pub fn tail(&self) -> Vec<u8> {
        self.tail.to_vec()
    }

    pub fn entropy_global(&self) -> Option<f64> {
        metrics::entropy_from_counts(&self.histogram, self.total)
    }

    pub fn min_entropy_global(&self) -> Option<f64> {
        metrics::min_entropy(&self.histogram, self.total)
    }

    pub fn entropy_head(&self) -> Option<f64> {
        metrics::entropy_of_bytes(&self.head)
    }

    pub fn entropy_tail(&self) -> Option<f64> {
        metrics::entropy_of_bytes(&self.tail.to_vec())
    }

    pub fn byte_chi2(&self) -> Option<f64> {
        metrics::chi_square(&self.histogram, self.total)
    }

    pub fn ic_index(&self) -> Option<f64> {
        metrics::index_of_coincidence(&self.histogram, self.total)
    }
}

/// One streaming pass over `path` with the configured chunk size.
pub fn byte_statistics<P: AsRef<Path>>(
    path: P,
    cfg: &StatsConfig,
) -> std::io::Result<ByteStatistics> {
    let mut stats = ByteStatistics::new(cfg.segment_size);
    let mut file = File::open(path)?;
    let mut chunk = vec![0u8; cfg.chunk_size.max(1)];
    loop {
        let n = file.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        stats.update(&chunk[..n]);
    }
    Ok(stats)
}
