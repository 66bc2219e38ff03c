//! Pure statistical metrics over a 256-bin byte histogram.
//!
//! Every metric returns `None` when it is undefined for the input (empty
//! data, or a single byte for the index of coincidence) rather than a
//! sentinel value.

/// Shannon entropy in bits per byte over a pre-built histogram.
pub fn entropy_from_counts(counts: &[u64; 256], total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let n = total as f64;
    let mut h = 0.0;
    for &c in counts.iter() {
        if c == 0 {
            continue;
        }
        let p = c as f64 / n;
        h -= p * p.log2();
    }
    Some(h)
}

/// Shannon entropy of a raw buffer.
pub fn entropy_of_bytes(data: &[u8]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    entropy_from_counts(&counts, data.len() as u64)
}

/// Min-entropy: `-log2` of the most frequent byte's probability.
pub fn min_entropy(counts: &[u64; 256], total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let m = *counts.iter().max().expect("histogram is non-empty");
    if m == 0 {
        return None;
    }
    let p_max = m as f64 / total as f64;
    Some(-p_max.log2())
}

/// Chi-square statistic against a uniform 256-bin expectation.
pub fn chi_square(counts: &[u64; 256], total: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let expected = total as f64 / 256.0;
    let mut chi2 = 0.0;
    for &c in counts.iter() {
        let diff = c as f64 - expected;
        chi2 += diff * diff / expected;
    }
    Some(chi2)
}

/// Index of coincidence: probability two randomly drawn bytes are equal.
pub fn index_of_coincidence(counts: &[u64; 256], total: u64) -> Option<f64> {
    if total <= 1 {
        return None;
    }
    let numerator: u128 = counts.iter().map(|&c| c as u128 * (c as u128).saturating_sub(1)).sum();
    let denominator = total as u128 * (total as u128 - 1);
    Some(numerator as f64 / denominator as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist_of(data: &[u8]) -> [u64; 256] {
        let mut h = [0u64; 256];
        for &b in data {
            h[b as usize] += 1;
        }
        h
    }

    #[test]
    fn empty_input_is_undefined() {
        let h = [0u64; 256];
        assert_eq!(entropy_from_counts(&h, 0), None);
        assert_eq!(min_entropy(&h, 0), None);
        assert_eq!(chi_square(&h, 0), None);
        assert_eq!(index_of_coincidence(&h, 0), None);
        assert_eq!(index_of_coincidence(&h, 1), None);
        assert_eq!(entropy_of_bytes(b""), None);
    }

    #[test]
    fn constant_buffer_has_zero_entropy_and_unit_ic() {
        let data = vec![0x41u8; 4096];
        let h = hist_of(&data);
        let e = entropy_from_counts(&h, 4096).unwrap();
        assert!(e.abs() < 1e-9);
        assert!((index_of_coincidence(&h, 4096).unwrap() - 1.0).abs() < 1e-9);
        assert!(min_entropy(&h, 4096).unwrap().abs() < 1e-9);
    }

    #[test]
    fn uniform_bytes_hit_eight_bits() {
        let data: Vec<u8> = (0..=255u8).cycle().take(256 * 16).collect();
        let h = hist_of(&data);
        let e = entropy_from_counts(&h, data.len() as u64).unwrap();
        assert!((e - 8.0).abs() < 1e-9);
        // perfectly uniform histogram: chi-square collapses to zero
        assert!(chi_square(&h, data.len() as u64).unwrap().abs() < 1e-9);
        // IC for uniform data sits near 1/256
        let ic = index_of_coincidence(&h, data.len() as u64).unwrap();
        assert!((ic - 1.0 / 256.0).abs() < 1e-3);
    }
}
