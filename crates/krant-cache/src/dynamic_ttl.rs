//! Dynamic TTL scaling helper (C11, §4.11).

use std::time::Duration;

const ONE_KIB: usize = 1024;
const ONE_MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessFrequency {
    Low,
    Medium,
    High,
}

impl AccessFrequency {
    fn multiplier(self) -> f64 {
        match self {
            AccessFrequency::Low => 0.5,
            AccessFrequency::Medium => 2.0,
            AccessFrequency::High => 3.0,
        }
    }
}

fn size_bucket_multiplier(size_bytes: usize) -> f64 {
    if size_bytes < ONE_KIB {
        2.0
    } else if size_bytes > ONE_MIB {
        0.5
    } else {
        1.0
    }
}

/// Scales `base_ttl` by access frequency, then by size bucket, per §4.11.
pub fn dynamic_ttl(base_ttl: Duration, size_bytes: usize, frequency: AccessFrequency) -> Duration {
    let scaled_secs =
        base_ttl.as_secs_f64() * frequency.multiplier() * size_bucket_multiplier(size_bytes);
    Duration::from_secs_f64(scaled_secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_frequency_small_value_gets_longest_ttl() {
        let base = Duration::from_secs(60);
        let ttl = dynamic_ttl(base, 512, AccessFrequency::High);
        // 60 * 3 (high) * 2 (< 1 KiB) = 360s
        assert_eq!(ttl, Duration::from_secs(360));
    }

    #[test]
    fn low_frequency_large_value_gets_shortest_ttl() {
        let base = Duration::from_secs(60);
        let ttl = dynamic_ttl(base, 2 * ONE_MIB, AccessFrequency::Low);
        // 60 * 0.5 (low) * 0.5 (> 1 MiB) = 15s
        assert_eq!(ttl, Duration::from_secs(15));
    }

    #[test]
    fn medium_frequency_mid_size_leaves_base_untouched_by_bucket() {
        let base = Duration::from_secs(60);
        let ttl = dynamic_ttl(base, ONE_KIB * 4, AccessFrequency::Medium);
        // 60 * 2 (medium) * 1 (mid bucket) = 120s
        assert_eq!(ttl, Duration::from_secs(120));
    }
}
