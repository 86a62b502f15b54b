// src/download/rate_limit.rs
// =============================================================================
// Download speed throttling.
//
// A rate limit is given on the command line as a magnitude plus a unit
// suffix: "400k" = 400 KiB/s, "2M" = 2 MiB/s (case-insensitive). Parsing
// happens during flag validation so a bad spec is reported before any
// network activity starts.
//
// The throttle itself is deliberately simple: after each chunk is consumed
// it compares how long the transfer *should* have taken at the configured
// rate with how long it actually took, and sleeps the difference. Short
// bursts up to one read buffer pass through; the long-run average never
// exceeds the limit.
// =============================================================================

use anyhow::{anyhow, bail, Result};
use std::time::Duration;
use tokio::time::Instant;

/// Read/write buffer size used by every streaming download (32 KiB).
pub const CHUNK_SIZE: usize = 32 * 1024;

/// A parsed `--rate-limit` value, in bytes per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    bytes_per_sec: u64,
}

impl RateLimit {
    /// Parses a spec like `400k` or `2M` into bytes per second.
    ///
    /// The suffix is required: `k`/`K` = KiB/s, `m`/`M` = MiB/s.
    pub fn parse(spec: &str) -> Result<RateLimit> {
        let spec = spec.trim();
        let unit = match spec.chars().last() {
            Some(c) => c,
            None => bail!("empty rate limit"),
        };
        let digits = &spec[..spec.len() - unit.len_utf8()];

        let multiplier: u64 = match unit {
            'k' | 'K' => 1024,
            'm' | 'M' => 1024 * 1024,
            _ => bail!("invalid rate limit '{}': expected a k or m suffix", spec),
        };
        let magnitude: u64 = digits
            .parse()
            .map_err(|_| anyhow!("invalid rate limit magnitude '{}'", spec))?;
        if magnitude == 0 {
            bail!("rate limit must be greater than zero");
        }

        Ok(RateLimit {
            bytes_per_sec: magnitude * multiplier,
        })
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Starts a throttle clock for one transfer.
    pub fn throttler(&self) -> Throttle {
        Throttle {
            bytes_per_sec: self.bytes_per_sec,
            started: Instant::now(),
            consumed: 0,
        }
    }
}

/// Per-transfer pacing state. One chunk of slack is allowed, so small
/// responses finish without sleeping at all.
pub struct Throttle {
    bytes_per_sec: u64,
    started: Instant,
    consumed: u64,
}

impl Throttle {
    /// Records `n` bytes read and sleeps long enough to keep the average
    /// transfer rate at or below the configured limit.
    pub async fn consume(&mut self, n: usize) {
        self.consumed += n as u64;
        let expected = Duration::from_secs_f64(self.consumed as f64 / self.bytes_per_sec as f64);
        let elapsed = self.started.elapsed();
        if expected > elapsed {
            tokio::time::sleep(expected - elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kilobytes() {
        assert_eq!(RateLimit::parse("100k").unwrap().bytes_per_sec(), 102_400);
        assert_eq!(RateLimit::parse("100K").unwrap().bytes_per_sec(), 102_400);
    }

    #[test]
    fn test_parse_megabytes() {
        assert_eq!(
            RateLimit::parse("2M").unwrap().bytes_per_sec(),
            2 * 1024 * 1024
        );
        assert_eq!(
            RateLimit::parse("2m").unwrap().bytes_per_sec(),
            2 * 1024 * 1024
        );
    }

    #[test]
    fn test_parse_rejects_bad_suffix() {
        assert!(RateLimit::parse("100").is_err());
        assert!(RateLimit::parse("100x").is_err());
        assert!(RateLimit::parse("fast").is_err());
        assert!(RateLimit::parse("").is_err());
        assert!(RateLimit::parse("k").is_err());
        assert!(RateLimit::parse("0k").is_err());
    }

    // With a paused clock, tokio::time::sleep advances virtual time instantly,
    // so this measures the pacing math rather than real wall-clock delay.
    #[tokio::test(start_paused = true)]
    async fn test_throttle_paces_one_megabyte_at_100k() {
        let limit = RateLimit::parse("100k").unwrap();
        let mut throttle = limit.throttler();
        let started = Instant::now();

        // 1 MiB in 32 KiB chunks at 100 KiB/s needs a bit over 10 seconds
        for _ in 0..32 {
            throttle.consume(CHUNK_SIZE).await;
        }

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(12), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_transfer_is_not_delayed() {
        let limit = RateLimit::parse("1M").unwrap();
        let mut throttle = limit.throttler();
        let started = Instant::now();

        throttle.consume(1024).await;

        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
