//! Clock divisor and delay math, from physical units to engine counts.

/// SCLK divisor for a reference clock and a target SPI clock:
/// `ceil(ref / (2 * spi)) - 1`, never negative.
///
/// Rounding up keeps the effective clock at or below the requested one.
/// `spi_clk_hz` must be non-zero.
pub fn clock_divisor(ref_clk_hz: u32, spi_clk_hz: u32) -> u32 {
    debug_assert!(spi_clk_hz > 0);
    ref_clk_hz.div_ceil(2 * spi_clk_hz).saturating_sub(1)
}

/// The SCLK rate produced by a divisor.
pub fn effective_clock(ref_clk_hz: u32, divisor: u32) -> u32 {
    ref_clk_hz / (2 * (divisor + 1))
}

/// Sleep-instruction count for an idle time of at least `us` microseconds.
///
/// One sleep count lasts `(divisor + 1) * 2` reference cycles; the count is
/// rounded up so the bus idles at least as long as requested.
pub fn sleep_cycles(ref_clk_hz: u32, divisor: u32, us: u32) -> u32 {
    let ref_cycles = (ref_clk_hz as u64 / 1_000_000) * us as u64;
    let per_count = (divisor as u64 + 1) * 2;
    (ref_cycles.div_ceil(per_count).saturating_sub(1)) as u32
}

/// Transfer word count for a byte count at a given word length.
pub fn words_per_transfer(bytes: u32, word_len: u32) -> u32 {
    if bytes <= 1 {
        1
    } else {
        bytes / word_len
    }
}

/// Total capture words for a sample block: `samples * channels` words of
/// `ceil(resolution / 8)` bytes each.
pub fn sample_block_words(samples: u32, channels: u32, resolution_bits: u32) -> u32 {
    samples * channels * resolution_bits.div_ceil(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisor_keeps_effective_clock_at_or_below_target() {
        for &(ref_clk, target) in &[
            (100_000_000, 50_000_000),
            (100_000_000, 1_000_000),
            (160_000_000, 3_000_000),
            (50_000_000, 25_000_000),
            (33_333_333, 400_000),
        ] {
            let div = clock_divisor(ref_clk, target);
            assert!(effective_clock(ref_clk, div) <= target, "ref={ref_clk} target={target}");
        }
    }

    #[test]
    fn divisor_is_exact_for_even_ratios() {
        assert_eq!(clock_divisor(100_000_000, 50_000_000), 0);
        assert_eq!(clock_divisor(100_000_000, 25_000_000), 1);
        assert_eq!(clock_divisor(100_000_000, 1_000_000), 49);
    }

    #[test]
    fn divisor_never_underflows() {
        // Target above ref/2 clamps to divisor 0 (fastest the engine can do).
        assert_eq!(clock_divisor(100_000_000, 100_000_000), 0);
    }

    #[test]
    fn word_count_floors_at_one() {
        for &w in &[8, 16] {
            assert_eq!(words_per_transfer(0, w), 1);
            assert_eq!(words_per_transfer(1, w), 1);
            for b in 2..=64u32 {
                assert_eq!(words_per_transfer(b, w), b / w);
            }
        }
    }

    #[test]
    fn sleep_count_covers_requested_idle_time() {
        // 100 MHz ref, divisor 49: one count = 100 cycles = 1 us.
        let div = 49;
        let count = sleep_cycles(100_000_000, div, 5000);
        let counts_slept = count as u64 + 1;
        let cycles = counts_slept * (div as u64 + 1) * 2;
        assert!(cycles >= 5000 * 100);
        assert_eq!(count, 4999);
    }

    #[test]
    fn capture_block_sizing() {
        // 1024 samples, 2 channels, 24-bit resolution.
        assert_eq!(sample_block_words(1024, 2, 24), 6144);
        assert_eq!(sample_block_words(1024, 2, 16), 4096);
    }
}
