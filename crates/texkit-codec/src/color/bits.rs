//! Channel width conversion between 8-bit values and narrower fields.

/// Widen an `bits`-wide value to 8 bits by bit replication.
///
/// The field is shifted into the top of the byte and its own bits are
/// repeated below it, so `0` maps to `0` and the maximum maps to `255`.
/// A zero-width field expands to `0`.
#[inline]
pub fn expand(value: u32, bits: u32) -> u8 {
    match bits {
        0 => 0,
        b if b >= 8 => value as u8,
        _ => {
            let mut out = (value & ((1 << bits) - 1)) << (8 - bits);
            let mut shift = bits;
            while shift < 8 {
                out |= out >> shift;
                shift *= 2;
            }
            out as u8
        }
    }
}

/// Narrow an 8-bit value to `bits` by dropping low bits.
#[inline]
pub fn truncate(value: u8, bits: u32) -> u32 {
    match bits {
        0 => 0,
        b if b >= 8 => value as u32,
        _ => (value >> (8 - bits)) as u32,
    }
}

/// The `bits`-wide level whose expansion is closest to `value`.
///
/// Ties go to the lower level. Block encoders use this for endpoints, where
/// rounding to the nearest representable value matters more than matching
/// the truncating linear formats.
#[inline]
pub fn nearest(value: u8, bits: u32) -> u32 {
    if bits == 0 {
        return 0;
    }
    if bits >= 8 {
        return value as u32;
    }
    let max = (1u32 << bits) - 1;
    let start = truncate(value, bits);
    let mut best = start;
    let mut best_err = u32::MAX;
    for q in start.saturating_sub(1)..=(start + 1).min(max) {
        let err = (expand(q, bits) as i32 - value as i32).unsigned_abs();
        if err < best_err {
            best = q;
            best_err = err;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_endpoints() {
        for bits in 1..=8 {
            assert_eq!(expand(0, bits), 0);
            assert_eq!(expand((1 << bits) - 1, bits), 255, "bits={}", bits);
        }
    }

    #[test]
    fn test_expand_known_values() {
        assert_eq!(expand(0b10000, 5), 0b1000_0100);
        assert_eq!(expand(0b101, 3), 0b1011_0110);
        assert_eq!(expand(0xA, 4), 0xAA);
        assert_eq!(expand(1, 1), 255);
    }

    #[test]
    fn test_truncate_then_expand_is_stable() {
        for bits in 1..=8 {
            for v in 0..=255u8 {
                let once = expand(truncate(v, bits), bits);
                let twice = expand(truncate(once, bits), bits);
                assert_eq!(once, twice, "bits={} v={}", bits, v);
            }
        }
    }

    #[test]
    fn test_nearest_never_worse_than_truncate() {
        for bits in 1..=7 {
            for v in 0..=255u8 {
                let n = (expand(nearest(v, bits), bits) as i32 - v as i32).abs();
                let t = (expand(truncate(v, bits), bits) as i32 - v as i32).abs();
                assert!(n <= t, "bits={} v={} nearest={} truncate={}", bits, v, n, t);
            }
        }
    }

    #[test]
    fn test_nearest_bounds_error_by_half_step() {
        for v in 0..=255u8 {
            let err = (expand(nearest(v, 5), 5) as i32 - v as i32).abs();
            assert!(err <= 4, "5-bit error {} for {}", err, v);
        }
    }
}
