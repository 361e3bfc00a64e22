//! Fixed-point arithmetic in scaled units.
//!
//! All widths handled by the breaker are integers counting 2^-16ths of a
//! unit, so every width computation is exact and the engine is fully
//! deterministic across platforms.

pub type Scaled = i32;

/// A length in scaled units.
pub type Dimension = Scaled;

/// 2^16, represents 1.0 in scaled units.
pub const UNITY: Scaled = 0x10000;

/// The largest legal dimension, 2^30 - 1.
pub const MAX_DIMEN: Dimension = 0o7777777777;

/// The badness of a line that cannot be stretched to its target width.
/// Values above this are reserved for lines whose shrinkability is exceeded
/// outright.
pub const INF_BAD: i32 = 10000;

/// Computes the badness of stretching or shrinking a total of `t` when a
/// total of `s` is available, approximating `100 * (t/s)^3` in pure integer
/// arithmetic. `t` must be non-negative. Saturates at [`INF_BAD`].
///
/// `r` is roughly `297 * t / s`, computed without overflow; 297^3 is close
/// to 2^24 * 100/64, which makes the final rounding divide come out as a
/// power of two.
pub fn calculate_badness(t: Scaled, s: Scaled) -> i32 {
    if t == 0 {
        return 0;
    }
    if s <= 0 {
        return INF_BAD;
    }
    let r = if t <= 7_230_584 {
        (t * 297) / s
    } else if s >= 1_663_497 {
        t / (s / 297)
    } else {
        t
    };
    if r > 1290 {
        INF_BAD
    } else {
        (r * r * r + 0o400000) / 0o1000000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_fit_has_no_badness() {
        assert_eq!(calculate_badness(0, 0), 0);
        assert_eq!(calculate_badness(0, 12345), 0);
    }

    #[test]
    fn no_flexibility_is_infinitely_bad() {
        assert_eq!(calculate_badness(1, 0), INF_BAD);
        assert_eq!(calculate_badness(UNITY, -5), INF_BAD);
    }

    #[test]
    fn full_use_of_flexibility_is_badness_100() {
        // t == s gives r == 297 exactly, which cubes to 100.
        assert_eq!(calculate_badness(UNITY, UNITY), 100);
        assert_eq!(calculate_badness(7, 7), 100);
    }

    #[test]
    fn half_use_of_flexibility_is_badness_12() {
        // The classic "loose" boundary.
        assert_eq!(calculate_badness(UNITY, 2 * UNITY), 12);
    }

    #[test]
    fn extreme_ratios_saturate() {
        assert_eq!(calculate_badness(100 * UNITY, 1), INF_BAD);
        assert_eq!(calculate_badness(MAX_DIMEN, 2_000_000), INF_BAD);
    }
}
