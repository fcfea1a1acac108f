//! Story point rounding.
//!
//! Task totals are never shown raw; they are rounded up to the next value
//! of the sanctioned estimation scale.

/// The estimation scale is the Fibonacci sequence looked up within ten
/// steps: 0, 1, 1, 2, 3, 5, 8, 13, 21, 34.
const LOOKUP_STEPS: usize = 10;

/// Round `n` up to the next sanctioned story point value.
///
/// Totals beyond the scale saturate at 34 instead of growing the sequence;
/// a sprint that large is a planning problem, not a rounding problem.
pub fn story_points(n: u32) -> u32 {
    let mut result = 0;
    let (mut current, mut next) = (0_u32, 1_u32);
    for _ in 0..LOOKUP_STEPS {
        result = current;
        if result >= n {
            break;
        }
        (current, next) = (next, current + next);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_scale_values() {
        assert_eq!(story_points(0), 0);
        assert_eq!(story_points(1), 1);
        assert_eq!(story_points(4), 5);
        assert_eq!(story_points(13), 13);
        assert_eq!(story_points(14), 21);
    }

    #[test]
    fn scale_values_are_fixed_points() {
        for f in [0, 1, 2, 3, 5, 8, 13, 21, 34] {
            assert_eq!(story_points(f), f);
        }
    }

    #[test]
    fn saturates_at_the_top_of_the_scale() {
        assert_eq!(story_points(35), 34);
        assert_eq!(story_points(1000), 34);
    }

    #[test]
    fn monotonic_non_decreasing() {
        let mut previous = 0;
        for n in 0..100 {
            let rounded = story_points(n);
            assert!(rounded >= previous, "story_points({n}) regressed");
            previous = rounded;
        }
    }
}
