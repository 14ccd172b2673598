//! Delay scalars and fuzzy floating-point comparison.
//!
//! All timing values (arrivals, requireds, arc delays, slacks) are `f64`
//! nanoseconds. Comparisons go through the fuzzy predicates so that values
//! separated by less than the float noise floor compare equal; the search
//! only commits arrival/required updates that beat the fuzzy tolerance,
//! which is what makes the latch fixed point terminate.

use crate::min_max::MinMax;

/// A timing value in nanoseconds (arrival, required, arc delay, or slack).
pub type Delay = f64;

/// Absolute tolerance below which two delays are considered equal.
const FUZZ_ABS: f64 = 1e-9;

/// Relative tolerance applied to the larger magnitude operand.
const FUZZ_REL: f64 = 1e-9;

fn fuzz(a: Delay, b: Delay) -> f64 {
    FUZZ_ABS + FUZZ_REL * a.abs().max(b.abs())
}

/// Returns `true` if `a` and `b` are equal within the fuzzy tolerance.
pub fn fuzzy_equal(a: Delay, b: Delay) -> bool {
    if a == b {
        return true;
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    (a - b).abs() <= fuzz(a, b)
}

/// Returns `true` if `a` is less than `b` beyond the fuzzy tolerance.
pub fn fuzzy_less(a: Delay, b: Delay) -> bool {
    a < b && !fuzzy_equal(a, b)
}

/// Returns `true` if `a` is less than or fuzzily equal to `b`.
pub fn fuzzy_less_equal(a: Delay, b: Delay) -> bool {
    a < b || fuzzy_equal(a, b)
}

/// Returns `true` if `a` is greater than `b` beyond the fuzzy tolerance.
pub fn fuzzy_greater(a: Delay, b: Delay) -> bool {
    a > b && !fuzzy_equal(a, b)
}

/// Returns `true` if `a` is greater than or fuzzily equal to `b`.
pub fn fuzzy_greater_equal(a: Delay, b: Delay) -> bool {
    a > b || fuzzy_equal(a, b)
}

/// Returns `true` if `a` is worse than `b` in the `min_max` direction:
/// later for max paths, earlier for min paths.
pub fn fuzzy_worse(a: Delay, b: Delay, min_max: MinMax) -> bool {
    match min_max {
        MinMax::Max => fuzzy_greater(a, b),
        MinMax::Min => fuzzy_less(a, b),
    }
}

/// The identity value for the worst-of reduction in the `min_max` direction:
/// `-inf` for max paths, `+inf` for min paths.
pub fn delay_init_value(min_max: MinMax) -> Delay {
    match min_max {
        MinMax::Max => f64::NEG_INFINITY,
        MinMax::Min => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_equal() {
        assert!(fuzzy_equal(1.5, 1.5));
        assert!(fuzzy_equal(0.0, 0.0));
    }

    #[test]
    fn near_equal_within_tolerance() {
        assert!(fuzzy_equal(1.0, 1.0 + 1e-12));
        assert!(!fuzzy_equal(1.0, 1.0 + 1e-6));
    }

    #[test]
    fn infinities() {
        assert!(fuzzy_equal(f64::INFINITY, f64::INFINITY));
        assert!(!fuzzy_equal(f64::INFINITY, 1.0));
        assert!(!fuzzy_equal(f64::NEG_INFINITY, f64::INFINITY));
    }

    #[test]
    fn ordering_predicates() {
        assert!(fuzzy_less(1.0, 2.0));
        assert!(!fuzzy_less(1.0, 1.0 + 1e-12));
        assert!(fuzzy_greater(2.0, 1.0));
        assert!(fuzzy_less_equal(1.0, 1.0 + 1e-12));
        assert!(fuzzy_greater_equal(1.0 + 1e-12, 1.0));
    }

    #[test]
    fn directed_worse() {
        assert!(fuzzy_worse(2.0, 1.0, MinMax::Max));
        assert!(!fuzzy_worse(1.0, 2.0, MinMax::Max));
        assert!(fuzzy_worse(1.0, 2.0, MinMax::Min));
        assert!(!fuzzy_worse(2.0, 1.0, MinMax::Min));
    }

    #[test]
    fn init_values_are_reduction_identities() {
        assert!(fuzzy_worse(0.0, delay_init_value(MinMax::Max), MinMax::Max));
        assert!(fuzzy_worse(0.0, delay_init_value(MinMax::Min), MinMax::Min));
    }
}
