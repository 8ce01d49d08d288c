//! Progress calculator.
//!
//! Course progress is derived from the activity ledger: the share of a
//! course's exercises the learner has completed, as a whole percentage. The
//! exercise total is catalog metadata supplied by the caller.

use serde::{Deserialize, Serialize};

use learnhub_core::{DomainError, DomainResult};

/// Whole percentage in `0..=100`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Percent(u8);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const COMPLETE: Percent = Percent(100);

    pub fn new(value: i64) -> DomainResult<Self> {
        if !(0..=100).contains(&value) {
            return Err(DomainError::validation(format!(
                "progress percentage must be within 0..=100, got {value}"
            )));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 == 100
    }
}

impl Default for Percent {
    fn default() -> Self {
        Self::ZERO
    }
}

impl TryFrom<i64> for Percent {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for i64 {
    fn from(value: Percent) -> Self {
        value.0 as i64
    }
}

impl core::fmt::Display for Percent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Check a course's exercise total before it is used as a denominator.
pub fn validate_total(total: i64) -> DomainResult<u64> {
    if total <= 0 {
        return Err(DomainError::validation(format!(
            "total exercise count must be positive, got {total}"
        )));
    }
    Ok(total as u64)
}

/// `min(100, round(completed / total * 100))`, rounding half up.
///
/// `total` must be positive. More completions than exercises (the catalog
/// shrank after the learner finished) clamps to 100.
pub fn compute_progress(completed: u64, total: i64) -> DomainResult<Percent> {
    let total = u128::from(validate_total(total)?);
    // u128 holds u64::MAX * 100 exactly, so only the result is clamped.
    let scaled = (u128::from(completed) * 100 + total / 2) / total;
    Ok(Percent(scaled.min(100) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ten_exercise_course() {
        assert_eq!(compute_progress(0, 10).unwrap().value(), 0);
        assert_eq!(compute_progress(5, 10).unwrap().value(), 50);
        assert_eq!(compute_progress(10, 10).unwrap().value(), 100);
        assert_eq!(compute_progress(12, 10).unwrap().value(), 100);
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(compute_progress(1, 8).unwrap().value(), 13); // 12.5
        assert_eq!(compute_progress(1, 3).unwrap().value(), 33);
        assert_eq!(compute_progress(2, 3).unwrap().value(), 67);
        assert_eq!(compute_progress(1, 200).unwrap().value(), 1); // 0.5
    }

    #[test]
    fn non_positive_total_is_a_validation_error() {
        assert!(matches!(compute_progress(3, 0), Err(DomainError::Validation(_))));
        assert!(matches!(compute_progress(0, -4), Err(DomainError::Validation(_))));
    }

    #[test]
    fn huge_completion_counts_do_not_overflow() {
        assert_eq!(compute_progress(u64::MAX, 1).unwrap(), Percent::COMPLETE);
        assert_eq!(compute_progress(u64::MAX, i64::MAX).unwrap(), Percent::COMPLETE);
        assert_eq!(
            compute_progress(i64::MAX as u64 - 1, i64::MAX).unwrap(),
            Percent::COMPLETE
        );
        assert_eq!(compute_progress(i64::MAX as u64 / 2, i64::MAX).unwrap().value(), 50);
    }

    #[test]
    fn percent_bounds() {
        assert!(Percent::new(-1).is_err());
        assert!(Percent::new(101).is_err());
        assert!(Percent::new(100).unwrap().is_complete());
        assert!(serde_json::from_str::<Percent>("150").is_err());
        assert_eq!(serde_json::to_string(&Percent::new(42).unwrap()).unwrap(), "42");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn progress_is_always_within_bounds(completed in 0u64..10_000, total in 1i64..10_000) {
            let p = compute_progress(completed, total).unwrap();
            prop_assert!(p.value() <= 100);
        }

        #[test]
        fn progress_is_monotonic_in_completions(completed in 0u64..1_000, total in 1i64..1_000) {
            let a = compute_progress(completed, total).unwrap();
            let b = compute_progress(completed + 1, total).unwrap();
            prop_assert!(a <= b);
        }

        #[test]
        fn progress_is_deterministic(completed in 0u64..1_000, total in 1i64..1_000) {
            prop_assert_eq!(
                compute_progress(completed, total).unwrap(),
                compute_progress(completed, total).unwrap()
            );
        }

        #[test]
        fn progress_matches_exact_ratio_over_full_domain(completed in any::<u64>(), total in 1i64..=i64::MAX) {
            let p = compute_progress(completed, total).unwrap();
            let exact = completed as f64 / total as f64 * 100.0;
            prop_assert!(p.value() <= 100);
            if exact >= 100.0 {
                prop_assert!(p.is_complete());
            } else {
                prop_assert!((p.value() as f64 - exact).abs() <= 0.5 + 1e-6);
            }
        }

        #[test]
        fn finishing_every_exercise_is_complete(total in 1i64..100_000, extra in 0u64..50) {
            let p = compute_progress(total as u64 + extra, total).unwrap();
            prop_assert!(p.is_complete());
        }
    }
}
