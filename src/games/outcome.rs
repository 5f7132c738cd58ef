use rand::Rng;

use crate::games::types::{CrashPoint, MAX_CRASH_POINT, MIN_CRASH_POINT};

/// Source of round outcomes
///
/// The default draw is a plain uniform pseudo-random pick and is not
/// verifiable by players. A commit-reveal or VRF source can be plugged in here.
pub trait OutcomeSource: Send + Sync {
    fn next_crash_point(&self) -> CrashPoint;
}

/// Uniform draw over 100..=999 from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformCrashPoints;

impl OutcomeSource for UniformCrashPoints {
    fn next_crash_point(&self) -> CrashPoint {
        CrashPoint::saturating(rand::thread_rng().gen_range(MIN_CRASH_POINT..=MAX_CRASH_POINT))
    }
}

/// Always yields the same crash point
#[derive(Debug, Clone, Copy)]
pub struct FixedCrashPoint(pub CrashPoint);

impl OutcomeSource for FixedCrashPoint {
    fn next_crash_point(&self) -> CrashPoint {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_draws_stay_in_range() {
        let source = UniformCrashPoints;
        for _ in 0..10_000 {
            let cp = source.next_crash_point().hundredths();
            assert!((MIN_CRASH_POINT..=MAX_CRASH_POINT).contains(&cp));
        }
    }

    #[test]
    fn test_uniform_draws_vary() {
        let source = UniformCrashPoints;
        let first = source.next_crash_point();
        let varied = (0..100).any(|_| source.next_crash_point() != first);
        assert!(varied);
    }
}
