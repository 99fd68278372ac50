//! Evaluation of sampling decisions.

use rand::Rng;

/// Upper bound of sampling percentages and random draws.
const MAX_PERCENTAGE: f64 = 100.0;

/// Returns the weight of an event sampled at `percentage`.
///
/// The weight is the inverse sampling ratio, rounded down. A percentage of zero yields a weight of
/// one.
pub fn default_weight(percentage: f64) -> u32 {
    if percentage == 0.0 {
        1
    } else {
        (MAX_PERCENTAGE / percentage).floor() as u32
    }
}

/// Draws a uniformly distributed value in `[0, 100)`.
///
/// Every sampling decision must use a fresh draw.
pub fn random_draw() -> f64 {
    rand::rng().random_range(0.0..MAX_PERCENTAGE)
}

/// Whether an event should be sent or dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// The event is sent.
    Keep,
    /// The event is dropped.
    Drop,
}

impl SamplingDecision {
    /// Decides based on a sampling percentage and a random draw.
    ///
    /// An event is kept only if the percentage is strictly greater than the draw.
    pub fn from_draw(percentage: f64, draw: f64) -> Self {
        if percentage > draw {
            Self::Keep
        } else {
            Self::Drop
        }
    }

    /// Decides based on a sampling percentage and a fresh [`random_draw`].
    pub fn sample(percentage: f64) -> Self {
        let draw = random_draw();
        let decision = Self::from_draw(percentage, draw);
        outcall_log::trace!(percentage, draw, ?decision, "sampling decision");
        decision
    }

    /// Returns `true` if the event is sent.
    pub fn is_keep(self) -> bool {
        matches!(self, Self::Keep)
    }

    /// Returns `true` if the event is dropped.
    pub fn is_drop(self) -> bool {
        !self.is_keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_draw() {
        assert_eq!(SamplingDecision::from_draw(70.0, 50.0), SamplingDecision::Keep);
        assert_eq!(SamplingDecision::from_draw(30.0, 50.0), SamplingDecision::Drop);
    }

    #[test]
    fn test_equal_draw_drops() {
        assert!(SamplingDecision::from_draw(50.0, 50.0).is_drop());
        assert!(SamplingDecision::from_draw(0.0, 0.0).is_drop());
    }

    #[test]
    fn test_sample_extremes() {
        for _ in 0..1000 {
            assert!(SamplingDecision::sample(100.0).is_keep());
            assert!(SamplingDecision::sample(0.0).is_drop());
        }
    }

    #[test]
    fn test_random_draw_range() {
        for _ in 0..1000 {
            let draw = random_draw();
            assert!((0.0..100.0).contains(&draw), "draw out of range: {draw}");
        }
    }

    #[test]
    fn test_default_weight() {
        assert_eq!(default_weight(100.0), 1);
        assert_eq!(default_weight(50.0), 2);
        assert_eq!(default_weight(30.0), 3);
        assert_eq!(default_weight(1.0), 100);
        assert_eq!(default_weight(0.0), 1);
    }
}
