/// Number of levels between the neutral position and full deflection.
const LEVEL_SCALE: f32 = 10.0;

/// A coarse, quantized position of one controller axis.
///
/// Levels range from -10 (full left/up) to 10 (full right/down).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Level(i8);

impl Level {
    pub const NEUTRAL: Level = Level(0);

    pub fn new(value: i8) -> Self {
        Self(value.clamp(-10, 10))
    }

    pub fn value(self) -> i8 {
        self.0
    }

    pub fn magnitude(self) -> u8 {
        self.0.unsigned_abs()
    }
}

/// Quantize a raw axis sample into a level.
///
/// Samples are clamped to `[-1.0, 1.0]`, scaled by 10 and rounded half away
/// from zero, so `0.45` becomes level 5 and `-0.45` becomes level -5.
pub fn quantize(sample: f32) -> Level {
    if sample.is_nan() {
        return Level::NEUTRAL;
    }

    let scaled = (sample.clamp(-1.0, 1.0) * LEVEL_SCALE).round();
    Level::new(scaled as i8)
}

/// Remembers the last level seen on one axis, and reports only changes.
#[derive(Debug, Default)]
pub struct AxisTracker {
    previous: Level,
}

impl AxisTracker {
    pub fn previous(&self) -> Level {
        self.previous
    }

    /// Record a new level. Returns the `(previous, current)` pair if it
    /// differs from the level stored before, or `None` if nothing changed.
    pub fn transition(&mut self, current: Level) -> Option<(Level, Level)> {
        if current == self.previous {
            return None;
        }

        let previous = std::mem::replace(&mut self.previous, current);
        Some((previous, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(quantize(0.45), Level::new(5));
        assert_eq!(quantize(-0.45), Level::new(-5));
        assert_eq!(quantize(0.04), Level::NEUTRAL);
        assert_eq!(quantize(0.14), Level::new(1));
        assert_eq!(quantize(-0.2), Level::new(-2));
    }

    #[test]
    fn clamps_out_of_range_samples() {
        assert_eq!(quantize(3.0), Level::new(10));
        assert_eq!(quantize(-1.5), Level::new(-10));
        assert_eq!(quantize(f32::NAN), Level::NEUTRAL);
    }

    #[test]
    fn quantization_is_monotonic() {
        let samples: Vec<f32> = (-120..=120).map(|i| i as f32 / 100.0).collect();

        for pair in samples.windows(2) {
            assert!(
                quantize(pair[0]) <= quantize(pair[1]),
                "quantize({}) > quantize({})",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn tracker_reports_only_changes() {
        let mut tracker = AxisTracker::default();

        assert_eq!(tracker.transition(Level::NEUTRAL), None);
        assert_eq!(
            tracker.transition(Level::new(5)),
            Some((Level::NEUTRAL, Level::new(5)))
        );
        assert_eq!(tracker.transition(Level::new(5)), None);
        assert_eq!(tracker.previous(), Level::new(5));
        assert_eq!(
            tracker.transition(Level::new(1)),
            Some((Level::new(5), Level::new(1)))
        );
    }
}
