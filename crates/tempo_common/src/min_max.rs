//! The min/max analysis axis.
//!
//! Max paths answer "how late can this signal be" (setup-style analysis);
//! min paths answer "how early" (hold-style). The same axis doubles as the
//! early/late selector for clock insertion delays, where the early side of a
//! capture clock pairs with the late side of launch data.

use serde::{Deserialize, Serialize};

/// The analysis direction: min (early/hold) or max (late/setup).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum MinMax {
    /// Early analysis: shortest paths, hold checks.
    Min,
    /// Late analysis: longest paths, setup checks.
    Max,
}

/// Early/late selector for clock network delays; same axis as [`MinMax`].
pub type EarlyLate = MinMax;

impl MinMax {
    /// Both directions, min first.
    pub const BOTH: [MinMax; 2] = [MinMax::Min, MinMax::Max];

    /// Returns the opposite direction.
    pub fn opposite(self) -> MinMax {
        match self {
            MinMax::Min => MinMax::Max,
            MinMax::Max => MinMax::Min,
        }
    }

    /// Returns a stable index (min = 0, max = 1) for array storage.
    pub fn index(self) -> usize {
        match self {
            MinMax::Min => 0,
            MinMax::Max => 1,
        }
    }
}

/// A pair of values, one per analysis direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct PerMinMax<T> {
    /// The min-direction value.
    pub min: T,
    /// The max-direction value.
    pub max: T,
}

impl<T: Copy> PerMinMax<T> {
    /// Creates a pair from min and max values.
    pub fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Creates a pair holding the same value in both directions.
    pub fn both(value: T) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Returns the value for the given direction.
    pub fn get(&self, min_max: MinMax) -> T {
        match min_max {
            MinMax::Min => self.min,
            MinMax::Max => self.max,
        }
    }

    /// Sets the value for the given direction.
    pub fn set(&mut self, min_max: MinMax, value: T) {
        match min_max {
            MinMax::Min => self.min = value,
            MinMax::Max => self.max = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite() {
        assert_eq!(MinMax::Min.opposite(), MinMax::Max);
        assert_eq!(MinMax::Max.opposite(), MinMax::Min);
    }

    #[test]
    fn indices_are_distinct() {
        assert_ne!(MinMax::Min.index(), MinMax::Max.index());
    }

    #[test]
    fn per_min_max_get_set() {
        let mut p = PerMinMax::new(1.0, 2.0);
        assert_eq!(p.get(MinMax::Min), 1.0);
        assert_eq!(p.get(MinMax::Max), 2.0);
        p.set(MinMax::Min, 3.0);
        assert_eq!(p.get(MinMax::Min), 3.0);
        assert_eq!(p.get(MinMax::Max), 2.0);
    }

    #[test]
    fn per_min_max_both() {
        let p = PerMinMax::both(0.5);
        assert_eq!(p.min, p.max);
    }

    #[test]
    fn serde_roundtrip() {
        let p = PerMinMax::new(0.25, 0.75);
        let json = serde_json::to_string(&p).unwrap();
        let back: PerMinMax<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
