//! Analysis corners and path analysis points.
//!
//! A corner names a process/voltage/temperature condition with its own delay
//! tables. Each corner yields two path analysis points, one per min/max
//! direction; tags carry the analysis point index so one vertex can hold
//! paths for every corner and direction at once.

use serde::{Deserialize, Serialize};
use tempo_common::MinMax;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub const fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

pub(crate) use define_id;

define_id!(
    /// Opaque, copyable ID for an analysis corner.
    CornerId
);

define_id!(
    /// Index of a path analysis point (corner × min/max).
    ApIndex
);

/// An analysis corner: one process/voltage/temperature condition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Corner {
    /// The unique ID of this corner.
    pub id: CornerId,
    /// Corner name (e.g. "slow_125c", "fast_m40c").
    pub name: String,
}

/// One path analysis point: a corner paired with an analysis direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct AnalysisPt {
    /// The corner this analysis point selects delays from.
    pub corner: CornerId,
    /// The analysis direction.
    pub min_max: MinMax,
}

/// The set of analysis corners and their analysis points.
///
/// Analysis points are laid out corner-major: corner `c` owns indices
/// `2c` (min) and `2c + 1` (max), so flipping direction within a corner is
/// an index XOR.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Corners {
    corners: Vec<Corner>,
    analysis_pts: Vec<AnalysisPt>,
}

impl Corners {
    /// Creates the corner set from corner names. At least one corner is
    /// required; a single "default" corner is the common case.
    pub fn new(names: &[&str]) -> Self {
        let corners: Vec<Corner> = names
            .iter()
            .enumerate()
            .map(|(i, name)| Corner {
                id: CornerId::from_raw(i as u32),
                name: (*name).to_string(),
            })
            .collect();
        let mut analysis_pts = Vec::with_capacity(corners.len() * 2);
        for corner in &corners {
            for min_max in MinMax::BOTH {
                analysis_pts.push(AnalysisPt {
                    corner: corner.id,
                    min_max,
                });
            }
        }
        Self {
            corners,
            analysis_pts,
        }
    }

    /// Creates a single-corner set named "default".
    pub fn single() -> Self {
        Self::new(&["default"])
    }

    /// Returns the number of corners.
    pub fn corner_count(&self) -> usize {
        self.corners.len()
    }

    /// Returns the corner with the given ID.
    pub fn corner(&self, id: CornerId) -> &Corner {
        &self.corners[id.as_raw() as usize]
    }

    /// Iterates over the corners.
    pub fn corners(&self) -> impl Iterator<Item = &Corner> {
        self.corners.iter()
    }

    /// Returns all path analysis points.
    pub fn analysis_pts(&self) -> &[AnalysisPt] {
        &self.analysis_pts
    }

    /// Iterates over the analysis point indices.
    pub fn ap_indices(&self) -> impl Iterator<Item = ApIndex> {
        (0..self.analysis_pts.len() as u32).map(ApIndex::from_raw)
    }

    /// Returns the analysis point for the given index.
    pub fn ap(&self, index: ApIndex) -> AnalysisPt {
        self.analysis_pts[index.as_raw() as usize]
    }

    /// Returns the index for a (corner, direction) pair.
    pub fn ap_index(&self, corner: CornerId, min_max: MinMax) -> ApIndex {
        ApIndex::from_raw(corner.as_raw() * 2 + min_max.index() as u32)
    }

    /// Returns the analysis point in the same corner with the opposite
    /// direction. Capture clock paths pair with the opposite direction of
    /// their launch data.
    pub fn ap_opposite(&self, index: ApIndex) -> ApIndex {
        ApIndex::from_raw(index.as_raw() ^ 1)
    }
}

impl Default for Corners {
    fn default() -> Self {
        Self::single()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_corner_layout() {
        let corners = Corners::single();
        assert_eq!(corners.corner_count(), 1);
        assert_eq!(corners.analysis_pts().len(), 2);
        assert_eq!(corners.ap(ApIndex::from_raw(0)).min_max, MinMax::Min);
        assert_eq!(corners.ap(ApIndex::from_raw(1)).min_max, MinMax::Max);
    }

    #[test]
    fn two_corner_layout() {
        let corners = Corners::new(&["fast", "slow"]);
        assert_eq!(corners.analysis_pts().len(), 4);
        let slow = CornerId::from_raw(1);
        let idx = corners.ap_index(slow, MinMax::Max);
        assert_eq!(idx.as_raw(), 3);
        assert_eq!(corners.ap(idx).corner, slow);
    }

    #[test]
    fn opposite_flips_direction_within_corner() {
        let corners = Corners::new(&["fast", "slow"]);
        let idx = corners.ap_index(CornerId::from_raw(1), MinMax::Max);
        let opp = corners.ap_opposite(idx);
        assert_eq!(corners.ap(opp).corner, CornerId::from_raw(1));
        assert_eq!(corners.ap(opp).min_max, MinMax::Min);
        assert_eq!(corners.ap_opposite(opp), idx);
    }

    #[test]
    fn corner_names() {
        let corners = Corners::new(&["fast", "slow"]);
        assert_eq!(corners.corner(CornerId::from_raw(0)).name, "fast");
        assert_eq!(corners.corner(CornerId::from_raw(1)).name, "slow");
    }
}
