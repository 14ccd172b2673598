//! Opaque ID newtypes for timing graph entities.
//!
//! [`VertexId`], [`EdgeId`], [`PinId`], and [`ArcSetId`] are thin `u32`
//! wrappers indexing the dense entity vectors in [`Graph`](crate::Graph)
//! and [`Network`](crate::Network). They are `Copy`, `Hash`, `Ord` (tag
//! groups sort by ID), and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

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

            /// Returns the index as a `usize` for direct vector indexing.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a vertex in the timing graph.
    VertexId
);

define_id!(
    /// Opaque, copyable ID for an edge in the timing graph.
    EdgeId
);

define_id!(
    /// Opaque, copyable ID for a pin in the network.
    PinId
);

define_id!(
    /// Opaque, copyable ID for a timing arc set.
    ArcSetId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn roundtrip() {
        let id = VertexId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
        assert_eq!(id.index(), 42);
    }

    #[test]
    fn equality() {
        assert_eq!(EdgeId::from_raw(7), EdgeId::from_raw(7));
        assert_ne!(EdgeId::from_raw(7), EdgeId::from_raw(8));
    }

    #[test]
    fn hash_in_set() {
        let mut set = HashSet::new();
        set.insert(PinId::from_raw(1));
        set.insert(PinId::from_raw(2));
        set.insert(PinId::from_raw(1));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serde_roundtrip() {
        let id = ArcSetId::from_raw(99);
        let json = serde_json::to_string(&id).unwrap();
        let restored: ArcSetId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, restored);
    }

    #[test]
    fn ordering_follows_raw_index() {
        assert!(VertexId::from_raw(1) < VertexId::from_raw(2));
    }
}
