//! Interned tag sets and the per-visit arrival builder.
//!
//! A [`TagGroup`] is the interned, sorted set of tags present at a vertex;
//! the position of a tag in the sorted set is its arrival slot. Because
//! groups are interned, the common "vertex unchanged" case reduces to an ID
//! compare. The [`TagGroupBldr`] is the mutable map a visitor fills while
//! merging fanin paths before the result is interned back.

use crate::clk_info::PathRep;
use crate::pool::TagId;
use rustc_hash::FxHashMap;
use tempo_common::Delay;

/// An interned set of tags with the tag → arrival-slot mapping.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TagGroup {
    /// The tags, sorted ascending by ID; slot = position.
    pub tags: Vec<TagId>,
    /// Cached: the group holds a clock tag.
    pub has_clk_tag: bool,
    /// Cached: the group holds a generated-clock source-path tag.
    pub has_genclk_src_tag: bool,
    /// Cached: the group holds a filter-marked tag.
    pub has_filter_tag: bool,
    /// Cached: the group holds a loop-marked tag.
    pub has_loop_tag: bool,
}

impl TagGroup {
    /// Returns the number of tags (and arrival slots).
    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Returns the arrival slot of `tag`, if present.
    pub fn slot(&self, tag: TagId) -> Option<usize> {
        self.tags.binary_search(&tag).ok()
    }

    /// Returns `true` if the group contains `tag`.
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.slot(tag).is_some()
    }

    /// Iterates over `(slot, tag)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, TagId)> + '_ {
        self.tags.iter().copied().enumerate()
    }
}

/// One builder entry: the merged arrival and, for clock-ish tags, the
/// previous path reference.
#[derive(Clone, Copy, Debug)]
pub struct BldrEntry {
    /// The merged arrival value.
    pub arrival: Delay,
    /// Previous path for clock and gen-clk source paths.
    pub prev: Option<PathRep>,
}

/// The mutable per-visit arrival map, keyed by tag.
#[derive(Default, Debug)]
pub struct TagGroupBldr {
    entries: FxHashMap<TagId, BldrEntry>,
}

impl TagGroupBldr {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the builder for reuse.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the arrival recorded for `tag`, if any.
    pub fn arrival(&self, tag: TagId) -> Option<Delay> {
        self.entries.get(&tag).map(|e| e.arrival)
    }

    /// Sets (or overwrites) the arrival for `tag`.
    pub fn set_arrival(&mut self, tag: TagId, arrival: Delay, prev: Option<PathRep>) {
        self.entries.insert(tag, BldrEntry { arrival, prev });
    }

    /// Removes `tag` from the builder.
    pub fn remove(&mut self, tag: TagId) {
        self.entries.remove(&tag);
    }

    /// Returns `true` if the builder holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over `(tag, entry)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &BldrEntry)> {
        self.entries.iter().map(|(&t, e)| (t, e))
    }

    /// The tags present, sorted ascending (slot order of the interned
    /// group).
    pub fn sorted_tags(&self) -> Vec<TagId> {
        let mut tags: Vec<TagId> = self.entries.keys().copied().collect();
        tags.sort();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(raw_tags: &[u32]) -> TagGroup {
        TagGroup {
            tags: raw_tags.iter().map(|&t| TagId::from_raw(t)).collect(),
            has_clk_tag: false,
            has_genclk_src_tag: false,
            has_filter_tag: false,
            has_loop_tag: false,
        }
    }

    #[test]
    fn slots_follow_sorted_order() {
        let g = group(&[2, 5, 9]);
        assert_eq!(g.tag_count(), 3);
        assert_eq!(g.slot(TagId::from_raw(2)), Some(0));
        assert_eq!(g.slot(TagId::from_raw(9)), Some(2));
        assert_eq!(g.slot(TagId::from_raw(4)), None);
        assert!(g.has_tag(TagId::from_raw(5)));
    }

    #[test]
    fn builder_merge_overwrites() {
        let mut bldr = TagGroupBldr::new();
        let t = TagId::from_raw(3);
        assert!(bldr.is_empty());
        bldr.set_arrival(t, 1.0, None);
        assert_eq!(bldr.arrival(t), Some(1.0));
        bldr.set_arrival(t, 2.0, None);
        assert_eq!(bldr.arrival(t), Some(2.0));
        assert_eq!(bldr.len(), 1);
    }

    #[test]
    fn builder_sorted_tags() {
        let mut bldr = TagGroupBldr::new();
        bldr.set_arrival(TagId::from_raw(9), 1.0, None);
        bldr.set_arrival(TagId::from_raw(2), 2.0, None);
        bldr.set_arrival(TagId::from_raw(5), 3.0, None);
        assert_eq!(
            bldr.sorted_tags(),
            vec![TagId::from_raw(2), TagId::from_raw(5), TagId::from_raw(9)]
        );
    }

    #[test]
    fn builder_remove() {
        let mut bldr = TagGroupBldr::new();
        let t = TagId::from_raw(1);
        bldr.set_arrival(t, 1.0, None);
        bldr.remove(t);
        assert!(bldr.is_empty());
        assert_eq!(bldr.arrival(t), None);
    }

    #[test]
    fn group_equality_is_structural() {
        assert_eq!(group(&[1, 2]), group(&[1, 2]));
        assert_ne!(group(&[1, 2]), group(&[1, 3]));
    }
}
