//! Interning pools for clock infos, tags, and tag groups.
//!
//! Each pool deduplicates structurally-equal values to a compact `u32` ID:
//! structural equality implies ID equality, which is the invariant the whole
//! tagging scheme rests on. Lookups take a read lock (the common hit path);
//! a miss upgrades to a write lock and re-checks before inserting, so
//! concurrent workers interning the same value converge on one ID. Growth
//! happens entirely under the write lock, which excludes readers, so a
//! reader can never observe a reallocation in progress.
//!
//! Filter passes create tags that must not outlive the pass; slots are
//! `Option`al so the filter sweep can clear them without disturbing the IDs
//! of surviving entries.

use crate::clk_info::ClkInfo;
use crate::tag::Tag;
use crate::tag_group::TagGroup;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for an interned clock info.
    ClkInfoId
);

define_id!(
    /// Opaque, copyable ID for an interned tag.
    TagId
);

define_id!(
    /// Opaque, copyable ID for an interned tag group.
    TagGroupId
);

/// Index capacity sentinel; exceeding it poisons the search session.
const INDEX_MAX: usize = u32::MAX as usize;

struct Pool<T> {
    slots: RwLock<Vec<Option<Arc<T>>>>,
    index: RwLock<FxHashMap<Arc<T>, u32>>,
}

impl<T: Eq + std::hash::Hash> Pool<T> {
    fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            index: RwLock::new(FxHashMap::default()),
        }
    }

    fn find(&self, probe: T, what: &str) -> u32 {
        if let Some(&id) = self.index.read().unwrap().get(&probe) {
            return id;
        }
        // Miss: take the write locks and re-check, another worker may have
        // inserted the same value since the read.
        let mut index = self.index.write().unwrap();
        if let Some(&id) = index.get(&probe) {
            return id;
        }
        let mut slots = self.slots.write().unwrap();
        if slots.len() >= INDEX_MAX {
            panic!("{what} index capacity exceeded; search state is poisoned");
        }
        let id = slots.len() as u32;
        let value = Arc::new(probe);
        slots.push(Some(Arc::clone(&value)));
        index.insert(value, id);
        id
    }

    fn get(&self, id: u32, what: &str) -> Arc<T> {
        match &self.slots.read().unwrap()[id as usize] {
            Some(value) => Arc::clone(value),
            None => panic!("{what} index {id} refers to a deleted entry"),
        }
    }

    fn live_count(&self) -> usize {
        self.slots
            .read()
            .unwrap()
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    fn clear(&self) {
        self.slots.write().unwrap().clear();
        self.index.write().unwrap().clear();
    }

    /// Clears every slot matching `doomed`, removing it from the dedup
    /// index as well.
    fn sweep(&self, doomed: impl Fn(&T) -> bool) {
        let mut index = self.index.write().unwrap();
        let mut slots = self.slots.write().unwrap();
        for slot in slots.iter_mut() {
            if let Some(value) = slot {
                if doomed(value) {
                    index.remove(&**value);
                    *slot = None;
                }
            }
        }
    }
}

/// The three interning pools owned by a search session.
pub struct Pools {
    clk_infos: Pool<ClkInfo>,
    tags: Pool<Tag>,
    tag_groups: Pool<TagGroup>,
}

impl Pools {
    /// Creates empty pools.
    pub fn new() -> Self {
        Self {
            clk_infos: Pool::new(),
            tags: Pool::new(),
            tag_groups: Pool::new(),
        }
    }

    /// Interns a clock info, returning its ID.
    pub fn find_clk_info(&self, probe: ClkInfo) -> ClkInfoId {
        ClkInfoId::from_raw(self.clk_infos.find(probe, "clk info"))
    }

    /// Returns the clock info with the given ID.
    pub fn clk_info(&self, id: ClkInfoId) -> Arc<ClkInfo> {
        self.clk_infos.get(id.as_raw(), "clk info")
    }

    /// Returns the number of live clock infos.
    pub fn clk_info_count(&self) -> usize {
        self.clk_infos.live_count()
    }

    /// Interns a tag, returning its ID.
    pub fn find_tag(&self, probe: Tag) -> TagId {
        TagId::from_raw(self.tags.find(probe, "tag"))
    }

    /// Returns the tag with the given ID.
    pub fn tag(&self, id: TagId) -> Arc<Tag> {
        self.tags.get(id.as_raw(), "tag")
    }

    /// Returns the number of live tags.
    pub fn tag_count(&self) -> usize {
        self.tags.live_count()
    }

    /// Interns a tag group, returning its ID.
    pub fn find_tag_group(&self, probe: TagGroup) -> TagGroupId {
        TagGroupId::from_raw(self.tag_groups.find(probe, "tag group"))
    }

    /// Returns the tag group with the given ID.
    pub fn tag_group(&self, id: TagGroupId) -> Arc<TagGroup> {
        self.tag_groups.get(id.as_raw(), "tag group")
    }

    /// Returns the number of live tag groups.
    pub fn tag_group_count(&self) -> usize {
        self.tag_groups.live_count()
    }

    /// Clears all pools.
    pub fn clear(&self) {
        self.clk_infos.clear();
        self.tags.clear();
        self.tag_groups.clear();
    }

    /// Deletes filter-marked tags and groups, and clock infos anchored on a
    /// filter-marked path, so a completed filter pass leaves no stale
    /// references behind.
    pub fn delete_filter_objects(&self) {
        self.tag_groups.sweep(|group| group.has_filter_tag);
        // Collect the doomed tag IDs before sweeping so clock-info anchors
        // can be checked against them.
        let doomed_tags: Vec<TagId> = {
            let slots = self.tags.slots.read().unwrap();
            slots
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| {
                    slot.as_ref()
                        .filter(|tag| tag.is_filter)
                        .map(|_| TagId::from_raw(i as u32))
                })
                .collect()
        };
        self.tags.sweep(|tag| tag.is_filter);
        self.clk_infos.sweep(|info| {
            info.crpr_clk_path
                .is_some_and(|path| doomed_tags.contains(&path.tag))
        });
    }
}

impl Default for Pools {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempo_sdc::ApIndex;

    #[test]
    fn structural_equality_implies_same_id() {
        let pools = Pools::new();
        let a = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(0)));
        let b = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(0)));
        let c = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(1)));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pools.clk_info_count(), 2);
    }

    #[test]
    fn lookup_returns_interned_value() {
        let pools = Pools::new();
        let id = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(3)));
        assert_eq!(pools.clk_info(id).ap, ApIndex::from_raw(3));
    }

    #[test]
    fn clear_resets_ids() {
        let pools = Pools::new();
        pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(0)));
        pools.clear();
        assert_eq!(pools.clk_info_count(), 0);
        let id = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(9)));
        assert_eq!(id.as_raw(), 0);
    }

    #[test]
    fn concurrent_interning_converges() {
        use std::sync::Arc as StdArc;
        use std::thread;

        let pools = StdArc::new(Pools::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pools = StdArc::clone(&pools);
            handles.push(thread::spawn(move || {
                (0..64)
                    .map(|i| {
                        pools
                            .find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(i % 4)))
                            .as_raw()
                    })
                    .collect::<Vec<_>>()
            }));
        }
        let results: Vec<Vec<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(pools.clk_info_count(), 4);
        // Every thread saw the same ID for the same value.
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
    }

    #[test]
    fn filter_sweep_clears_marked_tags() {
        use crate::tag::Tag;
        use tempo_common::RiseFall;

        let pools = Pools::new();
        let ci = pools.find_clk_info(ClkInfo::unclocked(ApIndex::from_raw(0)));
        let plain = pools.find_tag(Tag::new(
            RiseFall::Rise,
            ApIndex::from_raw(0),
            ci,
            false,
            None,
            false,
            vec![],
            false,
            false,
        ));
        let filtered = pools.find_tag(Tag::new(
            RiseFall::Fall,
            ApIndex::from_raw(0),
            ci,
            false,
            None,
            false,
            vec![],
            false,
            true,
        ));
        assert_eq!(pools.tag_count(), 2);
        pools.delete_filter_objects();
        assert_eq!(pools.tag_count(), 1);
        // Survivor keeps its identity; re-interning the filtered tag gets a
        // fresh slot rather than resurrecting the deleted one.
        assert_eq!(pools.tag(plain).tr, RiseFall::Rise);
        let again = pools.find_tag(Tag::new(
            RiseFall::Fall,
            ApIndex::from_raw(0),
            ci,
            false,
            None,
            false,
            vec![],
            false,
            true,
        ));
        assert_ne!(again, filtered);
    }
}
