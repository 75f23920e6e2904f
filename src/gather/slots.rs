use crate::util::*;
use bytemuck::{Pod, Zeroable};
use std::any::TypeId;

const WORD_BYTES: usize = 64;

/// Slot storage unit, aligned for any payload a gather can carry.
#[derive(Copy, Clone, Pod, Zeroable)]
#[repr(C, align(64))]
struct SlotWord([u8; WORD_BYTES]);

/// Index into a gather engine's scratch slot pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// What a claimed slot currently holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Payload {
    pub type_id: TypeId,
    pub size: usize,
    pub type_name: &'static str,
}

impl Payload {
    pub fn of<T: Pod>() -> Self {
        Payload {
            type_id: TypeId::of::<T>(),
            size: std::mem::size_of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }
}

struct Slot {
    words: Vec<SlotWord>,
    owner: Option<u64>,
    payload: Option<Payload>,
}

/// Fixed number of reusable gather result buffers.
/// Contents survive release, a filtered gather only overwrites the
/// entries of the sites it selects.
pub(crate) struct SlotPool {
    slots: Vec<Slot>,
    sites: usize,
    node: NodeId,
}

impl SlotPool {
    pub fn new(count: usize, sites: usize, bytes_per_site: usize, node: NodeId) -> Self {
        let mut slots = allocate_or_die(count, "gather slots", node);
        for _ in 0..count {
            slots.push(Slot {
                words: Vec::new(),
                owner: None,
                payload: None,
            });
        }
        let mut result = SlotPool { slots, sites, node };
        for i in 0..count {
            result.reserve(SlotId(i), bytes_per_site);
        }
        result
    }

    /// Make room for `bytes_per_site` in a slot, keeping what is there.
    fn reserve(&mut self, slot: SlotId, bytes_per_site: usize) {
        let needed = (self.sites * bytes_per_site).div_ceil(WORD_BYTES);
        let words = &mut self.slots[slot.0].words;
        if words.len() >= needed {
            return;
        }
        if words.try_reserve_exact(needed - words.len()).is_err() {
            panic!(
                "node{}: no room for gather slot {} ({})",
                self.node,
                slot.0,
                human_readable_bytes(needed * WORD_BYTES)
            );
        }
        words.resize(needed, SlotWord::zeroed());
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.slots.iter().map(|s| s.words.len() * WORD_BYTES).sum()
    }

    #[track_caller]
    fn check_range(&self, slot: SlotId) {
        if slot.0 >= self.slots.len() {
            panic!(
                "ERROR: node{}: slot {} out of range, the pool has {} slots",
                self.node,
                slot.0,
                self.slots.len()
            );
        }
    }

    pub fn is_free(&self, slot: SlotId) -> bool {
        self.check_range(slot);
        self.slots[slot.0].owner.is_none()
    }

    pub fn lowest_free(&self) -> Option<SlotId> {
        self.slots.iter().position(|s| s.owner.is_none()).map(SlotId)
    }

    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|s| s.owner.is_some()).count()
    }

    #[track_caller]
    pub fn claim(&mut self, slot: SlotId, owner: u64, payload: Payload) {
        self.check_range(slot);
        if let Some(current) = self.slots[slot.0].owner {
            panic!(
                "ERROR: node{}: slot {} is still owned by gather #{}",
                self.node, slot.0, current
            );
        }
        self.reserve(slot, payload.size);
        let s = &mut self.slots[slot.0];
        s.owner = Some(owner);
        s.payload = Some(payload);
    }

    #[track_caller]
    pub fn release(&mut self, slot: SlotId, owner: u64) {
        self.check_range(slot);
        let s = &mut self.slots[slot.0];
        if s.owner != Some(owner) {
            panic!(
                "ERROR: node{}: gather #{} released slot {} owned by {:?}",
                self.node, owner, slot.0, s.owner
            );
        }
        s.owner = None;
    }

    /// Raw bytes of a claimed slot, `sites * payload size` long.
    pub fn bytes_mut(&mut self, slot: SlotId) -> &mut [u8] {
        let sites = self.sites;
        let s = &mut self.slots[slot.0];
        let len = sites * s.payload.map_or(0, |p| p.size);
        &mut bytemuck::cast_slice_mut::<SlotWord, u8>(&mut s.words)[..len]
    }

    pub fn bytes(&self, slot: SlotId) -> &[u8] {
        let s = &self.slots[slot.0];
        let len = self.sites * s.payload.map_or(0, |p| p.size);
        &bytemuck::cast_slice::<SlotWord, u8>(&s.words)[..len]
    }

    pub fn typed<T: Pod>(&self, slot: SlotId) -> &[T] {
        let s = &self.slots[slot.0];
        debug_assert_eq!(s.payload.map(|p| p.type_id), Some(TypeId::of::<T>()));
        let len = self.sites * std::mem::size_of::<T>();
        bytemuck::cast_slice(&bytemuck::cast_slice::<SlotWord, u8>(&s.words)[..len])
    }

    pub fn typed_mut<T: Pod>(&mut self, slot: SlotId) -> &mut [T] {
        let len = self.sites * std::mem::size_of::<T>();
        let s = &mut self.slots[slot.0];
        debug_assert_eq!(s.payload.map(|p| p.type_id), Some(TypeId::of::<T>()));
        bytemuck::cast_slice_mut(&mut bytemuck::cast_slice_mut::<SlotWord, u8>(&mut s.words)[..len])
    }

    pub fn payload(&self, slot: SlotId) -> Option<Payload> {
        self.slots[slot.0].payload
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn claim_release_test() {
        let mut pool = SlotPool::new(3, 10, 8, 0);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.lowest_free(), Some(SlotId(0)));
        pool.claim(SlotId(0), 1, Payload::of::<f64>());
        pool.claim(SlotId(2), 2, Payload::of::<f64>());
        assert_eq!(pool.lowest_free(), Some(SlotId(1)));
        assert_eq!(pool.in_use(), 2);
        pool.release(SlotId(0), 1);
        assert!(pool.is_free(SlotId(0)));
        assert_eq!(pool.in_use(), 1);
    }

    #[test]
    #[should_panic(expected = "still owned")]
    fn busy_slot_test() {
        let mut pool = SlotPool::new(2, 10, 8, 0);
        pool.claim(SlotId(1), 1, Payload::of::<f64>());
        pool.claim(SlotId(1), 2, Payload::of::<f64>());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn range_test() {
        let mut pool = SlotPool::new(2, 10, 8, 0);
        pool.claim(SlotId(2), 1, Payload::of::<f64>());
    }

    #[test]
    fn grow_keeps_alignment_test() {
        let mut pool = SlotPool::new(1, 5, 4, 0);
        pool.claim(SlotId(0), 1, Payload::of::<[f64; 9]>());
        let values = pool.typed_mut::<[f64; 9]>(SlotId(0));
        assert_eq!(values.len(), 5);
        values[4] = [1.0; 9];
        assert_eq!(pool.typed::<[f64; 9]>(SlotId(0))[4][8], 1.0);
        assert_eq!(pool.bytes_mut(SlotId(0)).len(), 5 * 72);
        assert!(pool.size_in_bytes() >= 5 * 72);
    }
}
