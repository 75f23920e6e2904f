use crate::gather::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SetState {
    Idle,
    Posted,
    Completed,
}

/// The slots for one term's gathers and the handles currently in them.
#[derive(Debug)]
pub struct BufferSet {
    slots: Vec<SlotId>,
    state: SetState,
    posted: Vec<GatherHandle>,
    completed: Vec<CompletedGather>,
}

impl BufferSet {
    fn new(slots: Vec<SlotId>) -> Self {
        BufferSet {
            slots,
            state: SetState::Idle,
            posted: Vec::new(),
            completed: Vec::new(),
        }
    }

    pub fn slots(&self) -> &[SlotId] {
        &self.slots
    }

    pub fn state(&self) -> SetState {
        self.state
    }

    pub fn completed(&self) -> &[CompletedGather] {
        assert_eq!(self.state, SetState::Completed, "reading a set before its gathers finished");
        &self.completed
    }
}

/// Two buffer sets used alternately.
/// The next term posts into the inactive set while the active one is
/// waited for, combined and released.
#[derive(Debug)]
pub struct BufferRing {
    sets: [BufferSet; 2],
    active: usize,
}

impl BufferRing {
    /// `slots` is split in half, the first half starts out active.
    pub fn new(slots: Vec<SlotId>) -> Self {
        assert!(
            !slots.is_empty() && slots.len() % 2 == 0,
            "a buffer ring needs an even number of slots, got {}",
            slots.len()
        );
        let mut first = slots;
        let second = first.split_off(first.len() / 2);
        BufferRing {
            sets: [BufferSet::new(first), BufferSet::new(second)],
            active: 0,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn inactive_index(&self) -> usize {
        1 - self.active
    }

    pub fn set(&self, index: usize) -> &BufferSet {
        &self.sets[index]
    }

    pub fn flip(&mut self) {
        assert_eq!(
            self.sets[self.active].state,
            SetState::Idle,
            "flipping away from a set that is still in use"
        );
        self.active = 1 - self.active;
    }

    /// Post into set `index` with `post(slot_position, slot)`.
    pub fn post<F>(&mut self, index: usize, mut post: F)
    where
        F: FnMut(usize, SlotId) -> GatherHandle,
    {
        let set = &mut self.sets[index];
        assert_eq!(set.state, SetState::Idle, "posting into a set that is in flight");
        for (i, slot) in set.slots.iter().enumerate() {
            set.posted.push(post(i, *slot));
        }
        set.state = SetState::Posted;
    }

    pub fn wait<F>(&mut self, index: usize, mut wait: F)
    where
        F: FnMut(GatherHandle) -> CompletedGather,
    {
        let set = &mut self.sets[index];
        assert_eq!(set.state, SetState::Posted, "waiting on a set that was not posted");
        for handle in set.posted.drain(..) {
            set.completed.push(wait(handle));
        }
        set.state = SetState::Completed;
    }

    pub fn release<F>(&mut self, index: usize, mut release: F)
    where
        F: FnMut(CompletedGather),
    {
        let set = &mut self.sets[index];
        assert_eq!(set.state, SetState::Completed, "releasing a set that did not complete");
        for completed in set.completed.drain(..) {
            release(completed);
        }
        set.state = SetState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.sets.iter().all(|s| s.state == SetState::Idle)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn split_test() {
        let ring = BufferRing::new((0..6).map(SlotId).collect());
        assert_eq!(ring.set(0).slots(), &[SlotId(0), SlotId(1), SlotId(2)]);
        assert_eq!(ring.set(1).slots(), &[SlotId(3), SlotId(4), SlotId(5)]);
        assert_eq!(ring.active_index(), 0);
        assert_eq!(ring.inactive_index(), 1);
        assert!(ring.is_idle());
    }

    #[test]
    fn flip_test() {
        let mut ring = BufferRing::new(vec![SlotId(0), SlotId(1)]);
        ring.flip();
        assert_eq!(ring.active_index(), 1);
        ring.flip();
        assert_eq!(ring.active_index(), 0);
    }

    #[test]
    #[should_panic(expected = "not posted")]
    fn wait_idle_test() {
        let mut ring = BufferRing::new(vec![SlotId(0), SlotId(1)]);
        ring.wait(0, |_| unreachable!());
    }

    #[test]
    #[should_panic(expected = "did not complete")]
    fn release_idle_test() {
        let mut ring = BufferRing::new(vec![SlotId(0), SlotId(1)]);
        ring.release(1, |_| unreachable!());
    }

    #[test]
    #[should_panic(expected = "even number")]
    fn odd_slots_test() {
        let _ = BufferRing::new(vec![SlotId(0)]);
    }
}
