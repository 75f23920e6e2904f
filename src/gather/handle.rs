use crate::comm::MessageTag;
use crate::gather::slots::{Payload, SlotId};
use crate::geometry::*;

/// Bookkeeping shared by both handle states.
#[derive(Clone, Debug)]
pub(crate) struct Ticket {
    pub engine: u64,
    pub id: u64,
    pub slot: SlotId,
    pub offset: OffsetId,
    pub filter: ParityFilter,
    pub tag: MessageTag,
    pub payload: Payload,
}

/// A posted gather. Pass it to `GatherEngine::wait`.
#[must_use = "a posted gather must be waited for and released"]
#[derive(Debug)]
pub struct GatherHandle {
    pub(crate) ticket: Option<Ticket>,
}

/// A finished gather whose slot holds the neighbor values.
/// Pass it to `GatherEngine::release` when done reading.
#[must_use = "a completed gather must be released"]
#[derive(Debug)]
pub struct CompletedGather {
    pub(crate) ticket: Option<Ticket>,
}

fn leak_check(ticket: &Option<Ticket>, state: &str) {
    if let Some(t) = ticket {
        if !std::thread::panicking() {
            panic!(
                "ERROR: {} gather #{} on slot {} was dropped, wait and release every gather",
                state, t.id, t.slot.0
            );
        }
    }
}

impl GatherHandle {
    pub fn slot(&self) -> SlotId {
        self.ticket().slot
    }

    pub fn offset(&self) -> OffsetId {
        self.ticket().offset
    }

    pub(crate) fn ticket(&self) -> &Ticket {
        match &self.ticket {
            Some(t) => t,
            None => unreachable!("handle without a ticket"),
        }
    }

    pub(crate) fn take(mut self) -> Ticket {
        match self.ticket.take() {
            Some(t) => t,
            None => unreachable!("handle without a ticket"),
        }
    }
}

impl CompletedGather {
    pub fn slot(&self) -> SlotId {
        self.ticket().slot
    }

    pub fn offset(&self) -> OffsetId {
        self.ticket().offset
    }

    pub fn filter(&self) -> ParityFilter {
        self.ticket().filter
    }

    pub(crate) fn ticket(&self) -> &Ticket {
        match &self.ticket {
            Some(t) => t,
            None => unreachable!("handle without a ticket"),
        }
    }

    pub(crate) fn take(mut self) -> Ticket {
        match self.ticket.take() {
            Some(t) => t,
            None => unreachable!("handle without a ticket"),
        }
    }
}

impl Drop for GatherHandle {
    fn drop(&mut self) {
        leak_check(&self.ticket, "posted");
    }
}

impl Drop for CompletedGather {
    fn drop(&mut self) {
        leak_check(&self.ticket, "completed");
    }
}
