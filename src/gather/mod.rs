//! Asynchronous halo exchange.
//!
//! `start_gather_*` posts a gather into a scratch slot and returns at
//! once. Same-node neighbors are copied while posting, remote values are
//! packed and sent to their owners. `wait` unpacks whatever is still in
//! flight, `release` hands the slot back to the pool.
//!
//! Every node has to post the same gathers in the same order,
//! the message tags come from a per-node gather counter.

mod handle;
mod slots;

pub use handle::{CompletedGather, GatherHandle};
pub(crate) use slots::Payload;
pub use slots::SlotId;

use crate::comm::*;
use crate::error::*;
use crate::field::*;
use crate::geometry::*;
use crate::par_slice;
use crate::partition::*;
use crate::util::*;
use bytemuck::Pod;
use handle::Ticket;
use slots::SlotPool;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};

static ENGINE_IDS: AtomicU64 = AtomicU64::new(1);

/// A completed gather's slot before its payload type is known.
#[derive(Copy, Clone, Debug)]
pub(crate) struct GatheredBytes<'a> {
    pub bytes: &'a [u8],
    pub payload: Payload,
}

/// Slots start out large enough for one `f64` per site and grow on demand.
const INITIAL_BYTES_PER_SITE: usize = std::mem::size_of::<f64>();

pub struct GatherEngine<'p, const GRID_DIMENSION: usize, S, C> {
    id: u64,
    partition: &'p Partition<GRID_DIMENSION, S>,
    comm: C,
    pool: SlotPool,
    gathers: u64,
}

impl<'p, const GRID_DIMENSION: usize, S, C> GatherEngine<'p, GRID_DIMENSION, S, C>
where
    S: Sync,
    C: Communicator,
{
    pub fn new(
        partition: &'p Partition<GRID_DIMENSION, S>,
        comm: C,
        slots: usize,
    ) -> Result<Self> {
        if slots < 2 {
            return Err(LatticeError::TooFewSlots { slots, required: 2 });
        }
        let node = partition.this_node();
        if comm.this_node() != node
            || comm.number_of_nodes() != partition.geometry().number_of_nodes()
        {
            panic!(
                "ERROR: node{}: transport is node{} of {}, the lattice has {} nodes",
                node,
                comm.this_node(),
                comm.number_of_nodes(),
                partition.geometry().number_of_nodes()
            );
        }
        let pool = SlotPool::new(
            slots,
            partition.sites_on_node(),
            INITIAL_BYTES_PER_SITE,
            node,
        );
        tracing::debug!(
            node,
            slots,
            "gather slots use {}",
            human_readable_bytes(pool.size_in_bytes())
        );
        Ok(GatherEngine {
            id: ENGINE_IDS.fetch_add(1, Ordering::Relaxed),
            partition,
            comm,
            pool,
            gathers: 0,
        })
    }

    pub fn partition(&self) -> &'p Partition<GRID_DIMENSION, S> {
        self.partition
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    pub fn comm_mut(&mut self) -> &mut C {
        &mut self.comm
    }

    pub fn into_comm(self) -> C {
        self.comm
    }

    pub fn this_node(&self) -> NodeId {
        self.partition.this_node()
    }

    pub fn number_of_slots(&self) -> usize {
        self.pool.len()
    }

    pub fn slots_in_use(&self) -> usize {
        self.pool.in_use()
    }

    pub fn is_slot_free(&self, slot: SlotId) -> bool {
        self.pool.is_free(slot)
    }

    /// Lowest numbered slot not owned by an outstanding gather.
    pub fn free_slot(&self) -> Option<SlotId> {
        self.pool.lowest_free()
    }

    #[track_caller]
    fn free_slot_or_die(&self) -> SlotId {
        match self.pool.lowest_free() {
            Some(slot) => slot,
            None => panic!(
                "ERROR: node{}: all {} gather slots are in use",
                self.this_node(),
                self.pool.len()
            ),
        }
    }

    pub fn start_gather_field<T: Pod + Send + Sync>(
        &mut self,
        field: &Field<T>,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle {
        self.start_gather_from(field, offset, parity, slot)
    }

    pub fn start_gather_field_any<T: Pod + Send + Sync>(
        &mut self,
        field: &Field<T>,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
    ) -> GatherHandle {
        let slot = self.free_slot_or_die();
        self.start_gather_from(field, offset, parity, slot)
    }

    pub fn start_gather_member<T: Pod + Send + Sync>(
        &mut self,
        member: &Member<S, T>,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle {
        self.start_gather_from(member, offset, parity, slot)
    }

    pub fn start_gather_member_any<T: Pod + Send + Sync>(
        &mut self,
        member: &Member<S, T>,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
    ) -> GatherHandle {
        let slot = self.free_slot_or_die();
        self.start_gather_from(member, offset, parity, slot)
    }

    /// Post a gather of `source` along `offset` into `slot`.
    /// For every site `x` selected by `parity`, `slot[x]` will hold the
    /// source value at `x + displacement` once the handle is waited for.
    #[track_caller]
    pub fn start_gather_from<T, G>(
        &mut self,
        source: &G,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle
    where
        T: Pod + Send + Sync,
        G: GatherSource<GRID_DIMENSION, S, T> + Sync + ?Sized,
    {
        profiling::scope!("start_gather");
        let offset = offset.into();
        let partition = self.partition;
        let node = partition.this_node();
        let table = partition.offset(offset);
        let payload = Payload::of::<T>();
        if payload.size == 0 {
            panic!(
                "ERROR: node{}: cannot gather zero-sized {} from {}",
                node,
                payload.type_name,
                source.name()
            );
        }
        let len = source.source_len(partition);
        if len != partition.sites_on_node() {
            panic!(
                "ERROR: node{}: gather source {} has {} values for {} sites",
                node,
                source.name(),
                len,
                partition.sites_on_node()
            );
        }

        self.gathers += 1;
        let id = self.gathers;
        let tag = MessageTag::Gather(id);
        self.pool.claim(slot, id, payload);

        {
            let sites = partition.sites();
            let values = self.pool.typed_mut::<T>(slot);
            par_slice::for_each_indexed(values, partition.chunk_size(), |x, value| {
                if !parity.contains(sites[x].parity()) {
                    return;
                }
                if let NeighborSource::Local(j) = table.source(x) {
                    *value = source.fetch(partition, j);
                }
            });
        }

        for peer in table.peers() {
            let count = peer.send_count(parity);
            if count == 0 {
                continue;
            }
            let mut bytes: Vec<u8> = Vec::with_capacity(count * payload.size);
            for entry in peer.send.iter().filter(|e| parity.contains(e.dest_parity)) {
                bytes.extend_from_slice(bytemuck::bytes_of(
                    &source.fetch(partition, entry.source_local),
                ));
            }
            self.comm.send(peer.node, tag, bytes);
        }

        tracing::trace!(
            node,
            gather = id,
            slot = slot.0,
            offset = %offset,
            "posted {} gather of {}",
            payload.type_name,
            source.name()
        );

        GatherHandle {
            ticket: Some(Ticket {
                engine: self.id,
                id,
                slot,
                offset,
                filter: parity,
                tag,
                payload,
            }),
        }
    }

    #[track_caller]
    fn check_ticket(&self, ticket: &Ticket) {
        if ticket.engine != self.id {
            panic!(
                "ERROR: node{}: gather #{} was posted on another engine",
                self.this_node(),
                ticket.id
            );
        }
    }

    /// Block until every remote value of this gather has landed.
    pub fn wait(&mut self, handle: GatherHandle) -> CompletedGather {
        profiling::scope!("wait_gather");
        self.check_ticket(handle.ticket());
        let ticket = handle.take();
        let node = self.this_node();
        let table = self.partition.offset(ticket.offset);
        let size = ticket.payload.size;

        for peer in table.peers() {
            let count = peer.recv_count(ticket.filter);
            if count == 0 {
                continue;
            }
            let bytes = self.comm.recv(peer.node, ticket.tag);
            if bytes.len() != count * size {
                panic!(
                    "ERROR: node{}: gather #{} expected {} bytes from node{}, got {}",
                    node,
                    ticket.id,
                    count * size,
                    peer.node,
                    bytes.len()
                );
            }
            let slot_bytes = self.pool.bytes_mut(ticket.slot);
            let entries = peer.recv.iter().filter(|e| ticket.filter.contains(e.parity));
            for (chunk, entry) in bytes.chunks_exact(size).zip(entries) {
                let start = entry.dest_local * size;
                slot_bytes[start..start + size].copy_from_slice(chunk);
            }
        }

        tracing::trace!(node, gather = ticket.id, "gather complete");
        CompletedGather {
            ticket: Some(ticket),
        }
    }

    /// Return the slot to the pool.
    pub fn release(&mut self, completed: CompletedGather) {
        self.check_ticket(completed.ticket());
        let ticket = completed.take();
        self.pool.release(ticket.slot, ticket.id);
    }

    /// Gathered values, one per local site.
    /// Entries of sites outside the gather's parity filter hold whatever
    /// the slot held before.
    #[track_caller]
    pub fn gathered<T: Pod>(&self, completed: &CompletedGather) -> &[T] {
        let ticket = completed.ticket();
        self.check_ticket(ticket);
        if ticket.payload.type_id != TypeId::of::<T>() {
            panic!(
                "ERROR: node{}: gather #{} carries {}, read as {}",
                self.this_node(),
                ticket.id,
                ticket.payload.type_name,
                std::any::type_name::<T>()
            );
        }
        self.pool.typed::<T>(ticket.slot)
    }

    /// Slot contents of `completed` with the payload they were posted as.
    pub(crate) fn gathered_bytes(&self, completed: &CompletedGather) -> GatheredBytes<'_> {
        let ticket = completed.ticket();
        self.check_ticket(ticket);
        GatheredBytes {
            bytes: self.pool.bytes(ticket.slot),
            payload: ticket.payload,
        }
    }

    /// Post, wait and release in one go, copying the result out.
    pub fn gather_blocking<T, G>(
        &mut self,
        source: &G,
        offset: impl Into<OffsetId>,
        parity: ParityFilter,
    ) -> Field<T>
    where
        T: Pod + Send + Sync,
        G: GatherSource<GRID_DIMENSION, S, T> + Sync + ?Sized,
    {
        let slot = self.free_slot_or_die();
        let handle = self.start_gather_from::<T, G>(source, offset, parity, slot);
        let completed = self.wait(handle);
        let result = Field::from_vec(self.gathered::<T>(&completed).to_vec());
        self.release(completed);
        result
    }
}
