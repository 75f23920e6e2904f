use crate::comm::Communicator;
use crate::field::*;
use crate::gather::*;
use crate::geometry::*;
use bytemuck::Pod;
use std::any::TypeId;

/// Something a term can gather from.
/// Each source fixes its own payload type, so the inputs of one term may
/// mix link matrices with vectors.
pub trait TermSource<const GRID_DIMENSION: usize, S, C> {
    fn post(
        &self,
        engine: &mut GatherEngine<'_, GRID_DIMENSION, S, C>,
        offset: OffsetId,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle;
}

impl<const GRID_DIMENSION: usize, S, C, T> TermSource<GRID_DIMENSION, S, C> for Field<T>
where
    S: Sync,
    C: Communicator,
    T: Pod + Send + Sync,
{
    fn post(
        &self,
        engine: &mut GatherEngine<'_, GRID_DIMENSION, S, C>,
        offset: OffsetId,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle {
        engine.start_gather_from::<T, Self>(self, offset, parity, slot)
    }
}

impl<const GRID_DIMENSION: usize, S, C, T> TermSource<GRID_DIMENSION, S, C> for Member<S, T>
where
    S: Sync,
    C: Communicator,
    T: Pod + Send + Sync,
{
    fn post(
        &self,
        engine: &mut GatherEngine<'_, GRID_DIMENSION, S, C>,
        offset: OffsetId,
        parity: ParityFilter,
        slot: SlotId,
    ) -> GatherHandle {
        engine.start_gather_from::<T, Self>(self, offset, parity, slot)
    }
}

/// The gathered inputs of one term at one site, in the term's input order.
pub struct TermValues<'a> {
    pub(crate) table: &'a str,
    pub(crate) inputs: &'a [GatheredBytes<'a>],
    pub(crate) local_index: usize,
}

impl TermValues<'_> {
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Input `i` at this site.
    /// Reading an input as anything but the type it was gathered as is fatal.
    #[track_caller]
    pub fn get<U: Pod>(&self, i: usize) -> U {
        let input = &self.inputs[i];
        if input.payload.type_id != TypeId::of::<U>() {
            panic!(
                "ERROR: {}: input {} carries {}, read as {}",
                self.table,
                i,
                input.payload.type_name,
                std::any::type_name::<U>()
            );
        }
        let size = input.payload.size;
        let start = self.local_index * size;
        bytemuck::pod_read_unaligned(&input.bytes[start..start + size])
    }

    /// Every input, all of type `U`.
    pub fn all<U: Pod>(&self) -> impl Iterator<Item = U> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }
}
