//! Double-buffered stencil evaluation.
//!
//! A stencil operator is a table of terms, each gathering `k` inputs from
//! some directions. Pipelined evaluation posts the gathers of term `t + 1`
//! before waiting on term `t`, so the transfers of the next term overlap
//! the combine of the current one.

mod inputs;
mod ring;
mod term;

pub use inputs::*;
pub use ring::*;
pub use term::*;

use crate::comm::Communicator;
use crate::field::*;
use crate::gather::*;
use crate::geometry::*;
use crate::partition::*;
use rayon::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PipelineMode {
    #[default]
    Pipelined,
    /// Post, wait, combine and release one term at a time.
    Sequential,
}

/// What one pipeline run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Slots owned by the engine while each term was combined, in term
    /// order. This counts every outstanding gather, not only the pipeline's.
    pub slots_in_use: Vec<usize>,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct StencilPipeline {
    pub mode: PipelineMode,
}

impl StencilPipeline {
    pub fn new(mode: PipelineMode) -> Self {
        StencilPipeline { mode }
    }

    /// Evaluate `table` over the sites selected by `parity`.
    ///
    /// Accumulators are cleared first. For every term, in table order,
    /// `accumulators[term.output][x] += weight * phase(x) * kernel(term, x, inputs)`
    /// where input `i` is source `term.inputs[i].source` gathered along
    /// `term.inputs[i].offset`. Both modes give bit-identical results.
    #[allow(clippy::too_many_arguments)]
    pub fn run<'p, const GRID_DIMENSION: usize, S, C, A, K>(
        &self,
        engine: &mut GatherEngine<'p, GRID_DIMENSION, S, C>,
        table: &TermTable,
        sources: &[&dyn TermSource<GRID_DIMENSION, S, C>],
        kernel: K,
        accumulators: &mut [Field<A>],
        parity: ParityFilter,
    ) -> PipelineSummary
    where
        S: Sync,
        C: Communicator,
        A: Accumulate,
        K: Fn(&Term, &Site<GRID_DIMENSION, S>, &TermValues<'_>) -> A + Sync,
    {
        profiling::scope!("StencilPipeline::run");
        let slots = Self::check(engine, table, sources.len(), accumulators);
        tracing::debug!(
            node = engine.this_node(),
            table = table.name(),
            terms = table.len(),
            mode = ?self.mode,
            "running stencil"
        );

        let chunk_size = engine.partition().chunk_size();
        for a in accumulators.iter_mut() {
            a.fill(A::zeroed(), chunk_size);
        }

        let terms = table.terms();
        let mut summary = PipelineSummary {
            slots_in_use: Vec::with_capacity(terms.len()),
        };
        let mut ring = BufferRing::new(slots);
        match self.mode {
            PipelineMode::Pipelined => {
                let first = ring.active_index();
                Self::post_term(engine, &mut ring, first, &terms[0], sources, parity);
                for (t, term) in terms.iter().enumerate() {
                    if let Some(next) = terms.get(t + 1) {
                        let other = ring.inactive_index();
                        Self::post_term(engine, &mut ring, other, next, sources, parity);
                    }
                    let held = Self::finish_term(
                        engine,
                        &mut ring,
                        table,
                        term,
                        &kernel,
                        accumulators,
                        parity,
                    );
                    summary.slots_in_use.push(held);
                    ring.flip();
                }
            }
            PipelineMode::Sequential => {
                for term in terms {
                    let active = ring.active_index();
                    Self::post_term(engine, &mut ring, active, term, sources, parity);
                    let held = Self::finish_term(
                        engine,
                        &mut ring,
                        table,
                        term,
                        &kernel,
                        accumulators,
                        parity,
                    );
                    summary.slots_in_use.push(held);
                }
            }
        }
        debug_assert!(ring.is_idle());
        summary
    }

    /// Reject tables this engine cannot run, hand back the slots to use.
    fn check<'p, const GRID_DIMENSION: usize, S, C, T>(
        engine: &GatherEngine<'p, GRID_DIMENSION, S, C>,
        table: &TermTable,
        sources: usize,
        accumulators: &[Field<T>],
    ) -> Vec<SlotId>
    where
        S: Sync,
        C: Communicator,
        T: Accumulate,
    {
        let node = engine.this_node();
        let partition = engine.partition();
        let required = table.slots_required();
        let free: Vec<SlotId> = (0..engine.number_of_slots())
            .map(SlotId)
            .filter(|s| engine.is_slot_free(*s))
            .collect();
        if free.len() < required {
            panic!(
                "ERROR: node{}: {} needs {} gather slots, {} of {} are free",
                node,
                table.name(),
                required,
                free.len(),
                engine.number_of_slots()
            );
        }
        if table.sources() > sources {
            panic!(
                "ERROR: node{}: {} reads source {}, only {} given",
                node,
                table.name(),
                table.sources() - 1,
                sources
            );
        }
        if table.outputs() > accumulators.len() {
            panic!(
                "ERROR: node{}: {} writes accumulator {}, only {} given",
                node,
                table.name(),
                table.outputs() - 1,
                accumulators.len()
            );
        }
        if let Some(a) = accumulators
            .iter()
            .position(|a| a.len() != partition.sites_on_node())
        {
            panic!(
                "ERROR: node{}: accumulator {} has {} values for {} sites",
                node,
                a,
                accumulators[a].len(),
                partition.sites_on_node()
            );
        }
        for term in table.terms() {
            let offsets = term.inputs.iter().map(|i| i.offset).chain(term.boundary);
            for offset in offsets {
                if partition.try_offset(offset).is_none() {
                    panic!(
                        "ERROR: node{}: {} uses unrecognized offset {}",
                        node,
                        table.name(),
                        offset
                    );
                }
            }
        }
        free.into_iter().take(required).collect()
    }

    fn post_term<'p, const GRID_DIMENSION: usize, S, C>(
        engine: &mut GatherEngine<'p, GRID_DIMENSION, S, C>,
        ring: &mut BufferRing,
        set: usize,
        term: &Term,
        sources: &[&dyn TermSource<GRID_DIMENSION, S, C>],
        parity: ParityFilter,
    ) where
        S: Sync,
        C: Communicator,
    {
        ring.post(set, |i, slot| {
            let input = term.inputs[i];
            sources[input.source].post(engine, input.offset, parity, slot)
        });
    }

    /// Wait, combine and release one term, returns the slots held while
    /// combining.
    fn finish_term<'p, const GRID_DIMENSION: usize, S, C, A, K>(
        engine: &mut GatherEngine<'p, GRID_DIMENSION, S, C>,
        ring: &mut BufferRing,
        table: &TermTable,
        term: &Term,
        kernel: &K,
        accumulators: &mut [Field<A>],
        parity: ParityFilter,
    ) -> usize
    where
        S: Sync,
        C: Communicator,
        A: Accumulate,
        K: Fn(&Term, &Site<GRID_DIMENSION, S>, &TermValues<'_>) -> A + Sync,
    {
        let set = ring.active_index();
        ring.wait(set, |handle| engine.wait(handle));
        let held = engine.slots_in_use();
        {
            profiling::scope!("combine");
            let partition = engine.partition();
            let sites = partition.sites();
            let chunk_size = partition.chunk_size();
            let inputs: Vec<GatheredBytes<'_>> = ring
                .set(set)
                .completed()
                .iter()
                .map(|c| engine.gathered_bytes(c))
                .collect();
            let phases = term.boundary.map(|o| partition.offset(o));
            accumulators[term.output]
                .as_mut_slice()
                .par_chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(chunk_index, chunk)| {
                    for (i, acc) in chunk.iter_mut().enumerate() {
                        let x = chunk_index * chunk_size + i;
                        let site = &sites[x];
                        if !parity.contains(site.parity()) {
                            continue;
                        }
                        let values = TermValues {
                            table: table.name(),
                            inputs: &inputs,
                            local_index: x,
                        };
                        let phase = phases.map_or(1.0, |p| p.phase(x));
                        acc.scaled_add(term.weight * phase, &kernel(term, site, &values));
                    }
                });
        }
        ring.release(set, |completed| engine.release(completed));
        held
    }
}
