use crate::comm::Communicator;
use crate::field::*;
use crate::gather::*;
use crate::geometry::*;
use crate::par_slice;
use crate::partition::*;
use crate::pipeline::*;
use crate::stencil::standard_stencils;

/// Optional parts of a stencil operator, picked at configuration time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    NeighborSum,
    Gradient,
    DiagonalPairs,
}

/// The term tables for a set of capabilities.
/// Applying the operator runs every table and sums all of their outputs.
#[derive(Clone, Debug)]
pub struct StencilOperator {
    capabilities: Vec<Capability>,
    tables: Vec<TermTable>,
}

impl StencilOperator {
    /// Capabilities are deduplicated and applied in a fixed order.
    pub fn from_capabilities<const GRID_DIMENSION: usize, S>(
        partition: &mut Partition<GRID_DIMENSION, S>,
        capabilities: &[Capability],
    ) -> Self {
        let mut capabilities = capabilities.to_vec();
        capabilities.sort();
        capabilities.dedup();
        let tables = capabilities
            .iter()
            .map(|c| match c {
                Capability::NeighborSum => {
                    standard_stencils::nearest_neighbor_sum::<GRID_DIMENSION>()
                }
                Capability::Gradient => {
                    standard_stencils::central_gradient::<GRID_DIMENSION>()
                }
                Capability::DiagonalPairs => standard_stencils::diagonal_pairs(partition),
            })
            .collect();
        StencilOperator {
            capabilities,
            tables,
        }
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn tables(&self) -> &[TermTable] {
        &self.tables
    }

    pub fn outputs(&self) -> usize {
        self.tables.iter().map(|t| t.outputs()).max().unwrap_or(0)
    }

    pub fn sources(&self) -> usize {
        self.tables.iter().map(|t| t.sources()).max().unwrap_or(0)
    }

    /// Run every table through `pipeline`, summing into `accumulators`.
    #[allow(clippy::too_many_arguments)]
    pub fn apply<'p, const GRID_DIMENSION: usize, S, C, A, K>(
        &self,
        pipeline: &StencilPipeline,
        engine: &mut GatherEngine<'p, GRID_DIMENSION, S, C>,
        sources: &[&dyn TermSource<GRID_DIMENSION, S, C>],
        kernel: K,
        accumulators: &mut [Field<A>],
        parity: ParityFilter,
    ) where
        S: Sync,
        C: Communicator,
        A: Accumulate,
        K: Fn(&Term, &Site<GRID_DIMENSION, S>, &TermValues<'_>) -> A + Sync,
    {
        let partition = engine.partition();
        let chunk_size = partition.chunk_size();
        for a in accumulators.iter_mut() {
            a.fill(A::zeroed(), chunk_size);
        }
        let mut scratch: Vec<Field<A>> =
            (0..accumulators.len()).map(|_| Field::new(partition)).collect();
        for table in &self.tables {
            pipeline.run(engine, table, sources, &kernel, &mut scratch, parity);
            for (total, part) in accumulators.iter_mut().zip(scratch.iter()) {
                let part = part.as_slice();
                par_slice::for_each_indexed(total.as_mut_slice(), chunk_size, |x, v| {
                    v.scaled_add(1.0, &part[x]);
                });
            }
        }
    }
}
