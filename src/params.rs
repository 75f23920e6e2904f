use crate::error::*;
use crate::geometry::Boundary;
use crate::util::*;

/// Number of scratch slots a gather engine allocates unless told otherwise.
/// The double-buffered pipeline uses up to 8 at once,
/// see `TermTable::slots_required`.
pub const DEFAULT_SLOTS: usize = 16;

/// Lattice setup is configurable.
/// These are all the parameters.
#[derive(Clone, Debug)]
pub struct LatticeParameters<const GRID_DIMENSION: usize> {
    /// Global lattice extents, periodic in every dimension.
    pub extents: Coord<GRID_DIMENSION>,

    /// Boundary phase per dimension, applied by stencil combines.
    pub boundaries: [Boundary; GRID_DIMENSION],

    /// How many nodes share the lattice.
    pub nodes: usize,

    /// Seed for the per-site generators, `None` skips them.
    pub seed: Option<u64>,

    /// Size of each node's scratch slot pool.
    pub slots: usize,

    /// Site loops are chunked with this size for multi-threading.
    pub chunk_size: usize,
}

impl<const GRID_DIMENSION: usize> std::default::Default
    for LatticeParameters<GRID_DIMENSION>
{
    fn default() -> Self {
        LatticeParameters {
            extents: Coord::from_element(4),
            boundaries: [Boundary::Periodic; GRID_DIMENSION],
            nodes: 1,
            seed: None,
            slots: DEFAULT_SLOTS,
            chunk_size: 1000,
        }
    }
}

impl<const GRID_DIMENSION: usize> LatticeParameters<GRID_DIMENSION> {
    pub fn new(extents: Coord<GRID_DIMENSION>, nodes: usize) -> Self {
        LatticeParameters {
            extents,
            nodes,
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_boundaries(mut self, boundaries: [Boundary; GRID_DIMENSION]) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Reject parameters no node could build a lattice from.
    /// The node layout itself is checked by `Geometry::new`.
    pub fn validate(&self) -> Result<()> {
        for d in 0..GRID_DIMENSION {
            if self.extents[d] <= 0 {
                return Err(LatticeError::InvalidExtent {
                    dimension: d,
                    extent: self.extents[d],
                });
            }
        }
        if self.nodes == 0 {
            return Err(LatticeError::NoNodes);
        }
        if self.slots < 2 {
            return Err(LatticeError::TooFewSlots {
                slots: self.slots,
                required: 2,
            });
        }
        if self.chunk_size == 0 {
            return Err(LatticeError::ZeroChunkSize);
        }
        Ok(())
    }
}
