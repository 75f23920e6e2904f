mod direction;
mod parity;

pub use direction::*;
pub use parity::*;

use crate::error::*;
use crate::params::LatticeParameters;
use crate::util::indexing::*;
use crate::util::*;

/// What happens to a field value when a displacement wraps around
/// the lattice edge in some dimension.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Boundary {
    Periodic,
    Antiperiodic,
}

/// Global lattice shape and its block layout over the nodes.
///
/// Every node owns an axis aligned block of identical extent.
/// The node grid is found by handing out the prime factors of the
/// node count, largest first, each one to the dimension with the
/// largest sub-extent it divides.
/// Nodes are numbered row-major over the node grid and sites within a
/// node are numbered row-major within the block, so walking the lattice
/// in global row-major order visits each node's sites in local order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Geometry<const GRID_DIMENSION: usize> {
    extents: Coord<GRID_DIMENSION>,
    boundaries: [Boundary; GRID_DIMENSION],
    node_grid: Coord<GRID_DIMENSION>,
    block_extent: Coord<GRID_DIMENSION>,
}

/// Prime factors in non-increasing order.
fn prime_factors_descending(mut n: usize) -> Vec<usize> {
    let mut result = Vec::new();
    let mut p = 2;
    while p * p <= n {
        while n % p == 0 {
            result.push(p);
            n /= p;
        }
        p += 1;
    }
    if n > 1 {
        result.push(n);
    }
    result.reverse();
    result
}

impl<const GRID_DIMENSION: usize> Geometry<GRID_DIMENSION> {
    pub fn new(params: &LatticeParameters<GRID_DIMENSION>) -> Result<Self> {
        params.validate()?;
        let extents = params.extents;
        let mut block_extent = extents;
        let mut node_grid = Coord::from_element(1);
        for p in prime_factors_descending(params.nodes) {
            let p_i32 = i32::try_from(p).map_err(|_| {
                LatticeError::IndivisibleLayout {
                    nodes: params.nodes,
                    extents: extents.iter().copied().collect(),
                }
            })?;
            let mut best: Option<usize> = None;
            for d in 0..GRID_DIMENSION {
                if block_extent[d] % p_i32 != 0 {
                    continue;
                }
                if best.map_or(true, |b| block_extent[d] > block_extent[b]) {
                    best = Some(d);
                }
            }
            let Some(d) = best else {
                return Err(LatticeError::IndivisibleLayout {
                    nodes: params.nodes,
                    extents: extents.iter().copied().collect(),
                });
            };
            block_extent[d] /= p_i32;
            node_grid[d] *= p_i32;
        }

        Ok(Geometry {
            extents,
            boundaries: params.boundaries,
            node_grid,
            block_extent,
        })
    }

    pub fn extents(&self) -> Coord<GRID_DIMENSION> {
        self.extents
    }

    pub fn boundaries(&self) -> &[Boundary; GRID_DIMENSION] {
        &self.boundaries
    }

    /// Nodes per dimension.
    pub fn node_grid(&self) -> Coord<GRID_DIMENSION> {
        self.node_grid
    }

    pub fn block_extent(&self) -> Coord<GRID_DIMENSION> {
        self.block_extent
    }

    pub fn volume(&self) -> usize {
        volume(&self.extents)
    }

    pub fn number_of_nodes(&self) -> usize {
        volume(&self.node_grid)
    }

    /// Every node holds the same number of sites.
    pub fn sites_on_node(&self, node: NodeId) -> usize {
        debug_assert!(node < self.number_of_nodes());
        volume(&self.block_extent)
    }

    pub fn contains(&self, coord: &Coord<GRID_DIMENSION>) -> bool {
        in_extents(coord, &self.extents)
    }

    /// Row-major index over the whole lattice.
    pub fn global_index(&self, coord: &Coord<GRID_DIMENSION>) -> usize {
        coord_to_linear(coord, &self.extents)
    }

    pub fn global_coord(&self, global_index: usize) -> Coord<GRID_DIMENSION> {
        debug_assert!(global_index < self.volume());
        linear_to_coord(global_index, &self.extents)
    }

    fn check_coord(&self, coord: &Coord<GRID_DIMENSION>) -> Result<()> {
        if self.contains(coord) {
            Ok(())
        } else {
            Err(LatticeError::CoordinateOutOfRange {
                coord: coord.iter().copied().collect(),
                extents: self.extents.iter().copied().collect(),
            })
        }
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        let nodes = self.number_of_nodes();
        if node < nodes {
            Ok(())
        } else {
            Err(LatticeError::NodeOutOfRange { node, nodes })
        }
    }

    /// Position of a node in the node grid.
    fn node_position(&self, node: NodeId) -> Coord<GRID_DIMENSION> {
        linear_to_coord(node, &self.node_grid)
    }

    pub fn try_node_of(&self, coord: &Coord<GRID_DIMENSION>) -> Result<NodeId> {
        self.check_coord(coord)?;
        let position = coord.component_div(&self.block_extent);
        Ok(coord_to_linear(&position, &self.node_grid))
    }

    /// Owner of a coordinate.
    /// Panics on coordinates outside the lattice, see `try_node_of`.
    #[track_caller]
    pub fn node_of(&self, coord: &Coord<GRID_DIMENSION>) -> NodeId {
        match self.try_node_of(coord) {
            Ok(node) => node,
            Err(e) => panic!("ERROR: {}", e),
        }
    }

    pub fn try_local_index_of(
        &self,
        coord: &Coord<GRID_DIMENSION>,
    ) -> Result<usize> {
        self.check_coord(coord)?;
        let offset = coord.zip_map(&self.block_extent, |c, b| c.rem_euclid(b));
        Ok(coord_to_linear(&offset, &self.block_extent))
    }

    /// Index of a coordinate within its owner's local storage.
    /// Panics on coordinates outside the lattice, see `try_local_index_of`.
    #[track_caller]
    pub fn local_index_of(&self, coord: &Coord<GRID_DIMENSION>) -> usize {
        match self.try_local_index_of(coord) {
            Ok(index) => index,
            Err(e) => panic!("ERROR: {}", e),
        }
    }

    /// The block owned by `node`.
    pub fn try_node_block(&self, node: NodeId) -> Result<Block<GRID_DIMENSION>> {
        self.check_node(node)?;
        let origin = self.node_position(node).component_mul(&self.block_extent);
        Ok(Block::from_origin_extent(origin, self.block_extent))
    }

    #[track_caller]
    pub fn node_block(&self, node: NodeId) -> Block<GRID_DIMENSION> {
        match self.try_node_block(node) {
            Ok(block) => block,
            Err(e) => panic!("ERROR: {}", e),
        }
    }

    /// Inverse of `node_of` and `local_index_of`.
    pub fn coord_of(&self, node: NodeId, local_index: usize) -> Coord<GRID_DIMENSION> {
        debug_assert!(local_index < self.sites_on_node(node));
        self.node_block(node).linear_to_coord(local_index)
    }

    /// Where `coord + displacement` lands on the torus.
    pub fn neighbor(
        &self,
        coord: &Coord<GRID_DIMENSION>,
        displacement: &Coord<GRID_DIMENSION>,
    ) -> Coord<GRID_DIMENSION> {
        periodic_wrap(&(coord + displacement), &self.extents)
    }

    /// Sign picked up by a value fetched from `coord + displacement`.
    /// Each antiperiodic dimension contributes a factor of -1 for every
    /// time the displacement crosses that dimension's lattice edge.
    pub fn boundary_phase(
        &self,
        coord: &Coord<GRID_DIMENSION>,
        displacement: &Coord<GRID_DIMENSION>,
    ) -> f64 {
        let mut sign = 1.0;
        for d in 0..GRID_DIMENSION {
            if self.boundaries[d] != Boundary::Antiperiodic {
                continue;
            }
            let crossings = (coord[d] + displacement[d]).div_euclid(self.extents[d]);
            if crossings.rem_euclid(2) == 1 {
                sign = -sign;
            }
        }
        sign
    }
}
