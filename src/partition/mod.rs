mod neighbor_table;
mod site;

pub use neighbor_table::*;
pub use site::*;

use crate::geometry::*;
use crate::params::LatticeParameters;
use crate::util::*;

/// All sites owned by one node, plus the neighbor tables used to gather.
///
/// Placement (coordinates, parity, indices) is fixed at construction.
/// Extra displacements may be registered while the partition is still
/// exclusively borrowed, i.e. before any gather engine is built on it.
pub struct Partition<const GRID_DIMENSION: usize, S = ()> {
    geometry: Geometry<GRID_DIMENSION>,
    this_node: NodeId,
    block: Block<GRID_DIMENSION>,
    sites: Vec<Site<GRID_DIMENSION, S>>,
    offsets: Vec<NeighborTable<GRID_DIMENSION>>,
    chunk_size: usize,
}

impl<const GRID_DIMENSION: usize, S: Default> Partition<GRID_DIMENSION, S> {
    pub fn build(
        geometry: Geometry<GRID_DIMENSION>,
        this_node: NodeId,
        params: &LatticeParameters<GRID_DIMENSION>,
    ) -> Self {
        Self::build_with(geometry, this_node, params, |_| S::default())
    }
}

impl<const GRID_DIMENSION: usize, S> Partition<GRID_DIMENSION, S> {
    /// Lay out this node's sites, `init` provides each site's record.
    pub fn build_with<F: FnMut(&Coord<GRID_DIMENSION>) -> S>(
        geometry: Geometry<GRID_DIMENSION>,
        this_node: NodeId,
        params: &LatticeParameters<GRID_DIMENSION>,
        mut init: F,
    ) -> Self {
        profiling::scope!("Partition::build");
        if this_node >= geometry.number_of_nodes() {
            panic!(
                "ERROR: node{} is not part of a {} node lattice",
                this_node,
                geometry.number_of_nodes()
            );
        }
        let sites_on_node = geometry.sites_on_node(this_node);
        let mut sites: Vec<Site<GRID_DIMENSION, S>> =
            allocate_or_die(sites_on_node, "lattice", this_node);

        for global_index in 0..geometry.volume() {
            let coord = geometry.global_coord(global_index);
            if geometry.node_of(&coord) != this_node {
                continue;
            }
            let local_index = sites.len();
            assert_eq!(
                local_index,
                geometry.local_index_of(&coord),
                "node{}: site order disagrees with layout at {:?}",
                this_node,
                coord
            );
            sites.push(Site::new(
                coord,
                local_index,
                global_index,
                params.seed,
                init(&coord),
            ));
        }
        assert_eq!(sites.len(), sites_on_node);

        let block = geometry.node_block(this_node);
        let mut result = Partition {
            geometry,
            this_node,
            block,
            sites,
            offsets: Vec::with_capacity(2 * GRID_DIMENSION),
            chunk_size: params.chunk_size,
        };
        for direction in Direction::all::<GRID_DIMENSION>() {
            result.push_table(direction.displacement());
        }

        tracing::info!(
            node = this_node,
            sites = sites_on_node,
            bytes = result.size_in_bytes(),
            "built partition, {}",
            human_readable_bytes(result.size_in_bytes())
        );
        result
    }

    fn push_table(&mut self, displacement: Coord<GRID_DIMENSION>) -> usize {
        let coords: Vec<Coord<GRID_DIMENSION>> =
            self.sites.iter().map(|s| s.coord()).collect();
        let table = NeighborTable::build(
            &self.geometry,
            self.this_node,
            &coords,
            displacement,
        );
        self.offsets.push(table);
        self.offsets.len() - 1
    }

    /// Id of the table at `position`, direction tables come first.
    fn offset_id(position: usize) -> OffsetId {
        if position < 2 * GRID_DIMENSION {
            OffsetId::Direction(Direction::from_index(position))
        } else {
            OffsetId::Registered(position - 2 * GRID_DIMENSION)
        }
    }

    /// Position of `offset` in the table list, `None` for a direction
    /// outside the lattice or an unregistered displacement.
    fn offset_position(&self, offset: OffsetId) -> Option<usize> {
        let position = match offset {
            OffsetId::Direction(direction) if direction.dimension() < GRID_DIMENSION => {
                direction.index()
            }
            OffsetId::Direction(_) => return None,
            OffsetId::Registered(k) => 2 * GRID_DIMENSION + k,
        };
        (position < self.offsets.len()).then_some(position)
    }

    /// Neighbor table for an arbitrary displacement.
    /// Registering a displacement twice returns the existing id.
    /// Every node must register the same displacements in the same order.
    pub fn register_offset(
        &mut self,
        displacement: Coord<GRID_DIMENSION>,
    ) -> OffsetId {
        if let Some(i) = self
            .offsets
            .iter()
            .position(|t| t.displacement() == displacement)
        {
            return Self::offset_id(i);
        }
        let result = Self::offset_id(self.push_table(displacement));
        tracing::debug!(
            node = self.this_node,
            offset = %result,
            "registered displacement {:?}",
            displacement.as_slice()
        );
        result
    }

    pub fn geometry(&self) -> &Geometry<GRID_DIMENSION> {
        &self.geometry
    }

    pub fn this_node(&self) -> NodeId {
        self.this_node
    }

    pub fn block(&self) -> &Block<GRID_DIMENSION> {
        &self.block
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn sites_on_node(&self) -> usize {
        self.sites.len()
    }

    pub fn sites(&self) -> &[Site<GRID_DIMENSION, S>] {
        &self.sites
    }

    /// Per-site data and generators, in local index order.
    /// Placement cannot change through these views.
    pub fn sites_mut(
        &mut self,
    ) -> impl Iterator<Item = SiteMut<'_, GRID_DIMENSION, S>> + '_ {
        self.sites.iter_mut().map(SiteMut::new)
    }

    pub fn site(&self, local_index: usize) -> &Site<GRID_DIMENSION, S> {
        &self.sites[local_index]
    }

    pub fn sites_with_parity(
        &self,
        filter: ParityFilter,
    ) -> impl Iterator<Item = &Site<GRID_DIMENSION, S>> + '_ {
        self.sites.iter().filter(move |s| filter.contains(s.parity()))
    }

    pub fn number_of_offsets(&self) -> usize {
        self.offsets.len()
    }

    pub fn try_offset(&self, offset: OffsetId) -> Option<&NeighborTable<GRID_DIMENSION>> {
        self.offset_position(offset).map(|i| &self.offsets[i])
    }

    /// Unknown offsets are fatal.
    #[track_caller]
    pub fn offset(&self, offset: OffsetId) -> &NeighborTable<GRID_DIMENSION> {
        match self.try_offset(offset) {
            Some(table) => table,
            None => panic!(
                "ERROR: node{}: unrecognized offset {} on a {}-dimensional lattice with {} registered displacements",
                self.this_node,
                offset,
                GRID_DIMENSION,
                self.offsets.len() - 2 * GRID_DIMENSION
            ),
        }
    }

    /// Sign applied to a value gathered along `offset` into `local_index`.
    pub fn boundary_phase(&self, local_index: usize, offset: OffsetId) -> f64 {
        self.offset(offset).phase(local_index)
    }

    pub fn size_in_bytes(&self) -> usize {
        self.sites.capacity() * std::mem::size_of::<Site<GRID_DIMENSION, S>>()
            + self
                .offsets
                .iter()
                .map(|t| t.size_in_bytes())
                .sum::<usize>()
    }

    pub fn print_report(&self) {
        if self.this_node != 0 {
            return;
        }
        let even = self.sites_with_parity(ParityFilter::Even).count();
        println!("Partition Report:");
        println!("  extents: {:?}", self.geometry.extents().as_slice());
        println!("  nodes: {}", self.geometry.number_of_nodes());
        println!("  node grid: {:?}", self.geometry.node_grid().as_slice());
        println!("  block: {}", self.block);
        println!("  sites on node: {} ({} even)", self.sites.len(), even);
        println!("  offsets: {}", self.offsets.len());
        println!("  memory: {}", human_readable_bytes(self.size_in_bytes()));
    }

    /// Release site storage and neighbor tables.
    pub fn teardown(self) {
        tracing::debug!(node = self.this_node, "partition torn down");
    }
}
