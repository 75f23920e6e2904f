use crate::geometry::Parity;
use crate::util::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// One lattice point owned by this node.
/// Placement is fixed once the partition is built,
/// only `data` and the generator state change afterwards.
#[derive(Clone, Debug)]
pub struct Site<const GRID_DIMENSION: usize, S = ()> {
    coord: Coord<GRID_DIMENSION>,
    local_index: usize,
    global_index: usize,
    parity: Parity,
    prn: Option<StdRng>,
    pub data: S,
}

/// Per-site generator seed, depends only on the run seed and the site's
/// global index so streams do not change with the node count.
pub fn site_seed(seed: u64, global_index: usize) -> u64 {
    // splitmix64 finalizer
    let mut z = seed ^ (global_index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl<const GRID_DIMENSION: usize, S> Site<GRID_DIMENSION, S> {
    pub(crate) fn new(
        coord: Coord<GRID_DIMENSION>,
        local_index: usize,
        global_index: usize,
        seed: Option<u64>,
        data: S,
    ) -> Self {
        Site {
            coord,
            local_index,
            global_index,
            parity: Parity::of(&coord),
            prn: seed.map(|s| StdRng::seed_from_u64(site_seed(s, global_index))),
            data,
        }
    }

    pub fn coord(&self) -> Coord<GRID_DIMENSION> {
        self.coord
    }

    pub fn local_index(&self) -> usize {
        self.local_index
    }

    pub fn global_index(&self) -> usize {
        self.global_index
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    /// `None` unless the lattice was built with a seed.
    pub fn prn(&self) -> Option<&StdRng> {
        self.prn.as_ref()
    }
}

/// Mutable access to one site of a built partition.
/// Only the site's data and generator can change through it,
/// the record itself stays where the layout put it.
pub struct SiteMut<'a, const GRID_DIMENSION: usize, S = ()> {
    site: &'a mut Site<GRID_DIMENSION, S>,
}

impl<'a, const GRID_DIMENSION: usize, S> SiteMut<'a, GRID_DIMENSION, S> {
    pub(crate) fn new(site: &'a mut Site<GRID_DIMENSION, S>) -> Self {
        SiteMut { site }
    }

    pub fn data_mut(&mut self) -> &mut S {
        &mut self.site.data
    }

    pub fn prn_mut(&mut self) -> Option<&mut StdRng> {
        self.site.prn.as_mut()
    }
}

impl<const GRID_DIMENSION: usize, S> std::ops::Deref for SiteMut<'_, GRID_DIMENSION, S> {
    type Target = Site<GRID_DIMENSION, S>;

    fn deref(&self) -> &Self::Target {
        self.site
    }
}
