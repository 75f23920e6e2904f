pub use nalgebra::{matrix, vector};
pub use num_traits::{One, Zero};

mod block;
pub mod indexing;
pub use block::*;

/// Lattice coordinate, one component per dimension.
pub type Coord<const GRID_DIMENSION: usize> =
    nalgebra::SVector<i32, { GRID_DIMENSION }>;

/// Inclusive `[min, max]` corners, one row per dimension.
pub type Bounds<const GRID_DIMENSION: usize> =
    nalgebra::SMatrix<i32, { GRID_DIMENSION }, 2>;

/// Identifies one compute node, `0..number_of_nodes`.
pub type NodeId = usize;

/// Print `bytes` the way a human would like to read them.
pub fn human_readable_bytes(bytes: usize) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Reserve exactly `len` elements or terminate.
/// Running out of memory while laying out the lattice leaves no
/// sensible way to continue, so there is no recoverable path here.
pub fn allocate_or_die<T>(len: usize, what: &str, node: NodeId) -> Vec<T> {
    let mut result = Vec::new();
    if result.try_reserve_exact(len).is_err() {
        panic!(
            "node{}: no room for {} ({})",
            node,
            what,
            human_readable_bytes(len * std::mem::size_of::<T>())
        );
    }
    result
}
