use thiserror::Error;

/// Configuration errors, detected before any lattice storage exists.
/// Faults after setup (allocation failure, unknown offsets, slot misuse,
/// lost peers) are not represented here: they abort the node with a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LatticeError {
    #[error("extent {extent} in dimension {dimension} must be positive")]
    InvalidExtent { dimension: usize, extent: i32 },

    #[error("a lattice needs at least one node")]
    NoNodes,

    #[error("cannot lay out {nodes} nodes on a lattice with extents {extents:?}")]
    IndivisibleLayout { nodes: usize, extents: Vec<i32> },

    #[error("coordinate {coord:?} is outside the lattice extents {extents:?}")]
    CoordinateOutOfRange { coord: Vec<i32>, extents: Vec<i32> },

    #[error("node {node} does not exist, there are {nodes} nodes")]
    NodeOutOfRange { node: usize, nodes: usize },

    #[error("the scratch slot pool needs at least {required} slots, got {slots}")]
    TooFewSlots { slots: usize, required: usize },

    #[error("chunk size must be positive")]
    ZeroChunkSize,
}

pub type Result<T> = std::result::Result<T, LatticeError>;
