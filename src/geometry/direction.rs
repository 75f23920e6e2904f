use crate::util::*;

/// One of the `2 * GRID_DIMENSION` nearest neighbor directions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Forward(usize),
    Backward(usize),
}

impl Direction {
    pub fn dimension(self) -> usize {
        match self {
            Direction::Forward(d) | Direction::Backward(d) => d,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward(d) => Direction::Backward(d),
            Direction::Backward(d) => Direction::Forward(d),
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Forward(_))
    }

    /// Forward directions are even indices, backward the following odd one.
    pub fn index(self) -> usize {
        match self {
            Direction::Forward(d) => 2 * d,
            Direction::Backward(d) => 2 * d + 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index % 2 == 0 {
            Direction::Forward(index / 2)
        } else {
            Direction::Backward(index / 2)
        }
    }

    /// Unit displacement, `+e_d` or `-e_d`.
    #[track_caller]
    pub fn displacement<const GRID_DIMENSION: usize>(
        self,
    ) -> Coord<GRID_DIMENSION> {
        let d = self.dimension();
        assert!(
            d < GRID_DIMENSION,
            "ERROR: direction {:?} on a {}-dimensional lattice",
            self,
            GRID_DIMENSION
        );
        let mut result = Coord::<GRID_DIMENSION>::zero();
        result[d] = if self.is_forward() { 1 } else { -1 };
        result
    }

    /// All directions in index order.
    pub fn all<const GRID_DIMENSION: usize>() -> impl Iterator<Item = Direction>
    {
        (0..2 * GRID_DIMENSION).map(Direction::from_index)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        match self {
            Direction::Forward(d) => write!(f, "+{}", d),
            Direction::Backward(d) => write!(f, "-{}", d),
        }
    }
}

/// Names a displacement with a neighbor table in some partition.
/// A direction is only valid on a lattice with more than `dimension()`
/// dimensions, registered displacements are numbered in registration order.
/// The partition resolves ids, anything it does not know is fatal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OffsetId {
    Direction(Direction),
    Registered(usize),
}

impl From<Direction> for OffsetId {
    fn from(direction: Direction) -> Self {
        OffsetId::Direction(direction)
    }
}

impl std::fmt::Display for OffsetId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        match self {
            OffsetId::Direction(d) => write!(f, "{}", d),
            OffsetId::Registered(k) => write!(f, "#{}", k),
        }
    }
}
