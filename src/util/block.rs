use crate::util::indexing::*;
use crate::util::*;

/// Axis aligned block of lattice coordinates owned by one node.
/// Each instance is inclusive of both corners.
/// Node-local indexing is row-major within the block,
/// so the block is responsible for mapping between
/// local site indices and coordinates.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct Block<const GRID_DIMENSION: usize> {
    pub bounds: Bounds<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> std::fmt::Display for Block<GRID_DIMENSION> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> Result<(), std::fmt::Error> {
        write!(f, "[")?;
        for d in 0..GRID_DIMENSION {
            if d > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}..={}", self.bounds[(d, 0)], self.bounds[(d, 1)])?;
        }
        write!(f, "]")
    }
}

impl<const GRID_DIMENSION: usize> Block<GRID_DIMENSION> {
    #[inline]
    pub fn new(bounds: Bounds<GRID_DIMENSION>) -> Self {
        let result = Block { bounds };
        debug_assert!(result.check_validity());
        result
    }

    /// Block starting at `origin` spanning `extent` sites per dimension.
    pub fn from_origin_extent(
        origin: Coord<GRID_DIMENSION>,
        extent: Coord<GRID_DIMENSION>,
    ) -> Self {
        let max = origin + extent.add_scalar(-1);
        Block::new(Bounds::from_columns(&[origin, max]))
    }

    /// Sites per dimension, i.e. [0, 9] has an extent of 10.
    pub fn extent(&self) -> Coord<GRID_DIMENSION> {
        (self.bounds.column(1) - self.bounds.column(0)).add_scalar(1)
    }

    /// Number of coordinates contained in the block.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        volume(&self.extent())
    }

    pub fn min(&self) -> Coord<GRID_DIMENSION> {
        self.bounds.column(0).into()
    }

    pub fn max(&self) -> Coord<GRID_DIMENSION> {
        self.bounds.column(1).into()
    }

    /// Local (row-major) index of a coordinate inside the block.
    pub fn coord_to_linear(&self, coord: &Coord<GRID_DIMENSION>) -> usize {
        debug_assert!(self.contains(coord), "{} does not contain {:?}", self, coord);
        coord_to_linear(&(coord - self.min()), &self.extent())
    }

    /// Coordinate of a local index.
    pub fn linear_to_coord(&self, index: usize) -> Coord<GRID_DIMENSION> {
        debug_assert!(index < self.buffer_size());
        linear_to_coord(index, &self.extent()) + self.min()
    }

    pub fn contains(&self, coord: &Coord<GRID_DIMENSION>) -> bool {
        (0..GRID_DIMENSION).all(|d| {
            coord[d] >= self.bounds[(d, 0)] && coord[d] <= self.bounds[(d, 1)]
        })
    }

    /// Check that max >= min
    pub fn check_validity(&self) -> bool {
        (0..GRID_DIMENSION).all(|d| self.bounds[(d, 0)] <= self.bounds[(d, 1)])
    }

    /// Contained coords in local index order.
    pub fn coord_iter(
        &self,
    ) -> impl Iterator<Item = Coord<GRID_DIMENSION>> + '_ {
        (0..self.buffer_size()).map(|i| self.linear_to_coord(i))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn extent_test() {
        let b = Block::new(matrix![0, 5; 2, 9]);
        assert_eq!(b.extent(), vector![6, 8]);
        assert_eq!(b.buffer_size(), 48);

        let c = Block::from_origin_extent(vector![4, 0, 2], vector![2, 3, 4]);
        assert_eq!(c.bounds, matrix![4, 5; 0, 2; 2, 5]);
        assert_eq!(c.buffer_size(), 24);
    }

    #[test]
    fn linear_round_trip_test() {
        let b = Block::new(matrix![2, 5; 4, 7; 0, 1]);
        for (i, c) in b.coord_iter().enumerate() {
            assert!(b.contains(&c));
            assert_eq!(b.coord_to_linear(&c), i);
        }
        assert_eq!(b.linear_to_coord(0), vector![2, 4, 0]);
        assert_eq!(b.linear_to_coord(1), vector![2, 4, 1]);
        assert_eq!(b.linear_to_coord(2), vector![2, 5, 0]);
    }

    #[test]
    fn contains_test() {
        let b = Block::new(matrix![2, 5; 4, 7]);
        assert!(b.contains(&vector![2, 4]));
        assert!(b.contains(&vector![5, 7]));
        assert!(!b.contains(&vector![1, 4]));
        assert!(!b.contains(&vector![5, 8]));
    }

    #[test]
    fn display_test() {
        let b = Block::new(matrix![0, 3; 4, 7]);
        assert_eq!(format!("{}", b), "[0..=3, 4..=7]");
    }

    #[test]
    fn check_validity_test() {
        assert!(Block { bounds: matrix![0, 9] }.check_validity());
        assert!(Block { bounds: matrix![0, 0] }.check_validity());
        assert!(!Block { bounds: matrix![9, 0] }.check_validity());
    }
}
