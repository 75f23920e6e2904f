use crate::util::indexing::coord_sum_is_even;
use crate::util::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

impl Parity {
    pub fn of<const GRID_DIMENSION: usize>(coord: &Coord<GRID_DIMENSION>) -> Self {
        if coord_sum_is_even(coord) {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    pub fn flip(self) -> Self {
        match self {
            Parity::Even => Parity::Odd,
            Parity::Odd => Parity::Even,
        }
    }
}

/// Restricts which local sites an operation touches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParityFilter {
    Even,
    Odd,
    EvenAndOdd,
}

impl ParityFilter {
    #[inline]
    pub fn contains(self, parity: Parity) -> bool {
        match self {
            ParityFilter::Even => parity == Parity::Even,
            ParityFilter::Odd => parity == Parity::Odd,
            ParityFilter::EvenAndOdd => true,
        }
    }
}

impl From<Parity> for ParityFilter {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::Even => ParityFilter::Even,
            Parity::Odd => ParityFilter::Odd,
        }
    }
}
