use crate::util::*;

/// Number of sites in a box with these exclusive extents.
pub fn volume<const GRID_DIMENSION: usize>(
    extents: &Coord<GRID_DIMENSION>,
) -> usize {
    let mut accumulator = 1;
    for d in extents {
        accumulator *= *d as usize;
    }
    accumulator
}

/// Row-major linear index, highest dimension goes the fastest.
pub fn coord_to_linear<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
    extents: &Coord<GRID_DIMENSION>,
) -> usize {
    let mut accumulator = 0;
    for d in 0..GRID_DIMENSION {
        debug_assert!(coord[d] >= 0 && coord[d] < extents[d]);
        accumulator = accumulator * extents[d] as usize + coord[d] as usize;
    }
    accumulator
}

pub fn linear_to_coord<const GRID_DIMENSION: usize>(
    linear_index: usize,
    extents: &Coord<GRID_DIMENSION>,
) -> Coord<GRID_DIMENSION> {
    let mut result = Coord::zero();
    let mut index_accumulator = linear_index;
    for d in (0..GRID_DIMENSION).rev() {
        let extent = extents[d] as usize;
        result[d] = (index_accumulator % extent) as i32;
        index_accumulator /= extent;
    }
    debug_assert_eq!(index_accumulator, 0);
    result
}

/// Reduce every component modulo the extents, the torus wraparound.
/// Works for any distance, not just one box away.
pub fn periodic_wrap<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
    extents: &Coord<GRID_DIMENSION>,
) -> Coord<GRID_DIMENSION> {
    let mut result = *coord;
    for d in 0..GRID_DIMENSION {
        result[d] = coord[d].rem_euclid(extents[d]);
    }
    result
}

/// Whether `coord` lies in `[0, extent_d)` in every dimension.
pub fn in_extents<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
    extents: &Coord<GRID_DIMENSION>,
) -> bool {
    (0..GRID_DIMENSION).all(|d| coord[d] >= 0 && coord[d] < extents[d])
}

/// Even / odd from the coordinate sum.
pub fn coord_sum_is_even<const GRID_DIMENSION: usize>(
    coord: &Coord<GRID_DIMENSION>,
) -> bool {
    coord.iter().sum::<i32>().rem_euclid(2) == 0
}
