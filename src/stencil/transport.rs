use crate::checks;
use crate::comm::Communicator;
use crate::field::*;
use crate::gather::*;
use crate::geometry::*;
use crate::util::*;
use bytemuck::Pod;

/// Carry `field` along `path`, one gather per step.
/// The result at `x` is the field at `x + sum(path)`.
pub fn shift_along_path<'p, const GRID_DIMENSION: usize, S, C, T>(
    engine: &mut GatherEngine<'p, GRID_DIMENSION, S, C>,
    field: &Field<T>,
    path: &[Direction],
) -> Field<T>
where
    S: Sync,
    C: Communicator,
    T: Pod + Send + Sync,
{
    profiling::scope!("shift_along_path");
    let total = path_displacement::<GRID_DIMENSION>(path);
    let mut current = field.clone();
    for dir in path {
        current = engine.gather_blocking(&current, *dir, ParityFilter::EvenAndOdd);
    }

    if total == Coord::<GRID_DIMENSION>::zero() {
        let mismatches = field
            .as_slice()
            .iter()
            .zip(current.as_slice())
            .filter(|(a, b)| bytemuck::bytes_of(*a) != bytemuck::bytes_of(*b))
            .count();
        checks::check_residual("closed path transport", mismatches as f64, 0.0);
    }
    current
}

/// Net displacement of a path.
/// Directions outside the lattice dimension are fatal.
pub fn path_displacement<const GRID_DIMENSION: usize>(
    path: &[Direction],
) -> Coord<GRID_DIMENSION> {
    path.iter()
        .fold(Coord::<GRID_DIMENSION>::zero(), |acc, dir| acc + dir.displacement::<GRID_DIMENSION>())
}
