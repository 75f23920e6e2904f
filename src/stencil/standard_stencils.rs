use crate::geometry::*;
use crate::partition::*;
use crate::pipeline::*;
use crate::util::*;

/// Sum over the `2 * GRID_DIMENSION` nearest neighbors of source 0,
/// one term per direction, with boundary phases applied.
pub fn nearest_neighbor_sum<const GRID_DIMENSION: usize>() -> TermTable {
    let terms = Direction::all::<GRID_DIMENSION>()
        .map(|dir| {
            Term::new(vec![TermInput::new(0, dir)], 0, 1.0).with_boundary(dir)
        })
        .collect();
    TermTable::new("nearest_neighbor_sum", terms)
}

/// Symmetric difference of source 0, `(f(x + e_d) - f(x - e_d)) / 2`
/// into output `d`.
pub fn central_gradient<const GRID_DIMENSION: usize>() -> TermTable {
    let terms = Direction::all::<GRID_DIMENSION>()
        .map(|dir| {
            let weight = if dir.is_forward() { 0.5 } else { -0.5 };
            Term::new(vec![TermInput::new(0, dir)], dir.dimension(), weight)
                .with_boundary(dir)
        })
        .collect();
    TermTable::new("central_gradient", terms)
}

/// One two-input term per dimension pair `a < b`:
/// source 0 along `+a+b` and source 1 along `+a-b`,
/// weighted by `(-1)^(a+b)`.
/// Registers the diagonal displacements with the partition.
pub fn diagonal_pairs<const GRID_DIMENSION: usize, S>(
    partition: &mut Partition<GRID_DIMENSION, S>,
) -> TermTable {
    assert!(GRID_DIMENSION >= 2, "diagonal pairs need two dimensions");
    let mut terms = Vec::new();
    for a in 0..GRID_DIMENSION {
        for b in a + 1..GRID_DIMENSION {
            let e_a = Direction::Forward(a).displacement::<GRID_DIMENSION>();
            let e_b = Direction::Forward(b).displacement::<GRID_DIMENSION>();
            let plus = partition.register_offset(e_a + e_b);
            let minus = partition.register_offset(e_a - e_b);
            let weight = if (a + b) % 2 == 0 { 1.0 } else { -1.0 };
            terms.push(
                Term::new(
                    vec![TermInput::new(0, plus), TermInput::new(1, minus)],
                    0,
                    weight,
                )
                .with_boundary(plus),
            );
        }
    }
    TermTable::new("diagonal_pairs", terms)
}

/// Displacement of a term input, for checks and reports.
pub fn input_displacement<const GRID_DIMENSION: usize, S>(
    partition: &Partition<GRID_DIMENSION, S>,
    input: &TermInput,
) -> Coord<GRID_DIMENSION> {
    partition.offset(input.offset).displacement()
}
