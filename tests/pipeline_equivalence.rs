use lattice_gather::comm::*;
use lattice_gather::field::*;
use lattice_gather::gather::*;
use lattice_gather::geometry::*;
use lattice_gather::params::*;
use lattice_gather::partition::*;
use lattice_gather::pipeline::*;
use lattice_gather::stencil::*;
use lattice_gather::util::*;

use float_cmp::assert_approx_eq;
use nalgebra::{SMatrix, SVector};

/// Two terms, forward and backward hop in the last dimension.
fn two_term_table() -> TermTable {
    TermTable::new(
        "hop",
        vec![
            Term::new(vec![TermInput::new(0, Direction::Forward(3))], 0, 1.0)
                .with_boundary(Direction::Forward(3)),
            Term::new(vec![TermInput::new(0, Direction::Backward(3))], 0, -1.0)
                .with_boundary(Direction::Backward(3)),
        ],
    )
}

/// Five two-input terms over three sources and two outputs,
/// one of them along a registered diagonal.
fn five_term_table(partition: &mut Partition<4>) -> TermTable {
    let diagonal = partition.register_offset(vector![1, 0, 0, -1]);
    let input = |source, offset: OffsetId| TermInput { source, offset };
    TermTable::new(
        "five",
        vec![
            Term::new(
                vec![input(0, Direction::Forward(0).into()), input(1, Direction::Forward(1).into())],
                0,
                1.0,
            ),
            Term::new(
                vec![input(2, Direction::Backward(1).into()), input(0, Direction::Forward(3).into())],
                1,
                -1.0,
            )
            .with_boundary(Direction::Forward(3)),
            Term::new(vec![input(1, diagonal), input(2, diagonal)], 0, 0.25)
                .with_boundary(diagonal),
            Term::new(
                vec![input(0, Direction::Backward(3).into()), input(0, Direction::Backward(2).into())],
                1,
                2.0,
            )
            .with_boundary(Direction::Backward(3)),
            Term::new(
                vec![input(2, Direction::Forward(2).into()), input(1, Direction::Backward(0).into())],
                0,
                -0.5,
            ),
        ],
    )
}

fn kernel(term: &Term, site: &Site<4>, values: &TermValues<'_>) -> f64 {
    let scale = 1.0 + (site.global_index() % 7) as f64 / 7.0;
    let mixed: f64 = values
        .all::<f64>()
        .enumerate()
        .map(|(i, v)| v * (i + 1) as f64)
        .sum();
    scale * mixed + term.output as f64
}

fn sources(p: &Partition<4>) -> Vec<Field<f64>> {
    (0..3)
        .map(|k| {
            Field::from_fn(p, |s| {
                ((s.global_index() * (k + 3)) as f64 * 0.37).sin() + k as f64
            })
        })
        .collect()
}

/// Per global index, the bits of every output, for one node count and mode.
fn evaluate(
    nodes: usize,
    mode: PipelineMode,
    five_terms: bool,
    parity: ParityFilter,
    boundaries: [Boundary; 4],
) -> Vec<Vec<u64>> {
    let params = LatticeParameters::new(vector![4, 4, 4, 8], nodes)
        .with_boundaries(boundaries)
        .with_chunk_size(37);
    let geometry = Geometry::new(&params).unwrap();
    let per_node = launch(nodes, |comm| {
        let mut p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
        let table = if five_terms {
            five_term_table(&mut p)
        } else {
            two_term_table()
        };
        let fields = sources(&p);
        let refs: Vec<&dyn TermSource<4, (), ThreadComm>> = fields
            .iter()
            .map(|f| f as &dyn TermSource<4, (), ThreadComm>)
            .collect();
        let mut out = vec![Field::new(&p); table.outputs()];
        let mut engine = GatherEngine::new(&p, comm, DEFAULT_SLOTS).unwrap();
        StencilPipeline::new(mode).run(&mut engine, &table, &refs, kernel, &mut out, parity);
        assert_eq!(engine.slots_in_use(), 0);
        p.sites()
            .iter()
            .map(|s| {
                let bits: Vec<u64> = out.iter().map(|f| f[s.local_index()].to_bits()).collect();
                (s.global_index(), bits)
            })
            .collect::<Vec<_>>()
    });
    let mut result = vec![Vec::new(); geometry.volume()];
    for (g, bits) in per_node.into_iter().flatten() {
        result[g] = bits;
    }
    result
}

#[test]
fn two_terms_pipelined_equals_sequential() {
    let periodic = [Boundary::Periodic; 4];
    for nodes in [2, 4] {
        for parity in [ParityFilter::EvenAndOdd, ParityFilter::Even, ParityFilter::Odd] {
            assert_eq!(
                evaluate(nodes, PipelineMode::Pipelined, false, parity, periodic),
                evaluate(nodes, PipelineMode::Sequential, false, parity, periodic),
            );
        }
    }
}

#[test]
fn five_terms_pipelined_equals_sequential() {
    let boundaries = [
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Antiperiodic,
    ];
    for nodes in [2, 8] {
        assert_eq!(
            evaluate(nodes, PipelineMode::Pipelined, true, ParityFilter::EvenAndOdd, boundaries),
            evaluate(nodes, PipelineMode::Sequential, true, ParityFilter::EvenAndOdd, boundaries),
        );
    }
}

#[test]
fn node_count_does_not_change_results() {
    let boundaries = [
        Boundary::Periodic,
        Boundary::Antiperiodic,
        Boundary::Periodic,
        Boundary::Antiperiodic,
    ];
    let single = evaluate(1, PipelineMode::Pipelined, true, ParityFilter::Odd, boundaries);
    assert_eq!(single, evaluate(2, PipelineMode::Pipelined, true, ParityFilter::Odd, boundaries));
    assert_eq!(single, evaluate(4, PipelineMode::Sequential, true, ParityFilter::Odd, boundaries));
}

#[test]
fn antiperiodic_hop_flips_sign_at_the_edge() {
    let params = LatticeParameters::new(vector![2, 2, 2, 4], 2).with_boundaries([
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Antiperiodic,
    ]);
    let geometry = Geometry::new(&params).unwrap();
    let results = launch(2, |comm| {
        let p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
        let ones = Field::from_fn(&p, |_| 1.0);
        let mut out = vec![Field::new(&p)];
        let mut engine = GatherEngine::new(&p, comm, 2).unwrap();
        let table = TermTable::new(
            "forward",
            vec![Term::new(vec![TermInput::new(0, Direction::Forward(3))], 0, 1.0)
                .with_boundary(Direction::Forward(3))],
        );
        StencilPipeline::default().run(
            &mut engine,
            &table,
            &[&ones],
            |_, _, v| v.get::<f64>(0),
            &mut out,
            ParityFilter::EvenAndOdd,
        );
        p.sites()
            .iter()
            .map(|s| (s.coord()[3], out[0][s.local_index()]))
            .collect::<Vec<_>>()
    });
    for (t, v) in results.into_iter().flatten() {
        let expected = if t == 3 { -1.0 } else { 1.0 };
        assert_approx_eq!(f64, v, expected);
    }
}

#[test]
fn operator_from_capabilities_is_mode_independent() {
    let params = LatticeParameters::new(vector![4, 4, 4, 4], 4);
    let geometry = Geometry::new(&params).unwrap();
    let results = launch(4, |comm| {
        let mut p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
        let op = StencilOperator::from_capabilities(
            &mut p,
            &[Capability::Gradient, Capability::DiagonalPairs, Capability::NeighborSum],
        );
        let fields = sources(&p);
        let mut engine = GatherEngine::new(&p, comm, DEFAULT_SLOTS).unwrap();
        let mut a = vec![Field::new(&p); op.outputs()];
        let mut b = vec![Field::new(&p); op.outputs()];
        let sources: [&dyn TermSource<4, (), ThreadComm>; 2] = [&fields[0], &fields[1]];
        op.apply(&StencilPipeline::new(PipelineMode::Pipelined), &mut engine, &sources, kernel, &mut a, ParityFilter::EvenAndOdd);
        op.apply(&StencilPipeline::new(PipelineMode::Sequential), &mut engine, &sources, kernel, &mut b, ParityFilter::EvenAndOdd);
        a == b && op.outputs() == 4
    });
    assert!(results.into_iter().all(|ok| ok));
}

/// Site record carrying one 3x3 matrix per forward direction.
#[derive(Copy, Clone)]
struct Links {
    forward: [SMatrix<f64, 3, 3>; 4],
}

fn link_matrix(global_index: usize, direction: usize) -> SMatrix<f64, 3, 3> {
    SMatrix::from_fn(|r, c| ((global_index * 7 + direction * 3 + r * 2 + c) % 5) as f64 - 2.0)
}

#[test]
fn matrix_member_times_vector_field() {
    let params = LatticeParameters::new(vector![2, 2, 4, 4], 2).with_boundaries([
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Periodic,
        Boundary::Antiperiodic,
    ]);
    let geometry = Geometry::new(&params).unwrap();
    let per_node = launch(2, |comm| {
        let p: Partition<4, Links> = Partition::build_with(
            geometry.clone(),
            comm.this_node(),
            &params,
            |c| {
                let g = geometry.global_index(c);
                Links {
                    forward: [0, 1, 2, 3].map(|d| link_matrix(g, d)),
                }
            },
        );
        let link_t = Member::new("link_t", |l: &Links| &l.forward[3]);
        let psi: Field<SVector<f64, 3>> = Field::from_fn(&p, |s| {
            let g = s.global_index() as f64;
            SVector::<f64, 3>::new(1.0, g, -g)
        });
        // hop forward and backward in time, each term reads a matrix and a vector
        let table = TermTable::new(
            "hop_t",
            vec![
                Term::new(
                    vec![
                        TermInput::new(0, Direction::Forward(3)),
                        TermInput::new(1, Direction::Forward(3)),
                    ],
                    0,
                    1.0,
                )
                .with_boundary(Direction::Forward(3)),
                Term::new(
                    vec![
                        TermInput::new(0, Direction::Backward(3)),
                        TermInput::new(1, Direction::Backward(3)),
                    ],
                    0,
                    -1.0,
                )
                .with_boundary(Direction::Backward(3)),
            ],
        );
        let sources: [&dyn TermSource<4, Links, ThreadComm>; 2] = [&link_t, &psi];
        let mut engine = GatherEngine::new(&p, comm, 4).unwrap();
        let mut results = Vec::new();
        for mode in [PipelineMode::Pipelined, PipelineMode::Sequential] {
            let mut out: Vec<Field<SVector<f64, 3>>> = vec![Field::new(&p)];
            StencilPipeline::new(mode).run(
                &mut engine,
                &table,
                &sources,
                |_, _, v| v.get::<SMatrix<f64, 3, 3>>(0) * v.get::<SVector<f64, 3>>(1),
                &mut out,
                ParityFilter::EvenAndOdd,
            );
            results.push(out.remove(0));
        }
        assert_eq!(results[0], results[1]);
        p.sites()
            .iter()
            .map(|s| (s.coord(), results[0][s.local_index()]))
            .collect::<Vec<_>>()
    });

    let psi_at = |c: &Coord<4>| {
        let g = geometry.global_index(c) as f64;
        SVector::<f64, 3>::new(1.0, g, -g)
    };
    for (x, value) in per_node.into_iter().flatten() {
        let up = geometry.neighbor(&x, &vector![0, 0, 0, 1]);
        let down = geometry.neighbor(&x, &vector![0, 0, 0, -1]);
        let up_sign = if x[3] == 3 { -1.0 } else { 1.0 };
        let down_sign = if x[3] == 0 { -1.0 } else { 1.0 };
        let expected = link_matrix(geometry.global_index(&up), 3) * psi_at(&up) * up_sign
            - link_matrix(geometry.global_index(&down), 3) * psi_at(&down) * down_sign;
        for i in 0..3 {
            assert_approx_eq!(f64, value[i], expected[i], epsilon = 1e-9);
        }
    }
}

#[test]
fn pipelined_mode_keeps_two_terms_in_flight() {
    let params = LatticeParameters::new(vector![4, 4, 4, 4], 2);
    let geometry = Geometry::new(&params).unwrap();
    let summaries = launch(2, |comm| {
        let mut p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
        let table = five_term_table(&mut p);
        let fields = sources(&p);
        let refs: Vec<&dyn TermSource<4, (), ThreadComm>> = fields
            .iter()
            .map(|f| f as &dyn TermSource<4, (), ThreadComm>)
            .collect();
        let mut engine = GatherEngine::new(&p, comm, DEFAULT_SLOTS).unwrap();
        let mut out = vec![Field::new(&p); table.outputs()];
        [PipelineMode::Pipelined, PipelineMode::Sequential].map(|mode| {
            StencilPipeline::new(mode)
                .run(&mut engine, &table, &refs, kernel, &mut out, ParityFilter::EvenAndOdd)
                .slots_in_use
        })
    });
    for [pipelined, sequential] in summaries {
        assert_eq!(pipelined, vec![4, 4, 4, 4, 2]);
        assert_eq!(sequential, vec![2; 5]);
    }
}
