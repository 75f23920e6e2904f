use lattice_gather::comm::*;
use lattice_gather::geometry::*;
use lattice_gather::params::*;
use lattice_gather::partition::*;
use lattice_gather::util::*;

use float_cmp::assert_approx_eq;

#[test]
fn counting_sites_gives_the_volume() {
    for nodes in [1, 2, 4, 8] {
        let params = LatticeParameters::new(vector![4, 4, 4, 8], nodes);
        let geometry = Geometry::new(&params).unwrap();
        let totals = launch(nodes, |mut comm| {
            let p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
            global_site_sum(&mut comm, &p, |_| 1.0)
        });
        assert_eq!(totals, vec![geometry.volume() as f64; nodes]);
    }
}

#[test]
fn every_node_sees_the_same_bits() {
    let params = LatticeParameters::new(vector![6, 4, 4, 4], 3);
    let geometry = Geometry::new(&params).unwrap();
    let totals = launch(3, |mut comm| {
        let p: Partition<4> = Partition::build(geometry.clone(), comm.this_node(), &params);
        global_site_sum(&mut comm, &p, |s| (s.global_index() as f64 * 0.1).cos())
    });
    assert!(totals.iter().all(|t| t.to_bits() == totals[0].to_bits()));
    let serial: f64 = (0..geometry.volume())
        .map(|g| (g as f64 * 0.1).cos())
        .sum();
    assert_approx_eq!(f64, totals[0], serial, epsilon = 1e-9);
}

#[test]
fn slice_sums_are_elementwise() {
    let results = launch(4, |mut comm| {
        let me = comm.this_node() as f64;
        let mut v = [1.0, me, me * me, -me];
        comm.sum_f64_slice(&mut v);
        v
    });
    for v in results {
        assert_eq!(v, [4.0, 6.0, 14.0, -6.0]);
    }
}

#[test]
fn collectives_can_follow_each_other() {
    let results = launch(2, |mut comm| {
        let mut out = Vec::new();
        for round in 0..5 {
            comm.barrier();
            out.push(comm.sum_f64((comm.this_node() + round) as f64));
        }
        out
    });
    assert_eq!(results[0], vec![1.0, 3.0, 5.0, 7.0, 9.0]);
    assert_eq!(results[0], results[1]);
}

#[test]
fn single_node_sum_is_identity() {
    let mut comm = SingleNode::new();
    let mut v = [2.5, -1.0];
    all_to_all_sum(&mut comm, &mut v);
    assert_eq!(v, [2.5, -1.0]);
    assert_eq!(comm.sum_f64(3.0), 3.0);
}
