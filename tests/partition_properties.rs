use lattice_gather::comm::*;
use lattice_gather::error::*;
use lattice_gather::geometry::*;
use lattice_gather::params::*;
use lattice_gather::partition::*;
use lattice_gather::util::*;
use rand::Rng;

fn partitions<const D: usize>(params: &LatticeParameters<D>) -> Vec<Partition<D>> {
    let geometry = Geometry::new(params).unwrap();
    (0..geometry.number_of_nodes())
        .map(|node| Partition::build(geometry.clone(), node, params))
        .collect()
}

#[test]
fn ownership_is_a_bijection() {
    for (extents, nodes) in [
        (vector![4, 4, 4, 8], 2),
        (vector![4, 6, 4, 2], 4),
        (vector![6, 4, 4, 4], 3),
        (vector![2, 2, 2, 2], 16),
    ] {
        let params = LatticeParameters::new(extents, nodes);
        let parts = partitions(&params);
        let geometry = parts[0].geometry().clone();
        let mut seen = vec![false; geometry.volume()];
        for p in &parts {
            for (i, site) in p.sites().iter().enumerate() {
                assert_eq!(site.local_index(), i);
                assert_eq!(geometry.node_of(&site.coord()), p.this_node());
                assert_eq!(geometry.local_index_of(&site.coord()), i);
                assert_eq!(geometry.coord_of(p.this_node(), i), site.coord());
                assert!(!seen[site.global_index()]);
                seen[site.global_index()] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }
}

#[test]
fn parity_follows_coordinate_sum() {
    let params = LatticeParameters::new(vector![4, 4, 4, 8], 2);
    for p in partitions(&params) {
        let mut even = 0;
        for site in p.sites() {
            let sum: i32 = site.coord().iter().sum();
            let expected = if sum % 2 == 0 { Parity::Even } else { Parity::Odd };
            assert_eq!(site.parity(), expected);
            if expected == Parity::Even {
                even += 1;
            }
        }
        assert_eq!(even * 2, p.sites_on_node());
        assert_eq!(p.sites_with_parity(ParityFilter::Even).count(), even);
    }
}

#[test]
fn site_generators_ignore_node_count() {
    let first_draws = |nodes: usize| -> Vec<u64> {
        let params = LatticeParameters::new(vector![4, 4, 2], nodes).with_seed(2024);
        let mut draws = vec![0; 32];
        for mut p in partitions(&params) {
            for mut site in p.sites_mut() {
                let g = site.global_index();
                draws[g] = site.prn_mut().unwrap().gen();
            }
        }
        draws
    };
    let one = first_draws(1);
    assert_eq!(one, first_draws(2));
    assert_eq!(one, first_draws(4));
    assert_ne!(one[0], one[1]);
}

#[test]
fn no_seed_no_generator() {
    let params = LatticeParameters::new(vector![2, 2], 1);
    let p = &partitions(&params)[0];
    assert!(p.sites().iter().all(|s| s.prn().is_none()));
}

#[test]
fn configuration_errors() {
    assert!(matches!(
        Geometry::new(&LatticeParameters::new(vector![5, 5], 2)),
        Err(LatticeError::IndivisibleLayout { nodes: 2, .. })
    ));
    assert_eq!(
        Geometry::new(&LatticeParameters::new(vector![4, -1], 1)),
        Err(LatticeError::InvalidExtent {
            dimension: 1,
            extent: -1
        })
    );
    let g = Geometry::new(&LatticeParameters::new(vector![4, 4], 2)).unwrap();
    assert!(matches!(
        g.try_local_index_of(&vector![-1, 0]),
        Err(LatticeError::CoordinateOutOfRange { .. })
    ));
}

#[test]
fn threaded_build_matches_serial_build() {
    let params = LatticeParameters::new(vector![4, 4, 4], 4);
    let geometry = Geometry::new(&params).unwrap();
    let threaded = launch(4, |comm| {
        let p: Partition<3> = Partition::build(geometry.clone(), comm.this_node(), &params);
        p.sites().iter().map(|s| s.global_index()).collect::<Vec<_>>()
    });
    for (node, globals) in threaded.into_iter().enumerate() {
        let p: Partition<3> = Partition::build(geometry.clone(), node, &params);
        let expected: Vec<usize> = p.sites().iter().map(|s| s.global_index()).collect();
        assert_eq!(globals, expected);
        p.teardown();
    }
}
