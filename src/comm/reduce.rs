use crate::comm::*;
use crate::partition::*;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Every node sends its partials to every peer, then adds all partials
/// in node order. The result does not depend on arrival order.
pub fn all_to_all_sum<C: Communicator + ?Sized>(comm: &mut C, values: &mut [f64]) {
    profiling::scope!("all_to_all_sum");
    let tag = comm.next_collective_tag();
    let me = comm.this_node();
    let nodes = comm.number_of_nodes();
    if nodes == 1 {
        return;
    }

    let payload: Vec<u8> = bytemuck::cast_slice(values).to_vec();
    for peer in (0..nodes).filter(|p| *p != me) {
        comm.send(peer, tag, payload.clone());
    }

    let mut totals = vec![0.0; values.len()];
    for node in 0..nodes {
        if node == me {
            for (t, v) in totals.iter_mut().zip(values.iter()) {
                *t += *v;
            }
            continue;
        }
        let bytes = comm.recv(node, tag);
        assert_eq!(
            bytes.len(),
            values.len() * F64_BYTES,
            "node{}: node{} contributed {} bytes to a {} value sum",
            me,
            node,
            bytes.len(),
            values.len()
        );
        for (t, chunk) in totals.iter_mut().zip(bytes.chunks_exact(F64_BYTES)) {
            *t += bytemuck::pod_read_unaligned::<f64>(chunk);
        }
    }
    values.copy_from_slice(&totals);
}

/// Sum of `f` over every site of the lattice.
/// Local sites are added in local index order before the collective.
pub fn global_site_sum<const GRID_DIMENSION: usize, S, C, F>(
    comm: &mut C,
    partition: &Partition<GRID_DIMENSION, S>,
    f: F,
) -> f64
where
    C: Communicator + ?Sized,
    F: Fn(&Site<GRID_DIMENSION, S>) -> f64,
{
    let local: f64 = partition.sites().iter().map(f).sum();
    comm.sum_f64(local)
}
