use crate::geometry::*;
use crate::util::*;
use std::collections::BTreeMap;

/// Where the value gathered for one local site comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NeighborSource {
    Local(usize),
    Remote { node: NodeId, local_index: usize },
}

/// One of our sites whose value a peer needs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SendEntry {
    pub source_local: usize,
    /// Parity of the receiving site on the peer, checked against the filter.
    pub dest_parity: Parity,
}

/// One of our sites whose gathered value comes from a peer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecvEntry {
    pub dest_local: usize,
    pub parity: Parity,
}

/// Everything exchanged with one peer for one displacement.
/// Both lists are ordered by the receiving site's local index,
/// so a sender's packing order is its peer's unpacking order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerExchange {
    pub node: NodeId,
    pub send: Vec<SendEntry>,
    pub recv: Vec<RecvEntry>,
}

impl PeerExchange {
    pub fn send_count(&self, filter: ParityFilter) -> usize {
        self.send
            .iter()
            .filter(|e| filter.contains(e.dest_parity))
            .count()
    }

    pub fn recv_count(&self, filter: ParityFilter) -> usize {
        self.recv.iter().filter(|e| filter.contains(e.parity)).count()
    }
}

/// Precomputed neighbor lookup for a single displacement.
#[derive(Clone, Debug)]
pub struct NeighborTable<const GRID_DIMENSION: usize> {
    displacement: Coord<GRID_DIMENSION>,
    sources: Vec<NeighborSource>,
    phases: Vec<f64>,
    peers: Vec<PeerExchange>,
}

impl<const GRID_DIMENSION: usize> NeighborTable<GRID_DIMENSION> {
    /// `coords[i]` must be the coordinate of local site `i`.
    pub fn build(
        geometry: &Geometry<GRID_DIMENSION>,
        this_node: NodeId,
        coords: &[Coord<GRID_DIMENSION>],
        displacement: Coord<GRID_DIMENSION>,
    ) -> Self {
        profiling::scope!("NeighborTable::build");
        let mut sources = allocate_or_die(coords.len(), "neighbor table", this_node);
        let mut phases = allocate_or_die(coords.len(), "neighbor table", this_node);
        let mut peers: BTreeMap<NodeId, PeerExchange> = BTreeMap::new();

        // What we receive: x + displacement, in local order.
        for (local, coord) in coords.iter().enumerate() {
            let neighbor = geometry.neighbor(coord, &displacement);
            let node = geometry.node_of(&neighbor);
            let local_index = geometry.local_index_of(&neighbor);
            phases.push(geometry.boundary_phase(coord, &displacement));
            if node == this_node {
                sources.push(NeighborSource::Local(local_index));
            } else {
                sources.push(NeighborSource::Remote { node, local_index });
                peers
                    .entry(node)
                    .or_insert_with(|| PeerExchange {
                        node,
                        ..Default::default()
                    })
                    .recv
                    .push(RecvEntry {
                        dest_local: local,
                        parity: Parity::of(coord),
                    });
            }
        }

        // What we send: every y whose y - displacement lives elsewhere.
        let mut pending: BTreeMap<NodeId, Vec<(usize, SendEntry)>> =
            BTreeMap::new();
        for (local, coord) in coords.iter().enumerate() {
            let receiver = geometry.neighbor(coord, &(-displacement));
            let node = geometry.node_of(&receiver);
            if node == this_node {
                continue;
            }
            pending.entry(node).or_default().push((
                geometry.local_index_of(&receiver),
                SendEntry {
                    source_local: local,
                    dest_parity: Parity::of(&receiver),
                },
            ));
        }
        for (node, mut entries) in pending {
            entries.sort_unstable_by_key(|(dest, _)| *dest);
            peers
                .entry(node)
                .or_insert_with(|| PeerExchange {
                    node,
                    ..Default::default()
                })
                .send = entries.into_iter().map(|(_, e)| e).collect();
        }

        NeighborTable {
            displacement,
            sources,
            phases,
            peers: peers.into_values().collect(),
        }
    }

    pub fn displacement(&self) -> Coord<GRID_DIMENSION> {
        self.displacement
    }

    pub fn source(&self, local_index: usize) -> NeighborSource {
        self.sources[local_index]
    }

    pub fn sources(&self) -> &[NeighborSource] {
        &self.sources
    }

    pub fn phase(&self, local_index: usize) -> f64 {
        self.phases[local_index]
    }

    /// Peers in increasing node order.
    pub fn peers(&self) -> &[PeerExchange] {
        &self.peers
    }

    pub fn size_in_bytes(&self) -> usize {
        self.sources.len() * std::mem::size_of::<NeighborSource>()
            + self.phases.len() * std::mem::size_of::<f64>()
            + self
                .peers
                .iter()
                .map(|p| {
                    p.send.len() * std::mem::size_of::<SendEntry>()
                        + p.recv.len() * std::mem::size_of::<RecvEntry>()
                })
                .sum::<usize>()
    }
}
