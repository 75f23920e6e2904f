use crate::comm::*;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::{HashMap, VecDeque};

type Message = (MessageTag, Vec<u8>);

/// One node of an in-process lattice, the nodes are threads and every
/// ordered pair of nodes has its own channel.
///
/// A node that panics drops its channel ends. Peers waiting on it see
/// the disconnect and panic as well, so one fatal fault takes the whole
/// run down instead of leaving the others blocked.
pub struct ThreadComm {
    this_node: NodeId,
    senders: Vec<Option<Sender<Message>>>,
    receivers: Vec<Option<Receiver<Message>>>,
    stash: HashMap<(NodeId, MessageTag), VecDeque<Vec<u8>>>,
    collectives: u64,
}

impl ThreadComm {
    /// Fully connected endpoints for `nodes` nodes, in node order.
    pub fn mesh(nodes: usize) -> Vec<ThreadComm> {
        assert!(nodes > 0, "ERROR: a mesh needs at least one node");
        let mut senders: Vec<Vec<Option<Sender<Message>>>> =
            (0..nodes).map(|_| (0..nodes).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Message>>>> =
            (0..nodes).map(|_| (0..nodes).map(|_| None).collect()).collect();
        for from in 0..nodes {
            for to in 0..nodes {
                if from == to {
                    continue;
                }
                let (tx, rx) = unbounded();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(this_node, (senders, receivers))| ThreadComm {
                this_node,
                senders,
                receivers,
                stash: HashMap::new(),
                collectives: 0,
            })
            .collect()
    }

    fn peer_check(&self, peer: NodeId) {
        if peer == self.this_node || peer >= self.senders.len() {
            panic!(
                "ERROR: node{}: node{} is not a peer in a {} node mesh",
                self.this_node,
                peer,
                self.senders.len()
            );
        }
    }
}

impl Communicator for ThreadComm {
    fn this_node(&self) -> NodeId {
        self.this_node
    }

    fn number_of_nodes(&self) -> usize {
        self.senders.len()
    }

    fn send(&mut self, peer: NodeId, tag: MessageTag, payload: Vec<u8>) {
        self.peer_check(peer);
        let sent = self.senders[peer]
            .as_ref()
            .map(|tx| tx.send((tag, payload)).is_ok())
            .unwrap_or(false);
        if !sent {
            panic!(
                "node{}: lost connection to node{} sending {:?}",
                self.this_node, peer, tag
            );
        }
    }

    fn recv(&mut self, peer: NodeId, tag: MessageTag) -> Vec<u8> {
        self.peer_check(peer);
        if let Some(queue) = self.stash.get_mut(&(peer, tag)) {
            if let Some(payload) = queue.pop_front() {
                if queue.is_empty() {
                    self.stash.remove(&(peer, tag));
                }
                return payload;
            }
        }
        loop {
            let received = match self.receivers[peer].as_ref() {
                Some(rx) => rx.recv().ok(),
                None => None,
            };
            let Some((arrived, payload)) = received else {
                panic!(
                    "node{}: lost connection to node{} waiting for {:?}",
                    self.this_node, peer, tag
                );
            };
            if arrived == tag {
                return payload;
            }
            tracing::trace!(
                node = self.this_node,
                peer,
                "stashing {:?} while waiting for {:?}",
                arrived,
                tag
            );
            self.stash.entry((peer, arrived)).or_default().push_back(payload);
        }
    }

    fn next_collective_tag(&mut self) -> MessageTag {
        self.collectives += 1;
        MessageTag::Collective(self.collectives)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| payload.downcast_ref::<&str>().copied())
}

/// Run `f` once per node, each on its own thread with its own endpoint.
/// Results come back in node order.
/// If any node panicked the panic is resumed here, preferring a node's own
/// fault over the lost connections it caused on the others.
pub fn launch<R, F>(nodes: usize, f: F) -> Vec<R>
where
    R: Send,
    F: Fn(ThreadComm) -> R + Sync,
{
    let outcomes: Vec<std::thread::Result<R>> = std::thread::scope(|scope| {
        let handles: Vec<_> = ThreadComm::mesh(nodes)
            .into_iter()
            .map(|comm| {
                let f = &f;
                scope.spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut results = Vec::with_capacity(nodes);
    let mut panics = Vec::new();
    for (node, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(r) => results.push(r),
            Err(payload) => {
                tracing::debug!(node, "node panicked");
                panics.push(payload);
            }
        }
    }
    if !panics.is_empty() {
        let root = panics
            .iter()
            .position(|p| {
                panic_message(p.as_ref())
                    .map_or(true, |m| !m.contains("lost connection"))
            })
            .unwrap_or(0);
        std::panic::resume_unwind(panics.swap_remove(root));
    }
    results
}
