//! Point-to-point byte messages and collective sums between nodes.
//!
//! Every node runs the same sequence of communication calls, so message
//! tags built from per-node counters agree across nodes without any
//! negotiation.

mod reduce;
mod single;
mod threads;

pub use reduce::*;
pub use single::*;
pub use threads::*;

use crate::util::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageTag {
    /// One halo exchange, numbered by the posting node's gather count.
    Gather(u64),
    /// One collective call, numbered by the node's collective count.
    Collective(u64),
}

pub trait Communicator {
    fn this_node(&self) -> NodeId;

    fn number_of_nodes(&self) -> usize;

    /// Queue `payload` for `peer`, never blocks.
    fn send(&mut self, peer: NodeId, tag: MessageTag, payload: Vec<u8>);

    /// Block until the message from `peer` with `tag` arrives.
    /// Messages with other tags that show up first are kept for later.
    fn recv(&mut self, peer: NodeId, tag: MessageTag) -> Vec<u8>;

    /// Tag for the next collective call.
    fn next_collective_tag(&mut self) -> MessageTag;

    /// Element-wise sum over all nodes, every node gets identical bits.
    fn sum_f64_slice(&mut self, values: &mut [f64]) {
        all_to_all_sum(self, values);
    }

    fn sum_f64(&mut self, value: f64) -> f64 {
        let mut values = [value];
        self.sum_f64_slice(&mut values);
        values[0]
    }

    /// Returns once every node has reached the barrier.
    fn barrier(&mut self) {
        self.sum_f64_slice(&mut []);
    }
}
