//! Alternating-path reachability and constricted sellers.
//!
//! The alternating graph is directed:
//!
//! ```text
//! buyer  ──▶ seller   for every preference edge
//! seller ──▶ buyer    for every matched pair
//! ```
//!
//! Walking it from the free active buyers follows exactly the alternating
//! paths of the current matching. Sellers the walk never reaches are the
//! constricted sellers.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use netclear_types::{MarketGraph, NodeId};

use crate::{Matching, PreferenceGraph};

/// Directed graph of alternating moves for one round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlternatingGraph {
    arcs: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl AlternatingGraph {
    /// Orient `graph` buyer → seller and add seller → buyer for each matched pair.
    #[must_use]
    pub fn new(market: &MarketGraph, graph: &PreferenceGraph, matching: &Matching) -> Self {
        let mut arcs: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();

        for (a, b, _) in graph.edges() {
            let arc = if market.is_buyer(a) && market.is_seller(b) {
                (a, b)
            } else if market.is_buyer(b) && market.is_seller(a) {
                (b, a)
            } else {
                continue;
            };
            arcs.entry(arc.0).or_default().insert(arc.1);
        }

        for (buyer, seller) in matching.buyer_seller_pairs(market) {
            arcs.entry(seller).or_default().insert(buyer);
        }

        Self { arcs }
    }

    /// Successors of `node` in id order.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.arcs
            .get(&node)
            .into_iter()
            .flat_map(|next| next.iter().copied())
    }

    #[must_use]
    pub fn arc_count(&self) -> usize {
        self.arcs.values().map(BTreeSet::len).sum()
    }

    /// Every node reachable from `starts`, the starts included.
    #[must_use]
    pub fn reachable_from(&self, starts: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
        let mut reached: BTreeSet<NodeId> = starts.clone();
        let mut queue: VecDeque<NodeId> = starts.iter().copied().collect();

        while let Some(node) = queue.pop_front() {
            for next in self.successors(node) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        reached
    }
}

/// Sellers of `market` that are not in `reachable`.
#[must_use]
pub fn constricted_sellers(market: &MarketGraph, reachable: &BTreeSet<NodeId>) -> BTreeSet<NodeId> {
    market.sellers().filter(|s| !reachable.contains(s)).collect()
}
