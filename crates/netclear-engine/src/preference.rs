//! Preference graph construction.
//!
//! The preference graph keeps the buyer–seller pairs that would give the
//! buyer strictly positive utility at current prices:
//!
//! ```text
//! (b, s) ∈ pref  ⇔  valuation(b, s) − price(s) > 0
//! ```
//!
//! It spans the full node set of the market, so buyers with no profitable
//! seller are present with degree zero. It is rebuilt every round.

use std::collections::BTreeMap;

use netclear_types::{MarketGraph, NetclearError, NodeId, Result};

/// Undirected graph of positive-utility buyer–seller pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferenceGraph {
    /// Symmetric adjacency: node → (neighbour → valuation).
    adjacency: BTreeMap<NodeId, BTreeMap<NodeId, f64>>,
    edge_count: usize,
}

impl PreferenceGraph {
    /// A graph over `nodes` with no edges.
    pub fn with_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            adjacency: nodes.into_iter().map(|n| (n, BTreeMap::new())).collect(),
            edge_count: 0,
        }
    }

    /// Insert the undirected edge `a`-`b`, adding missing endpoints.
    /// Re-inserting an existing edge only updates its valuation.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, valuation: f64) {
        let is_new = self
            .adjacency
            .entry(a)
            .or_default()
            .insert(b, valuation)
            .is_none();
        self.adjacency.entry(b).or_default().insert(a, valuation);
        if is_new {
            self.edge_count += 1;
        }
    }

    /// Number of neighbours of `node`; zero for unknown nodes.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map_or(0, BTreeMap::len)
    }

    /// Neighbours of `node` in id order.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|adj| adj.keys().copied())
    }

    #[must_use]
    pub fn contains_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|adj| adj.contains_key(&b))
    }

    /// Valuation carried by the edge `a`-`b`.
    #[must_use]
    pub fn valuation(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.adjacency.get(&a).and_then(|adj| adj.get(&b)).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Each edge once, as `(lower id, higher id, valuation)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, f64)> + '_ {
        self.adjacency.iter().flat_map(|(&a, adj)| {
            adj.iter()
                .filter(move |(b, _)| a < **b)
                .map(move |(&b, &v)| (a, b, v))
        })
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}

/// Derive the preference graph of `market` at its current prices.
///
/// # Errors
/// `MissingValuation` for the first buyer–seller edge without a valuation.
/// The whole market is scanned; the error is never deferred to a later round.
pub fn build_preference_graph(market: &MarketGraph) -> Result<PreferenceGraph> {
    let mut graph = PreferenceGraph::with_nodes(market.nodes());

    for buyer in market.buyers() {
        for (seller, edge) in market.edges_of(buyer) {
            let valuation = edge
                .valuation
                .ok_or(NetclearError::MissingValuation { buyer, seller })?;
            let price = market
                .price(seller)
                .ok_or(NetclearError::UnknownSeller(seller))?;
            if valuation - price > 0.0 {
                graph.add_edge(buyer, seller, valuation);
            }
        }
    }

    Ok(graph)
}
