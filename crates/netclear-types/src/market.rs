//! The bipartite market graph.
//!
//! A market holds `2n` nodes. Ids below `n` are sellers and carry a
//! [`SellerState`]; the rest are buyers. Edges only join a buyer and a
//! seller and carry a [`MarketEdge`] with the buyer's valuation of that
//! seller's item.
//!
//! The partition and the valuations are fixed once the graph is built.
//! Seller prices are the only mutable state and only ever go up, through
//! [`MarketGraph::raise_price`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{NetclearError, NodeId, Result, Side, constants};

/// Mutable per-seller state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SellerState {
    /// Current asking price. Non-negative and finite.
    pub price: f64,
}

impl Default for SellerState {
    fn default() -> Self {
        Self {
            price: constants::DEFAULT_PRICE,
        }
    }
}

/// Immutable per-edge data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketEdge {
    /// The buyer's valuation of the seller's item. `None` when the
    /// description omitted it; such an edge is rejected before clearing.
    pub valuation: Option<f64>,
}

/// A bipartite valuation graph between sellers and buyers.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketGraph {
    /// Half the node count; the seller/buyer threshold.
    n: usize,
    sellers: BTreeMap<NodeId, SellerState>,
    buyers: BTreeSet<NodeId>,
    /// Keyed by `(buyer, seller)` so a buyer's edges form a contiguous range.
    edges: BTreeMap<(NodeId, NodeId), MarketEdge>,
}

impl MarketGraph {
    /// Build the node set of a market.
    ///
    /// Each node comes with the `price` attribute from the description, if
    /// any. Buyer prices are ignored; a seller without one starts at
    /// [`constants::DEFAULT_PRICE`].
    ///
    /// # Errors
    /// - `EmptyMarket` if no nodes are given
    /// - `DuplicateNode` if an id repeats
    /// - `OddNodeCount` if the node count is not `2n`
    /// - `InvalidPrice` if a seller price is negative or not finite
    pub fn new<I>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, Option<f64>)>,
    {
        let nodes: Vec<(NodeId, Option<f64>)> = nodes.into_iter().collect();
        if nodes.is_empty() {
            return Err(NetclearError::EmptyMarket);
        }

        let mut seen = BTreeSet::new();
        for (id, _) in &nodes {
            if !seen.insert(*id) {
                return Err(NetclearError::DuplicateNode(*id));
            }
        }

        if nodes.len() % 2 != 0 {
            return Err(NetclearError::OddNodeCount { count: nodes.len() });
        }
        let n = nodes.len() / 2;

        let mut sellers = BTreeMap::new();
        let mut buyers = BTreeSet::new();
        for (id, price) in nodes {
            match id.side(n) {
                Side::Seller => {
                    let price = price.unwrap_or(constants::DEFAULT_PRICE);
                    if !price.is_finite() || price < 0.0 {
                        return Err(NetclearError::InvalidPrice {
                            seller: id,
                            value: price,
                        });
                    }
                    sellers.insert(id, SellerState { price });
                }
                Side::Buyer => {
                    buyers.insert(id);
                }
            }
        }

        Ok(Self {
            n,
            sellers,
            buyers,
            edges: BTreeMap::new(),
        })
    }

    /// Build a market from its nodes and edges in one go.
    pub fn from_parts<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = (NodeId, Option<f64>)>,
        E: IntoIterator<Item = (NodeId, NodeId, Option<f64>)>,
    {
        let mut market = Self::new(nodes)?;
        for (a, b, valuation) in edges {
            market.insert_edge(a, b, valuation)?;
        }
        Ok(market)
    }

    /// Insert an undirected edge between a buyer and a seller, in either order.
    ///
    /// # Errors
    /// - `UnknownNode` if an endpoint is not in the node set
    /// - `SameSideEdge` if both endpoints are on the same side
    /// - `NonFiniteValuation` if the valuation is NaN or infinite
    /// - `DuplicateEdge` if the pair is already connected
    pub fn insert_edge(&mut self, a: NodeId, b: NodeId, valuation: Option<f64>) -> Result<()> {
        let side_a = self.side_of(a).ok_or(NetclearError::UnknownNode {
            from: a,
            to: b,
            missing: a,
        })?;
        let side_b = self.side_of(b).ok_or(NetclearError::UnknownNode {
            from: a,
            to: b,
            missing: b,
        })?;
        if side_a == side_b {
            return Err(NetclearError::SameSideEdge { from: a, to: b });
        }

        let (buyer, seller) = if side_a == Side::Buyer { (a, b) } else { (b, a) };

        if let Some(value) = valuation {
            if !value.is_finite() {
                return Err(NetclearError::NonFiniteValuation {
                    buyer,
                    seller,
                    value,
                });
            }
        }

        if self.edges.contains_key(&(buyer, seller)) {
            return Err(NetclearError::DuplicateEdge { buyer, seller });
        }
        self.edges.insert((buyer, seller), MarketEdge { valuation });
        Ok(())
    }

    /// Check that every edge carries a valuation.
    ///
    /// # Errors
    /// `MissingValuation` for the first offending edge in `(buyer, seller)` order.
    pub fn validate(&self) -> Result<()> {
        for (&(buyer, seller), edge) in &self.edges {
            if edge.valuation.is_none() {
                return Err(NetclearError::MissingValuation { buyer, seller });
            }
        }
        Ok(())
    }

    /// Raise a seller's price by `by` and return the new price.
    ///
    /// # Errors
    /// `UnknownSeller` if `seller` is not a seller of this market.
    pub fn raise_price(&mut self, seller: NodeId, by: f64) -> Result<f64> {
        let state = self
            .sellers
            .get_mut(&seller)
            .ok_or(NetclearError::UnknownSeller(seller))?;
        state.price += by;
        Ok(state.price)
    }

    /// The seller/buyer threshold `n`.
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.sellers.len() + self.buyers.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The side of `id`, or `None` if the node is not in the market.
    #[must_use]
    pub fn side_of(&self, id: NodeId) -> Option<Side> {
        if self.sellers.contains_key(&id) {
            Some(Side::Seller)
        } else if self.buyers.contains(&id) {
            Some(Side::Buyer)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_seller(&self, id: NodeId) -> bool {
        self.sellers.contains_key(&id)
    }

    #[must_use]
    pub fn is_buyer(&self, id: NodeId) -> bool {
        self.buyers.contains(&id)
    }

    /// Sellers in id order.
    pub fn sellers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sellers.keys().copied()
    }

    /// Buyers in id order.
    pub fn buyers(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.buyers.iter().copied()
    }

    /// Every node in id order within each side, sellers first.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sellers().chain(self.buyers())
    }

    #[must_use]
    pub fn seller_count(&self) -> usize {
        self.sellers.len()
    }

    #[must_use]
    pub fn buyer_count(&self) -> usize {
        self.buyers.len()
    }

    #[must_use]
    pub fn price(&self, seller: NodeId) -> Option<f64> {
        self.sellers.get(&seller).map(|s| s.price)
    }

    /// Snapshot of every seller's price.
    #[must_use]
    pub fn prices(&self) -> BTreeMap<NodeId, f64> {
        self.sellers.iter().map(|(id, s)| (*id, s.price)).collect()
    }

    /// All edges as `(buyer, seller, edge)` in `(buyer, seller)` order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId, &MarketEdge)> + '_ {
        self.edges.iter().map(|(&(b, s), e)| (b, s, e))
    }

    /// The edges of one buyer as `(seller, edge)`.
    pub fn edges_of(&self, buyer: NodeId) -> impl Iterator<Item = (NodeId, &MarketEdge)> + '_ {
        self.edges
            .range((buyer, NodeId(i64::MIN))..=(buyer, NodeId(i64::MAX)))
            .map(|(&(_, s), e)| (s, e))
    }

    /// The edge between `a` and `b`, in either orientation.
    #[must_use]
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<&MarketEdge> {
        self.edges.get(&(a, b)).or_else(|| self.edges.get(&(b, a)))
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl MarketGraph {
    /// A market with sellers `0..n`, buyers `n..2n`, all prices at zero and
    /// each buyer–seller pair connected with probability `density`.
    /// Valuations are integers in `0..=max_valuation`.
    pub fn random<R: rand::Rng>(rng: &mut R, n: usize, density: f64, max_valuation: u32) -> Self {
        let count = i64::try_from(2 * n).expect("market size fits in i64");
        let half = count / 2;
        let mut market =
            Self::new((0..count).map(|i| (NodeId(i), None))).expect("2n distinct nodes");
        for buyer in half..count {
            for seller in 0..half {
                if rng.gen_bool(density.clamp(0.0, 1.0)) {
                    let valuation = f64::from(rng.gen_range(0..=max_valuation));
                    market
                        .insert_edge(NodeId(buyer), NodeId(seller), Some(valuation))
                        .expect("fresh buyer-seller edge");
                }
            }
        }
        market
    }

    /// Sellers `0..n` at the given prices, buyers `n..2n`, and the listed
    /// `(buyer, seller, valuation)` edges.
    pub fn dummy(prices: &[f64], edges: &[(i64, i64, f64)]) -> Self {
        let n = i64::try_from(prices.len()).expect("market size fits in i64");
        let nodes = (0..2 * n).map(|i| {
            let price = usize::try_from(i).ok().and_then(|i| prices.get(i)).copied();
            (NodeId(i), price)
        });
        let edges = edges
            .iter()
            .map(|&(b, s, v)| (NodeId(b), NodeId(s), Some(v)));
        Self::from_parts(nodes, edges).expect("well-formed dummy market")
    }
}
