//! Maximum-cardinality bipartite matching.
//!
//! Two interchangeable engines sit behind [`BipartiteMatcher`]:
//!
//! - [`HopcroftKarp`]: BFS layering + DFS augmentation in phases,
//!   `O(E·√V)`. The primary engine.
//! - [`AugmentingPath`]: one augmenting-path search per top node
//!   (Kuhn's algorithm), `O(V·E)`. The fallback engine.
//!
//! Both return a maximum matching, so their cardinalities always agree;
//! the chosen pairs may differ when several maximum matchings exist.
//! Nodes are visited in id order, which makes each engine deterministic.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use netclear_types::{MarketGraph, MatcherKind, NetclearError, NodeId, Result};

use crate::PreferenceGraph;

/// A symmetric partial mapping: each matched node maps to its partner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matching {
    mate: BTreeMap<NodeId, NodeId>,
}

impl Matching {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a matching from pairs.
    ///
    /// # Errors
    /// `InvalidMatching` if a node appears in two pairs or is paired with itself.
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut matching = Self::new();
        for (a, b) in pairs {
            if a == b {
                return Err(NetclearError::InvalidMatching {
                    reason: format!("node {a} matched with itself"),
                });
            }
            for node in [a, b] {
                if matching.mate.contains_key(&node) {
                    return Err(NetclearError::InvalidMatching {
                        reason: format!("node {node} matched twice"),
                    });
                }
            }
            matching.mate.insert(a, b);
            matching.mate.insert(b, a);
        }
        Ok(matching)
    }

    /// The partner of `node`, if matched.
    #[must_use]
    pub fn partner(&self, node: NodeId) -> Option<NodeId> {
        self.mate.get(&node).copied()
    }

    #[must_use]
    pub fn is_matched(&self, node: NodeId) -> bool {
        self.mate.contains_key(&node)
    }

    /// Number of matched pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mate.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mate.is_empty()
    }

    /// The symmetric node → partner map.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<NodeId, NodeId> {
        &self.mate
    }

    /// Matched `(buyer, seller)` pairs of `market`, in buyer id order.
    #[must_use]
    pub fn buyer_seller_pairs(&self, market: &MarketGraph) -> Vec<(NodeId, NodeId)> {
        self.mate
            .iter()
            .filter(|(b, s)| market.is_buyer(**b) && market.is_seller(**s))
            .map(|(&b, &s)| (b, s))
            .collect()
    }

    /// Check that every matched pair is an edge of `graph`.
    ///
    /// # Errors
    /// `InvalidMatching` naming the first pair that is not a preference edge.
    pub fn validate_against(&self, graph: &PreferenceGraph) -> Result<()> {
        for (&a, &b) in &self.mate {
            if self.mate.get(&b) != Some(&a) {
                return Err(NetclearError::InvalidMatching {
                    reason: format!("pair ({a},{b}) is not symmetric"),
                });
            }
            if !graph.contains_edge(a, b) {
                return Err(NetclearError::InvalidMatching {
                    reason: format!("pair ({a},{b}) is not a preference edge"),
                });
            }
        }
        Ok(())
    }
}

/// A maximum-cardinality matching engine for bipartite graphs.
pub trait BipartiteMatcher {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Compute a maximum matching of `graph`, where `top` is one side of
    /// the bipartition and every other node belongs to the other side.
    ///
    /// # Errors
    /// `MatchingFailed` if the engine cannot produce a matching.
    fn maximum_matching(&self, graph: &PreferenceGraph, top: &BTreeSet<NodeId>)
    -> Result<Matching>;
}

/// The engine for a configured [`MatcherKind`].
#[must_use]
pub fn matcher_for(kind: MatcherKind) -> Box<dyn BipartiteMatcher> {
    match kind {
        MatcherKind::HopcroftKarp => Box::new(HopcroftKarp),
        MatcherKind::AugmentingPath => Box::new(AugmentingPath),
    }
}

// ---------------------------------------------------------------------------
// Dense index of a bipartite graph
// ---------------------------------------------------------------------------

/// Top nodes as `0..U`, bottom nodes as `0..V`, adjacency top → bottom.
struct Bipartition {
    top: Vec<NodeId>,
    bottom: Vec<NodeId>,
    adj: Vec<Vec<usize>>,
}

impl Bipartition {
    fn index(graph: &PreferenceGraph, top: &BTreeSet<NodeId>) -> Result<Self> {
        let top_nodes: Vec<NodeId> = top.iter().copied().collect();

        let mut bottom_index: BTreeMap<NodeId, usize> = BTreeMap::new();
        let mut bottom = Vec::new();
        let mut adj = Vec::with_capacity(top_nodes.len());

        for &u in &top_nodes {
            let mut row = Vec::with_capacity(graph.degree(u));
            for v in graph.neighbors(u) {
                if top.contains(&v) {
                    return Err(NetclearError::MatchingFailed {
                        reason: format!("edge ({u},{v}) joins two top nodes"),
                    });
                }
                let idx = *bottom_index.entry(v).or_insert_with(|| {
                    bottom.push(v);
                    bottom.len() - 1
                });
                row.push(idx);
            }
            adj.push(row);
        }

        Ok(Self {
            top: top_nodes,
            bottom,
            adj,
        })
    }

    fn into_matching(self, pair_top: &[Option<usize>]) -> Matching {
        let mut mate = BTreeMap::new();
        for (u, v) in pair_top.iter().enumerate() {
            if let Some(v) = *v {
                mate.insert(self.top[u], self.bottom[v]);
                mate.insert(self.bottom[v], self.top[u]);
            }
        }
        Matching { mate }
    }
}

// ---------------------------------------------------------------------------
// Hopcroft–Karp
// ---------------------------------------------------------------------------

/// Hopcroft–Karp maximum matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct HopcroftKarp;

const UNREACHED: usize = usize::MAX;

/// Match every top node on `stack` to the bottom node its cursor just passed.
///
/// Each frame is `(top, cursor)`; the frames form one augmenting path.
fn flip_path(
    stack: &[(usize, usize)],
    adj: &[Vec<usize>],
    pair_top: &mut [Option<usize>],
    pair_bottom: &mut [Option<usize>],
) {
    for &(u, cursor) in stack {
        let v = adj[u][cursor - 1];
        pair_top[u] = Some(v);
        pair_bottom[v] = Some(u);
    }
}

struct HopcroftKarpState<'a> {
    adj: &'a [Vec<usize>],
    pair_top: Vec<Option<usize>>,
    pair_bottom: Vec<Option<usize>>,
    dist: Vec<usize>,
    /// Length of the shortest augmenting path found by the last BFS.
    free_dist: usize,
}

impl HopcroftKarpState<'_> {
    /// Layer the free top nodes and the alternating paths leaving them, up
    /// to the shortest distance at which a free bottom node appears.
    /// Returns whether such a node was found.
    fn bfs(&mut self) -> bool {
        let mut queue = VecDeque::new();
        for (u, pair) in self.pair_top.iter().enumerate() {
            if pair.is_none() {
                self.dist[u] = 0;
                queue.push_back(u);
            } else {
                self.dist[u] = UNREACHED;
            }
        }

        self.free_dist = UNREACHED;
        while let Some(u) = queue.pop_front() {
            if self.dist[u] >= self.free_dist {
                continue;
            }
            for &v in &self.adj[u] {
                match self.pair_bottom[v] {
                    None => self.free_dist = self.free_dist.min(self.dist[u] + 1),
                    Some(w) if self.dist[w] == UNREACHED => {
                        self.dist[w] = self.dist[u] + 1;
                        queue.push_back(w);
                    }
                    Some(_) => {}
                }
            }
        }
        self.free_dist != UNREACHED
    }

    /// Augment along one shortest path from `root` through the BFS layers.
    fn augment(&mut self, root: usize) -> bool {
        let mut stack = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (u, cursor) = *frame;
            let Some(&v) = self.adj[u].get(cursor) else {
                // Dead end: no shortest path runs through `u` this phase.
                self.dist[u] = UNREACHED;
                stack.pop();
                continue;
            };
            frame.1 += 1;

            match self.pair_bottom[v] {
                None if self.dist[u] + 1 == self.free_dist => {
                    flip_path(&stack, self.adj, &mut self.pair_top, &mut self.pair_bottom);
                    return true;
                }
                Some(w) if self.dist[w] == self.dist[u] + 1 => stack.push((w, 0)),
                _ => {}
            }
        }
        false
    }
}

impl BipartiteMatcher for HopcroftKarp {
    fn name(&self) -> &'static str {
        "hopcroft-karp"
    }

    fn maximum_matching(
        &self,
        graph: &PreferenceGraph,
        top: &BTreeSet<NodeId>,
    ) -> Result<Matching> {
        let index = Bipartition::index(graph, top)?;
        let mut state = HopcroftKarpState {
            adj: &index.adj,
            pair_top: vec![None; index.top.len()],
            pair_bottom: vec![None; index.bottom.len()],
            dist: vec![UNREACHED; index.top.len()],
            free_dist: UNREACHED,
        };

        // Shortest-path phases: at most 2·√V + 2 are ever needed.
        let phase_limit = 2 * (index.top.len() + index.bottom.len()).isqrt() + 2;
        let mut phases = 0;
        while state.bfs() {
            phases += 1;
            if phases > phase_limit {
                return Err(NetclearError::MatchingFailed {
                    reason: format!("no convergence after {phase_limit} phases"),
                });
            }
            for u in 0..index.top.len() {
                if state.pair_top[u].is_none() {
                    state.augment(u);
                }
            }
        }

        let pair_top = state.pair_top;
        Ok(index.into_matching(&pair_top))
    }
}

// ---------------------------------------------------------------------------
// Augmenting path (Kuhn)
// ---------------------------------------------------------------------------

/// Simple augmenting-path maximum matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentingPath;

/// Search for an augmenting path from the free top node `root`, visiting
/// each bottom node at most once, and flip it if found.
///
/// A bottom node counts as visited when `seen[v] == stamp`.
fn try_augment(
    root: usize,
    stamp: usize,
    adj: &[Vec<usize>],
    seen: &mut [usize],
    pair_top: &mut [Option<usize>],
    pair_bottom: &mut [Option<usize>],
) -> bool {
    let mut stack = vec![(root, 0)];

    while let Some(frame) = stack.last_mut() {
        let (u, cursor) = *frame;
        let Some(&v) = adj[u].get(cursor) else {
            stack.pop();
            continue;
        };
        frame.1 += 1;

        if seen[v] == stamp {
            continue;
        }
        seen[v] = stamp;
        match pair_bottom[v] {
            None => {
                flip_path(&stack, adj, pair_top, pair_bottom);
                return true;
            }
            Some(w) => stack.push((w, 0)),
        }
    }
    false
}

impl BipartiteMatcher for AugmentingPath {
    fn name(&self) -> &'static str {
        "augmenting-path"
    }

    fn maximum_matching(
        &self,
        graph: &PreferenceGraph,
        top: &BTreeSet<NodeId>,
    ) -> Result<Matching> {
        let index = Bipartition::index(graph, top)?;
        let mut pair_top = vec![None; index.top.len()];
        let mut pair_bottom = vec![None; index.bottom.len()];
        let mut seen = vec![0; index.bottom.len()];

        for u in 0..index.top.len() {
            try_augment(
                u,
                u + 1,
                &index.adj,
                &mut seen,
                &mut pair_top,
                &mut pair_bottom,
            );
        }

        Ok(index.into_matching(&pair_top))
    }
}
