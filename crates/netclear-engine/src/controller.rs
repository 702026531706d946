//! The market-clearing controller.
//!
//! Owns the market for the duration of a run and drives it round by round:
//!
//! 1. Rebuild the preference graph at current prices
//! 2. Split buyers into active (some positive-utility seller) and inactive
//! 3. No active buyers → `CLEARED`
//! 4. Maximum matching, sellers as the top side
//! 5. Every active buyer matched → `CLEARED`
//! 6. Walk alternating paths from the free active buyers; unreached
//!    sellers are constricted
//! 7. Pick the sellers to raise: constricted, else unmatched sellers next
//!    to an active buyer, else every unmatched seller, else
//!    `STOPPED_NO_PROGRESS`
//! 8. Raise every picked seller by the configured increment
//! 9. Round ceiling reached → `STOPPED_MAX_ROUNDS`, otherwise go again
//!
//! Prices never decrease, and a price only increases in a round that
//! picked its seller.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use netclear_types::{
    ClearingConfig, ClearingReport, ClearingState, MarketGraph, NodeId, Result, RoundReport,
    RunId, SelectionTier, constants,
};

use crate::{
    AlternatingGraph, AugmentingPath, BipartiteMatcher, Matching, PreferenceGraph,
    build_preference_graph, compute_price_root, constricted_sellers, matcher_for,
};

/// Iterative market-clearing driver with `step()` / `run()`.
pub struct MarketClearing {
    run_id: RunId,
    market: MarketGraph,
    config: ClearingConfig,
    matcher: Box<dyn BipartiteMatcher>,
    fallback: Box<dyn BipartiteMatcher>,
    round: u32,
    state: ClearingState,
    last_round: Option<RoundReport>,
    history: Vec<RoundReport>,
    started_at: DateTime<Utc>,
}

impl MarketClearing {
    /// Take ownership of `market` for a clearing run.
    ///
    /// The config and every edge's valuation are checked here, so input
    /// errors surface before the first round.
    ///
    /// # Errors
    /// - `Configuration` if the config is out of range
    /// - `MissingValuation` if any market edge lacks a valuation
    pub fn new(market: MarketGraph, config: ClearingConfig) -> Result<Self> {
        config.validate()?;
        market.validate()?;

        Ok(Self {
            run_id: RunId::new(),
            matcher: matcher_for(config.matcher),
            fallback: Box::new(AugmentingPath),
            market,
            config,
            round: 0,
            state: ClearingState::Running,
            last_round: None,
            history: Vec::new(),
            started_at: Utc::now(),
        })
    }

    /// Replace the primary matching engine.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Box<dyn BipartiteMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn state(&self) -> ClearingState {
        self.state
    }

    /// Rounds executed so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn market(&self) -> &MarketGraph {
        &self.market
    }

    /// The report of the most recent round.
    pub fn last_round(&self) -> Option<&RoundReport> {
        self.last_round.as_ref()
    }

    /// Hand the market back, with its final prices.
    pub fn into_market(self) -> MarketGraph {
        self.market
    }

    /// Execute one round and return the resulting state.
    ///
    /// In a terminal state this does nothing and returns that state.
    pub fn step(&mut self) -> Result<ClearingState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        self.round += 1;
        let round = self.round;
        let mut report = RoundReport::new(round);

        let graph = build_preference_graph(&self.market)?;

        let (active, inactive): (BTreeSet<NodeId>, BTreeSet<NodeId>) =
            self.market.buyers().partition(|b| graph.degree(*b) > 0);
        report.active_buyers = active.iter().copied().collect();
        report.inactive_buyers = inactive.iter().copied().collect();
        report.prices = self.market.prices().into_iter().collect();

        if active.is_empty() {
            tracing::info!(round, "No active buyers; market cleared trivially");
            return Ok(self.conclude(report, ClearingState::Cleared));
        }

        let sellers: BTreeSet<NodeId> = self.market.sellers().collect();
        let matching = self.maximum_matching(&graph, &sellers)?;
        report.matching = matching.buyer_seller_pairs(&self.market);

        let matched_buyers: BTreeSet<NodeId> = report.matching.iter().map(|(b, _)| *b).collect();
        let matched_sellers: BTreeSet<NodeId> = report.matching.iter().map(|(_, s)| *s).collect();

        tracing::debug!(
            round,
            active = active.len(),
            inactive = inactive.len(),
            matched = matched_buyers.len(),
            "Round matched"
        );

        if active.is_subset(&matched_buyers) {
            tracing::info!(round, matched = matched_buyers.len(), "All active buyers matched; market cleared");
            return Ok(self.conclude(report, ClearingState::Cleared));
        }

        let free: BTreeSet<NodeId> = active.difference(&matched_buyers).copied().collect();
        let alternating = AlternatingGraph::new(&self.market, &graph, &matching);
        let reachable = alternating.reachable_from(&free);
        let constricted = constricted_sellers(&self.market, &reachable);

        report.free_buyers = free.iter().copied().collect();
        report.reachable = reachable.iter().copied().collect();
        report.constricted = constricted.iter().copied().collect();

        let Some((tier, selected)) =
            Self::select_sellers(&graph, &active, &sellers, &matched_sellers, constricted)
        else {
            tracing::warn!(
                round,
                free = free.len(),
                "No seller can be raised while active buyers remain unmatched; stopping"
            );
            return Ok(self.conclude(report, ClearingState::StoppedNoProgress));
        };

        if tier != SelectionTier::Constricted {
            tracing::warn!(round, %tier, sellers = ?selected, "No constricted sellers; using fallback selection");
        }

        for &seller in &selected {
            let price = self.market.raise_price(seller, self.config.price_increment)?;
            tracing::debug!(round, seller = %seller, price, "Price raised");
        }
        report.selection = Some(tier);
        report.raised = selected.into_iter().collect();

        let next = if round >= self.config.max_rounds {
            tracing::warn!(round, max_rounds = self.config.max_rounds, "Round ceiling reached; stopping");
            ClearingState::StoppedMaxRounds
        } else {
            ClearingState::Running
        };
        Ok(self.conclude(report, next))
    }

    /// Step until a terminal state and report the run.
    pub fn run(&mut self) -> Result<ClearingReport> {
        self.run_with(|_| {})
    }

    /// Like [`run`](Self::run), calling `on_round` after every round.
    pub fn run_with<F>(&mut self, mut on_round: F) -> Result<ClearingReport>
    where
        F: FnMut(&RoundReport),
    {
        let span = tracing::info_span!("clearing_run", run_id = %self.run_id);
        let _guard = span.enter();

        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            sellers = self.market.seller_count(),
            buyers = self.market.buyer_count(),
            edges = self.market.edge_count(),
            max_rounds = self.config.max_rounds,
            matcher = self.matcher.name(),
            "Clearing started"
        );

        while !self.state.is_terminal() {
            self.step()?;
            if let Some(report) = &self.last_round {
                on_round(report);
            }
        }

        let report = self.report();
        tracing::info!(
            state = %report.state,
            rounds = report.rounds,
            price_root = %report.price_root,
            "Clearing finished"
        );
        Ok(report)
    }

    /// Snapshot of the run so far.
    pub fn report(&self) -> ClearingReport {
        ClearingReport {
            run_id: self.run_id,
            state: self.state,
            rounds: self.round,
            final_prices: self.market.prices().into_iter().collect(),
            matching: self
                .last_round
                .as_ref()
                .map(|r| r.matching.clone())
                .unwrap_or_default(),
            price_root: hex::encode(compute_price_root(&self.market)),
            started_at: self.started_at,
            finished_at: Utc::now(),
            history: self.history.clone(),
        }
    }

    /// Primary engine first; on failure or an invalid result, the fallback.
    fn maximum_matching(
        &self,
        graph: &PreferenceGraph,
        top: &BTreeSet<NodeId>,
    ) -> Result<Matching> {
        let primary = self
            .matcher
            .maximum_matching(graph, top)
            .and_then(|m| m.validate_against(graph).map(|()| m));

        match primary {
            Ok(matching) => Ok(matching),
            Err(err) => {
                tracing::warn!(
                    matcher = self.matcher.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "Primary matcher unavailable; falling back"
                );
                let matching = self.fallback.maximum_matching(graph, top)?;
                matching.validate_against(graph)?;
                Ok(matching)
            }
        }
    }

    /// Sellers whose price goes up this round, and the rule that chose them.
    fn select_sellers(
        graph: &PreferenceGraph,
        active: &BTreeSet<NodeId>,
        sellers: &BTreeSet<NodeId>,
        matched_sellers: &BTreeSet<NodeId>,
        constricted: BTreeSet<NodeId>,
    ) -> Option<(SelectionTier, BTreeSet<NodeId>)> {
        if !constricted.is_empty() {
            return Some((SelectionTier::Constricted, constricted));
        }

        let adjacent: BTreeSet<NodeId> = active
            .iter()
            .flat_map(|b| graph.neighbors(*b))
            .filter(|s| !matched_sellers.contains(s))
            .collect();
        if !adjacent.is_empty() {
            return Some((SelectionTier::AdjacentUnmatched, adjacent));
        }

        // Unreachable in practice: with nothing constricted every seller was
        // reached, and reached sellers all neighbour an active buyer.
        let unmatched: BTreeSet<NodeId> = sellers.difference(matched_sellers).copied().collect();
        if unmatched.is_empty() {
            None
        } else {
            Some((SelectionTier::AllUnmatched, unmatched))
        }
    }

    fn conclude(&mut self, mut report: RoundReport, state: ClearingState) -> ClearingState {
        self.state = state;
        report.outcome = state;
        if self.config.record_rounds {
            self.history.push(report.clone());
        }
        self.last_round = Some(report);
        state
    }
}

impl std::fmt::Debug for MarketClearing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketClearing")
            .field("run_id", &self.run_id)
            .field("state", &self.state)
            .field("round", &self.round)
            .field("matcher", &self.matcher.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
