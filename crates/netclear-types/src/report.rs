//! Clearing lifecycle types: controller states and the reports a run emits.
//!
//! A run moves from `RUNNING` to exactly one terminal state:
//! **CLEARED**, **STOPPED_MAX_ROUNDS** or **STOPPED_NO_PROGRESS**.
//! Only `CLEARED` is a success; the two stop states are policy outcomes
//! that callers must branch on.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NodeId, RunId};

/// The controller's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearingState {
    /// More rounds are needed.
    Running,
    /// Every active buyer is matched (or no buyer is active).
    Cleared,
    /// The round ceiling was reached before the market cleared.
    StoppedMaxRounds,
    /// Buyers remain unmatched but no seller's price can be raised.
    StoppedNoProgress,
}

impl ClearingState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub fn is_cleared(self) -> bool {
        matches!(self, Self::Cleared)
    }
}

impl fmt::Display for ClearingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Cleared => write!(f, "CLEARED"),
            Self::StoppedMaxRounds => write!(f, "STOPPED_MAX_ROUNDS"),
            Self::StoppedNoProgress => write!(f, "STOPPED_NO_PROGRESS"),
        }
    }
}

/// Which rule picked the sellers whose prices go up in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// Sellers unreachable from free active buyers by alternating paths.
    Constricted,
    /// Unmatched sellers adjacent to an active buyer in the preference graph.
    AdjacentUnmatched,
    /// Every unmatched seller.
    AllUnmatched,
}

impl fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constricted => write!(f, "constricted"),
            Self::AdjacentUnmatched => write!(f, "adjacent unmatched"),
            Self::AllUnmatched => write!(f, "all unmatched"),
        }
    }
}

/// Trace of a single clearing round.
///
/// Node lists are sorted by id. `prices` is the snapshot taken before the
/// round's price update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub active_buyers: Vec<NodeId>,
    pub inactive_buyers: Vec<NodeId>,
    /// Matched `(buyer, seller)` pairs.
    pub matching: Vec<(NodeId, NodeId)>,
    pub prices: Vec<(NodeId, f64)>,
    pub free_buyers: Vec<NodeId>,
    pub reachable: Vec<NodeId>,
    pub constricted: Vec<NodeId>,
    pub selection: Option<SelectionTier>,
    /// Sellers whose price was raised at the end of the round.
    pub raised: Vec<NodeId>,
    /// State after the round.
    pub outcome: ClearingState,
}

impl RoundReport {
    /// A report for a round that has only counted its buyers so far.
    #[must_use]
    pub fn new(round: u32) -> Self {
        Self {
            round,
            active_buyers: Vec::new(),
            inactive_buyers: Vec::new(),
            matching: Vec::new(),
            prices: Vec::new(),
            free_buyers: Vec::new(),
            reachable: Vec::new(),
            constricted: Vec::new(),
            selection: None,
            raised: Vec::new(),
            outcome: ClearingState::Running,
        }
    }
}

fn write_ids(f: &mut fmt::Formatter<'_>, ids: &[NodeId]) -> fmt::Result {
    write!(f, "[")?;
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{id}")?;
    }
    write!(f, "]")
}

impl fmt::Display for RoundReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Round {} ---", self.round)?;

        write!(f, "Matching: [")?;
        for (i, (buyer, seller)) in self.matching.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({buyer}, {seller})")?;
        }
        writeln!(f, "]")?;

        write!(f, "Active buyers: ")?;
        write_ids(f, &self.active_buyers)?;
        write!(f, "\nInactive buyers: ")?;
        write_ids(f, &self.inactive_buyers)?;

        write!(f, "\n[Prices] ")?;
        for (i, (seller, price)) in self.prices.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{seller}:{price}")?;
        }
        writeln!(f)?;

        if !self.free_buyers.is_empty() {
            write!(f, "Free active buyers: ")?;
            write_ids(f, &self.free_buyers)?;
            write!(f, "\nReachable: ")?;
            write_ids(f, &self.reachable)?;
            write!(f, "\nConstricted sellers: ")?;
            write_ids(f, &self.constricted)?;
            writeln!(f)?;
        }

        if let Some(tier) = self.selection {
            write!(f, "Raised ({tier}): ")?;
            write_ids(f, &self.raised)?;
            writeln!(f)?;
        }

        write!(f, "Outcome: {}", self.outcome)
    }
}

/// The result of a complete clearing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingReport {
    pub run_id: RunId,
    /// Terminal state of the run.
    pub state: ClearingState,
    /// Rounds executed, including the terminating one.
    pub rounds: u32,
    /// Seller prices when the run stopped, in id order.
    pub final_prices: Vec<(NodeId, f64)>,
    /// `(buyer, seller)` pairs of the last round's matching.
    pub matching: Vec<(NodeId, NodeId)>,
    /// Hex-encoded digest of the final prices.
    pub price_root: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every round's report, when the run was configured to record them.
    pub history: Vec<RoundReport>,
}
