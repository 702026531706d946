//! Identifiers used throughout netclear.
//!
//! Market nodes are identified by the integer id carried in the graph
//! description; a clearing run is identified by a UUIDv7.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::NetclearError;

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

/// Stable identifier of a market node. Sellers and buyers share one id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl NodeId {
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }

    /// Which side of a market with `n` sellers this node falls on.
    ///
    /// Ids strictly below `n` are sellers; everything else is a buyer.
    #[must_use]
    pub fn side(self, n: usize) -> Side {
        match i64::try_from(n) {
            Ok(threshold) if self.0 < threshold => Side::Seller,
            Ok(_) => Side::Buyer,
            // A threshold beyond i64 puts every id on the seller side.
            Err(_) => Side::Seller,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl FromStr for NodeId {
    type Err = NetclearError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Self)
            .map_err(|_| NetclearError::InvalidNodeId { raw: s.to_string() })
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Partition of the market's node set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Seller,
    Buyer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seller => write!(f, "SELLER"),
            Self::Buyer => write!(f, "BUYER"),
        }
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// Unique identifier of one clearing run. Uses UUIDv7 for time-ordered sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
