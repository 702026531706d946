//! Error types for the netclear engine.
//!
//! All errors use the `NC_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation errors (market description)
//! - 2xx: Clearing errors
//! - 9xx: General errors (serialization, configuration, I/O)
//!
//! Terminal clearing outcomes (`STOPPED_MAX_ROUNDS`, `STOPPED_NO_PROGRESS`)
//! are not errors; they are reported through [`crate::ClearingState`].

use thiserror::Error;

use crate::NodeId;

/// Central error enum for all netclear operations.
#[derive(Debug, Error)]
pub enum NetclearError {
    // =================================================================
    // Input Validation Errors (1xx)
    // =================================================================
    /// The market description has no nodes at all.
    #[error("NC_ERR_100: Market graph is empty")]
    EmptyMarket,

    /// The node set cannot be split into `n` sellers and `n` buyers.
    #[error("NC_ERR_101: Market graph must have an even number of nodes (2n), got {count}")]
    OddNodeCount { count: usize },

    /// A node identifier is not coercible to an integer.
    #[error("NC_ERR_102: Invalid node id: {raw}")]
    InvalidNodeId { raw: String },

    /// The same node identifier appears twice.
    #[error("NC_ERR_103: Duplicate node: {0}")]
    DuplicateNode(NodeId),

    /// An edge references a node that is not in the node set.
    #[error("NC_ERR_104: Edge ({from},{to}) references unknown node {missing}")]
    UnknownNode {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },

    /// An edge joins two sellers or two buyers.
    #[error("NC_ERR_105: Edge ({from},{to}) does not join a buyer and a seller")]
    SameSideEdge { from: NodeId, to: NodeId },

    /// The buyer–seller pair already has an edge (in either orientation).
    #[error("NC_ERR_106: Duplicate edge between buyer {buyer} and seller {seller}")]
    DuplicateEdge { buyer: NodeId, seller: NodeId },

    /// A market edge carries no `valuation` attribute.
    #[error("NC_ERR_107: Edge ({buyer},{seller}) missing 'valuation' attribute")]
    MissingValuation { buyer: NodeId, seller: NodeId },

    /// A valuation is NaN or infinite.
    #[error("NC_ERR_108: Edge ({buyer},{seller}) has non-finite valuation {value}")]
    NonFiniteValuation {
        buyer: NodeId,
        seller: NodeId,
        value: f64,
    },

    /// A seller price is negative, NaN or infinite.
    #[error("NC_ERR_109: Seller {seller} has invalid price {value}")]
    InvalidPrice { seller: NodeId, value: f64 },

    /// A numeric attribute could not be read as a real number.
    #[error("NC_ERR_110: Attribute '{attribute}' is not numeric: {raw}")]
    NonNumericAttribute { attribute: String, raw: String },

    // =================================================================
    // Clearing Errors (2xx)
    // =================================================================
    /// The matching engine could not produce a matching.
    #[error("NC_ERR_200: Matching failed: {reason}")]
    MatchingFailed { reason: String },

    /// A matcher returned pairs that are not a matching of the preference graph.
    #[error("NC_ERR_201: Invalid matching: {reason}")]
    InvalidMatching { reason: String },

    /// A price update targeted a node that is not a seller.
    #[error("NC_ERR_202: Unknown seller: {0}")]
    UnknownSeller(NodeId),

    // =================================================================
    // General (9xx)
    // =================================================================
    /// Serialization / deserialization error.
    #[error("NC_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, out-of-range values, etc.).
    #[error("NC_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// I/O error (missing file, permission denied, ...).
    #[error("NC_ERR_903: I/O error: {0}")]
    Io(String),
}

impl NetclearError {
    /// Whether this error stems from the market description itself.
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyMarket
                | Self::OddNodeCount { .. }
                | Self::InvalidNodeId { .. }
                | Self::DuplicateNode(_)
                | Self::UnknownNode { .. }
                | Self::SameSideEdge { .. }
                | Self::DuplicateEdge { .. }
                | Self::MissingValuation { .. }
                | Self::NonFiniteValuation { .. }
                | Self::InvalidPrice { .. }
                | Self::NonNumericAttribute { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, NetclearError>;

// Conversion from std::io::Error
impl From<std::io::Error> for NetclearError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NetclearError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
