//! The node-link document model and its conversion to a [`MarketGraph`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use netclear_types::{MarketGraph, NetclearError, NodeId, Result};

/// Node attribute holding a seller's price.
pub const PRICE_ATTRIBUTE: &str = "price";
/// Edge attribute holding a buyer's valuation.
pub const VALUATION_ATTRIBUTE: &str = "valuation";

/// A node-link graph description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    /// Graph-level attributes.
    #[serde(default)]
    pub graph: Map<String, Value>,
    pub nodes: Vec<NodeRecord>,
    #[serde(default, alias = "edges")]
    pub links: Vec<EdgeRecord>,
    /// Unrecognised top-level keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Integer or integer-valued string.
    pub id: Value,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// One entry of `links`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: Value,
    pub target: Value,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Parse a document from JSON text.
///
/// # Errors
/// `Serialization` if the text is not a node-link document.
pub fn parse_document(text: &str) -> Result<GraphDocument> {
    Ok(serde_json::from_str(text)?)
}

fn node_id(raw: &Value) -> Result<NodeId> {
    let invalid = || NetclearError::InvalidNodeId {
        raw: raw.to_string(),
    };
    match raw {
        Value::Number(num) => num.as_i64().map(NodeId).ok_or_else(invalid),
        Value::String(s) => s.parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// A numeric attribute: JSON number, numeric string, or absent / `null`.
fn numeric(attributes: &Map<String, Value>, name: &str) -> Result<Option<f64>> {
    let non_numeric = |raw: &Value| NetclearError::NonNumericAttribute {
        attribute: name.to_string(),
        raw: raw.to_string(),
    };
    match attributes.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(raw @ Value::Number(num)) => num.as_f64().map(Some).ok_or_else(|| non_numeric(raw)),
        Some(raw @ Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| non_numeric(raw)),
        Some(raw) => Err(non_numeric(raw)),
    }
}

impl NodeRecord {
    /// # Errors
    /// `InvalidNodeId` if `id` is not an integer.
    pub fn node_id(&self) -> Result<NodeId> {
        node_id(&self.id)
    }

    /// The `price` attribute, if present.
    pub fn price(&self) -> Result<Option<f64>> {
        numeric(&self.attributes, PRICE_ATTRIBUTE)
    }
}

impl EdgeRecord {
    /// The `(source, target)` endpoints.
    pub fn endpoints(&self) -> Result<(NodeId, NodeId)> {
        Ok((node_id(&self.source)?, node_id(&self.target)?))
    }

    /// The `valuation` attribute, if present.
    pub fn valuation(&self) -> Result<Option<f64>> {
        numeric(&self.attributes, VALUATION_ATTRIBUTE)
    }
}

impl GraphDocument {
    /// Build the market this document describes.
    ///
    /// # Errors
    /// Any node, edge or partition error of [`MarketGraph`], plus
    /// `InvalidNodeId` and `NonNumericAttribute` for unparsable values.
    pub fn to_market(&self) -> Result<MarketGraph> {
        let nodes = self
            .nodes
            .iter()
            .map(|node| Ok((node.node_id()?, node.price()?)))
            .collect::<Result<Vec<_>>>()?;
        let mut market = MarketGraph::new(nodes)?;

        for edge in &self.links {
            let (source, target) = edge.endpoints()?;
            market.insert_edge(source, target, edge.valuation()?)?;
        }

        tracing::debug!(
            nodes = market.node_count(),
            sellers = market.seller_count(),
            edges = market.edge_count(),
            "Market built from document"
        );
        Ok(market)
    }

    /// Write every seller's current price from `market` into its node record.
    ///
    /// Buyer nodes and all other attributes are left as they are.
    ///
    /// # Errors
    /// `InvalidNodeId` if a node id cannot be parsed.
    pub fn apply_prices(&mut self, market: &MarketGraph) -> Result<()> {
        for node in &mut self.nodes {
            if let Some(price) = market.price(node.node_id()?) {
                node.attributes
                    .insert(PRICE_ATTRIBUTE.to_string(), Value::from(price));
            }
        }
        Ok(())
    }
}
