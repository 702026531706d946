//! # netclear-io
//!
//! Reading and writing market descriptions.
//!
//! Markets are exchanged as node-link JSON: a `nodes` array whose entries
//! carry an `id` and an optional seller `price`, and a `links` array whose
//! entries join a `source` and a `target` with a `valuation`. Every other
//! attribute is carried through untouched, so a loaded document written
//! back after clearing differs only in its seller prices.
//!
//! ```text
//! load_document → GraphDocument::to_market → MarketClearing
//!     → GraphDocument::apply_prices → save_document
//! ```

pub mod document;
pub mod store;

pub use document::{EdgeRecord, GraphDocument, NodeRecord, parse_document};
pub use store::{load_document, load_market, save_document};
