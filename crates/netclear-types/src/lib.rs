//! # netclear-types
//!
//! Shared types, errors, and configuration for the **netclear** market
//! clearing engine.
//!
//! This crate is the leaf dependency of the workspace. Every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`NodeId`], [`Side`], [`RunId`]
//! - **Market model**: [`MarketGraph`], [`SellerState`], [`MarketEdge`]
//! - **Clearing lifecycle**: [`ClearingState`], [`SelectionTier`], [`RoundReport`], [`ClearingReport`]
//! - **Configuration**: [`ClearingConfig`], [`MatcherKind`]
//! - **Errors**: [`NetclearError`] with `NC_ERR_` prefix codes
//! - **Constants**: defaults and engine metadata

pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod market;
pub mod report;

// Re-export all primary types at crate root for ergonomic imports:
//   use netclear_types::{MarketGraph, NodeId, ClearingState, ...};

pub use config::*;
pub use error::*;
pub use ids::*;
pub use market::*;
pub use report::*;

// Constants are accessed via `netclear_types::constants::FOO`
// (not re-exported to avoid name collisions).
