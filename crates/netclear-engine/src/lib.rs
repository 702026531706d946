//! # netclear-engine
//!
//! **Iterative market clearing on bipartite valuation graphs.**
//!
//! The engine is pure compute: it takes a [`MarketGraph`](netclear_types::MarketGraph),
//! raises seller prices round by round and reports the outcome. It has:
//!
//! - **No I/O**: loading and saving markets lives in `netclear-io`
//! - **Deterministic output**: same market and config, same prices and price root
//! - **Pluggable matching**: Hopcroft–Karp by default, augmenting paths as fallback
//! - **Monotone prices**: a price only ever goes up, and only when selected

pub mod controller;
pub mod determinism;
pub mod matching;
pub mod preference;
pub mod reachability;

pub use controller::MarketClearing;
pub use determinism::{compute_price_root, verify_price_root};
pub use matching::{AugmentingPath, BipartiteMatcher, HopcroftKarp, Matching, matcher_for};
pub use preference::{PreferenceGraph, build_preference_graph};
pub use reachability::{AlternatingGraph, constricted_sellers};
