//! Price digest for reproducibility checks.
//!
//! Clearing is deterministic: the same market and config always end at the
//! same prices. The `price_root` is a SHA-256 over the final seller prices
//! that lets two runs be compared without diffing full graphs.

use netclear_types::{MarketGraph, constants};
use sha2::{Digest, Sha256};

/// Compute the price root of a market.
///
/// Depends on:
/// - The number of sellers
/// - Each seller id, in id order
/// - The exact bit pattern of each price
#[must_use]
pub fn compute_price_root(market: &MarketGraph) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(constants::PRICE_ROOT_DOMAIN);
    hasher.update((market.seller_count() as u64).to_le_bytes());

    for (seller, price) in market.prices() {
        hasher.update(seller.get().to_le_bytes());
        hasher.update(price.to_bits().to_le_bytes());
    }

    hasher.finalize().into()
}

/// Verify that a market's prices hash to `expected_root`.
#[must_use]
pub fn verify_price_root(market: &MarketGraph, expected_root: &[u8; 32]) -> bool {
    compute_price_root(market) == *expected_root
}

#[cfg(test)]
mod tests {
    use netclear_types::NodeId;

    use super::*;

    #[test]
    fn same_prices_same_root() {
        let a = MarketGraph::dummy(&[1.0, 2.0], &[(2, 0, 3.0)]);
        let b = MarketGraph::dummy(&[1.0, 2.0], &[(3, 1, 9.0)]);
        assert_eq!(compute_price_root(&a), compute_price_root(&b));
    }

    #[test]
    fn price_change_changes_root() {
        let mut market = MarketGraph::dummy(&[0.0, 0.0], &[]);
        let before = compute_price_root(&market);
        market.raise_price(NodeId(1), 1.0).unwrap();
        assert_ne!(before, compute_price_root(&market));
    }

    #[test]
    fn seller_identity_matters() {
        let a = MarketGraph::dummy(&[1.0, 0.0], &[]);
        let b = MarketGraph::dummy(&[0.0, 1.0], &[]);
        assert_ne!(compute_price_root(&a), compute_price_root(&b));
    }

    #[test]
    fn verify_correct_and_wrong_root() {
        let market = MarketGraph::dummy(&[3.0], &[]);
        let root = compute_price_root(&market);
        assert!(verify_price_root(&market, &root));
        assert!(!verify_price_root(&market, &[0xAB; 32]));
    }
}
