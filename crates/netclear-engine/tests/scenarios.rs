//! End-to-end clearing runs on small hand-built markets.

use netclear_engine::{MarketClearing, compute_price_root, verify_price_root};
use netclear_types::{
    ClearingConfig, ClearingState, MarketGraph, NetclearError, NodeId, SelectionTier,
};

fn config(max_rounds: u32) -> ClearingConfig {
    ClearingConfig {
        max_rounds,
        record_rounds: true,
        ..ClearingConfig::default()
    }
}

fn run(market: MarketGraph, max_rounds: u32) -> (netclear_types::ClearingReport, MarketGraph) {
    let mut clearing = MarketClearing::new(market, config(max_rounds)).unwrap();
    let report = clearing.run().unwrap();
    (report, clearing.into_market())
}

#[test]
fn two_buyers_two_sellers_clear_with_perfect_matching() {
    // Buyer 2 values seller 0 at 5; buyer 3 values seller 0 at 5 and seller 1 at 1.
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 5.0), (3, 1, 1.0)]);
    let (report, market) = run(market, 100);

    assert_eq!(report.state, ClearingState::Cleared);
    assert_eq!(report.rounds, 1);
    assert_eq!(
        report.matching,
        vec![(NodeId(2), NodeId(0)), (NodeId(3), NodeId(1))]
    );
    assert_eq!(report.final_prices, vec![(NodeId(0), 0.0), (NodeId(1), 0.0)]);
    assert_eq!(market.price(NodeId(0)), Some(0.0));
}

#[test]
fn isolated_buyer_never_blocks_clearing() {
    // Buyer 5 has no edges at all.
    let market = MarketGraph::dummy(
        &[0.0, 0.0, 0.0],
        &[(3, 0, 4.0), (4, 1, 4.0), (4, 2, 2.0)],
    );
    let (report, _) = run(market, 100);

    assert_eq!(report.state, ClearingState::Cleared);
    let last = report.history.last().unwrap();
    assert!(last.inactive_buyers.contains(&NodeId(5)));
    assert!(!last.active_buyers.contains(&NodeId(5)));
    assert!(report.matching.iter().all(|(b, _)| *b != NodeId(5)));
}

#[test]
fn zero_valuations_clear_immediately() {
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 0.0), (2, 1, 0.0), (3, 1, 0.0)]);
    let (report, _) = run(market, 100);

    assert_eq!(report.state, ClearingState::Cleared);
    assert_eq!(report.rounds, 1);
    assert!(report.matching.is_empty());
    assert!(report.history[0].active_buyers.is_empty());
}

#[test]
fn odd_node_count_fails_before_any_round() {
    let err = MarketGraph::new((0..3).map(|i| (NodeId(i), None))).unwrap_err();
    assert!(matches!(err, NetclearError::OddNodeCount { count: 3 }));
    assert!(err.is_input_error());
}

#[test]
fn valuations_at_or_below_price_clear_trivially() {
    let market = MarketGraph::dummy(&[5.0, 3.0], &[(2, 0, 5.0), (3, 0, 4.0), (3, 1, 3.0)]);
    let (report, _) = run(market, 100);

    assert_eq!(report.state, ClearingState::Cleared);
    assert_eq!(report.rounds, 1);
    assert!(report.matching.is_empty());
    assert_eq!(report.final_prices, vec![(NodeId(0), 5.0), (NodeId(1), 3.0)]);
}

#[test]
fn contention_for_one_seller_raises_the_other_until_ceiling() {
    // Both buyers want only seller 0. Every seller reached from the free
    // buyer is seller 0, so seller 1 takes the raise each round.
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 3.0)]);
    let (report, market) = run(market, 25);

    assert_eq!(report.state, ClearingState::StoppedMaxRounds);
    assert_eq!(report.rounds, 25);
    assert_eq!(market.price(NodeId(0)), Some(0.0));
    assert_eq!(market.price(NodeId(1)), Some(25.0));
    assert!(
        report
            .history
            .iter()
            .all(|r| r.selection == Some(SelectionTier::Constricted) && r.raised == [NodeId(1)])
    );
}

#[test]
fn single_seller_many_buyers_stops_without_progress() {
    let market = MarketGraph::from_parts(
        [0, 4, 5, 6].map(|i| (NodeId(i), None)),
        vec![
            (NodeId(4), NodeId(0), Some(3.0)),
            (NodeId(5), NodeId(0), Some(2.0)),
            (NodeId(6), NodeId(0), Some(1.0)),
        ],
    )
    .unwrap();
    let (report, _) = run(market, 100);

    assert_eq!(report.state, ClearingState::StoppedNoProgress);
    assert_eq!(report.history[0].free_buyers, vec![NodeId(5), NodeId(6)]);
    assert!(report.history[0].raised.is_empty());
}

#[test]
fn round_reports_render_for_interactive_use() {
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 3.0)]);
    let mut clearing = MarketClearing::new(market, config(2)).unwrap();
    let mut rendered = Vec::new();
    clearing.run_with(|r| rendered.push(r.to_string())).unwrap();

    assert_eq!(rendered.len(), 2);
    assert!(rendered[0].starts_with("--- Round 1 ---"));
    assert!(rendered[0].contains("Constricted sellers: [1]"));
    assert!(rendered[1].contains("[Prices] 0:0, 1:1"));
    assert!(rendered[1].ends_with("Outcome: STOPPED_MAX_ROUNDS"));
}

#[test]
fn history_is_empty_unless_recorded() {
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 3.0)]);
    let cfg = ClearingConfig {
        max_rounds: 3,
        ..ClearingConfig::default()
    };
    let mut clearing = MarketClearing::new(market, cfg).unwrap();
    let report = clearing.run().unwrap();
    assert!(report.history.is_empty());
    assert_eq!(report.rounds, 3);
    assert_eq!(clearing.last_round().unwrap().round, 3);
}

#[test]
fn identical_runs_share_a_price_root() {
    let build = || MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 3.0)]);
    let (a, market_a) = run(build(), 7);
    let (b, _) = run(build(), 7);

    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.price_root, b.price_root);
    assert_eq!(a.final_prices, b.final_prices);
    assert!(verify_price_root(&market_a, &compute_price_root(&market_a)));
}

#[test]
fn report_serializes_states_in_upper_snake_case() {
    let market = MarketGraph::dummy(&[0.0, 0.0], &[(2, 0, 5.0), (3, 0, 3.0)]);
    let (report, _) = run(market, 1);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["state"], "STOPPED_MAX_ROUNDS");
    assert_eq!(json["history"][0]["selection"], "constricted");
}
