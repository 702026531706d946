//! `netclear`: clear a market described as node-link JSON.
//!
//! Exit status: `0` cleared, `1` error, `2` round ceiling reached,
//! `3` stopped without progress.

mod logging;

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use netclear_engine::MarketClearing;
use netclear_io::{load_document, save_document};
use netclear_types::{ClearingConfig, ClearingReport, ClearingState, MatcherKind, constants};

#[derive(Debug, Parser)]
#[command(name = "netclear", version = constants::VERSION)]
#[command(about = "Market clearing on a bipartite buyer/seller valuation graph", long_about = None)]
struct Cli {
    /// Market description (node-link JSON)
    market: PathBuf,

    /// Print every round's matching, buyers and prices
    #[arg(short, long)]
    interactive: bool,

    /// Write the market with its final prices to this path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the clearing report as JSON to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Clearing configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Round ceiling, overriding the config file
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Matching engine, overriding the config file
    #[arg(long)]
    matcher: Option<MatcherKind>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn clearing_config(&self) -> Result<ClearingConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                ClearingConfig::from_json(&text)
                    .with_context(|| format!("loading config {}", path.display()))?
            }
            None => ClearingConfig::default(),
        };

        if let Some(max_rounds) = self.max_rounds {
            config.max_rounds = max_rounds;
        }
        if let Some(matcher) = self.matcher {
            config.matcher = matcher;
        }
        if self.report.is_some() {
            config.record_rounds = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn exit_code(state: ClearingState) -> u8 {
    match state {
        ClearingState::Cleared => 0,
        ClearingState::StoppedMaxRounds => 2,
        ClearingState::StoppedNoProgress => 3,
        ClearingState::Running => 1,
    }
}

fn print_final_prices(report: &ClearingReport) {
    println!("[FINAL PRICES]");
    for (seller, price) in &report.final_prices {
        println!("Seller {seller}: price = {price}");
    }
}

fn run(cli: &Cli) -> Result<ClearingState> {
    let config = cli.clearing_config()?;

    let mut doc = load_document(&cli.market)?;
    let market = doc
        .to_market()
        .with_context(|| format!("building market from {}", cli.market.display()))?;

    let mut clearing = MarketClearing::new(market, config)?;
    let report = if cli.interactive {
        clearing.run_with(|round| println!("{round}\n"))?
    } else {
        clearing.run()?
    };

    if !report.state.is_cleared() {
        tracing::warn!(state = %report.state, rounds = report.rounds, "Market did not clear");
    }

    if cli.interactive {
        print_final_prices(&report);
    } else {
        println!(
            "{} after {} round(s), price root {}",
            report.state, report.rounds, report.price_root
        );
    }

    if let Some(path) = &cli.output {
        doc.apply_prices(clearing.market())?;
        save_document(path, &doc)?;
        tracing::info!(path = %path.display(), "Market written");
    }
    if let Some(path) = &cli.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("writing report {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(report.state)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(&cli.log_level, cli.log_json) {
        eprintln!("[ERROR] {err:#}");
        return ExitCode::from(1);
    }

    match run(&cli) {
        Ok(state) => ExitCode::from(exit_code(state)),
        Err(err) => {
            tracing::error!(error = %err, "Clearing failed");
            eprintln!("[ERROR] {err:#}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["netclear", "market.json"]).unwrap();
        assert_eq!(cli.market, PathBuf::from("market.json"));
        assert!(!cli.interactive);
        assert_eq!(cli.log_level, "warn");

        let config = cli.clearing_config().unwrap();
        assert_eq!(config, ClearingConfig::default());
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = Cli::try_parse_from([
            "netclear",
            "market.json",
            "--interactive",
            "--max-rounds",
            "50",
            "--matcher",
            "augmenting-path",
            "--report",
            "report.json",
        ])
        .unwrap();
        let config = cli.clearing_config().unwrap();

        assert!(cli.interactive);
        assert_eq!(config.max_rounds, 50);
        assert_eq!(config.matcher, MatcherKind::AugmentingPath);
        assert!(config.record_rounds);
    }

    #[test]
    fn zero_round_ceiling_is_rejected() {
        let cli = Cli::try_parse_from(["netclear", "m.json", "--max-rounds", "0"]).unwrap();
        assert!(cli.clearing_config().is_err());
    }

    #[test]
    fn unknown_matcher_is_a_parse_error() {
        assert!(Cli::try_parse_from(["netclear", "m.json", "--matcher", "greedy"]).is_err());
    }

    #[test]
    fn market_path_is_required() {
        assert!(Cli::try_parse_from(["netclear"]).is_err());
    }

    #[test]
    fn exit_codes_follow_state() {
        assert_eq!(exit_code(ClearingState::Cleared), 0);
        assert_eq!(exit_code(ClearingState::StoppedMaxRounds), 2);
        assert_eq!(exit_code(ClearingState::StoppedNoProgress), 3);
    }
}
