//! Configuration for a clearing run.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{NetclearError, Result, constants};

/// Which maximum-matching algorithm the controller tries first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatcherKind {
    /// Hopcroft–Karp: shortest augmenting paths in phases.
    #[default]
    HopcroftKarp,
    /// One augmenting-path search per top node (Kuhn's algorithm).
    AugmentingPath,
}

impl fmt::Display for MatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HopcroftKarp => write!(f, "hopcroft-karp"),
            Self::AugmentingPath => write!(f, "augmenting-path"),
        }
    }
}

impl FromStr for MatcherKind {
    type Err = NetclearError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hopcroft-karp" => Ok(Self::HopcroftKarp),
            "augmenting-path" => Ok(Self::AugmentingPath),
            other => Err(NetclearError::Configuration(format!(
                "unknown matcher '{other}' (expected hopcroft-karp or augmenting-path)"
            ))),
        }
    }
}

/// Tunables for the market-clearing controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearingConfig {
    /// Rounds executed before the run stops with `STOPPED_MAX_ROUNDS`.
    pub max_rounds: u32,
    /// Amount added to every selected seller's price per round.
    pub price_increment: f64,
    /// Primary matching algorithm.
    pub matcher: MatcherKind,
    /// Keep every round's report in the final [`crate::ClearingReport`].
    pub record_rounds: bool,
}

impl Default for ClearingConfig {
    fn default() -> Self {
        Self {
            max_rounds: constants::DEFAULT_MAX_ROUNDS,
            price_increment: constants::DEFAULT_PRICE_INCREMENT,
            matcher: MatcherKind::default(),
            record_rounds: false,
        }
    }
}

impl ClearingConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| NetclearError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the controller cannot make progress with.
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(NetclearError::Configuration(
                "max_rounds must be at least 1".into(),
            ));
        }
        if !self.price_increment.is_finite() || self.price_increment <= 0.0 {
            return Err(NetclearError::Configuration(format!(
                "price_increment must be positive and finite, got {}",
                self.price_increment
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearing_config_defaults() {
        let cfg = ClearingConfig::default();
        assert_eq!(cfg.max_rounds, 10_000);
        assert!((cfg.price_increment - 1.0).abs() < f64::EPSILON);
        assert_eq!(cfg.matcher, MatcherKind::HopcroftKarp);
        assert!(!cfg.record_rounds);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = ClearingConfig::from_json(r#"{ "max_rounds": 50 }"#).unwrap();
        assert_eq!(cfg.max_rounds, 50);
        assert_eq!(cfg.matcher, MatcherKind::HopcroftKarp);
    }

    #[test]
    fn matcher_kind_from_json() {
        let cfg = ClearingConfig::from_json(r#"{ "matcher": "augmenting-path" }"#).unwrap();
        assert_eq!(cfg.matcher, MatcherKind::AugmentingPath);
    }

    #[test]
    fn rejects_zero_rounds_and_bad_increment() {
        assert!(ClearingConfig::from_json(r#"{ "max_rounds": 0 }"#).is_err());
        assert!(ClearingConfig::from_json(r#"{ "price_increment": 0.0 }"#).is_err());
        assert!(ClearingConfig::from_json(r#"{ "price_increment": -2.5 }"#).is_err());
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = ClearingConfig::from_json("{ not json").unwrap_err();
        assert!(format!("{err}").starts_with("NC_ERR_902"));
    }

    #[test]
    fn matcher_kind_parse_and_display() {
        for kind in [MatcherKind::HopcroftKarp, MatcherKind::AugmentingPath] {
            assert_eq!(kind.to_string().parse::<MatcherKind>().unwrap(), kind);
        }
        assert!("greedy".parse::<MatcherKind>().is_err());
    }

    #[test]
    fn clearing_config_serde_roundtrip() {
        let cfg = ClearingConfig {
            max_rounds: 12,
            price_increment: 0.5,
            matcher: MatcherKind::AugmentingPath,
            record_rounds: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ClearingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
