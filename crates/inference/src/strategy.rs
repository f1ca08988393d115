use data_contracts::{ModelConfig, ParseEnumError, WeightingTarget};
use std::fmt;
use std::str::FromStr;

/// How candidates are drawn from the generators of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionStrategy {
    /// Generator drawn from the prior per candidate, fresh noise each time.
    Sampling,
    /// Candidates allocated to generators in proportion to the prior.
    Expected,
    /// Expected allocation over confident generators, each led by its mode.
    SmartExpected,
    /// Oversample, then keep endpoint-diverse candidates (single-generator models).
    Rejection,
}

/// Strategies evaluated when every strategy is requested, in evaluation order.
pub const DEFAULT_STRATEGIES: [PredictionStrategy; 3] = [
    PredictionStrategy::SmartExpected,
    PredictionStrategy::Expected,
    PredictionStrategy::Sampling,
];

const STRATEGY_NAMES: &[&str] = &["sampling", "expected", "smart_expected", "rejection"];

impl PredictionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStrategy::Sampling => "sampling",
            PredictionStrategy::Expected => "expected",
            PredictionStrategy::SmartExpected => "smart_expected",
            PredictionStrategy::Rejection => "rejection",
        }
    }

    pub fn is_smart(&self) -> bool {
        self.as_str().starts_with("smart")
    }

    /// Strategies that make sense for a model with a single generator.
    pub fn supports_single_generator(&self) -> bool {
        matches!(self, PredictionStrategy::Sampling | PredictionStrategy::Rejection)
    }
}

impl fmt::Display for PredictionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionStrategy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sampling" => Ok(PredictionStrategy::Sampling),
            "expected" => Ok(PredictionStrategy::Expected),
            "smart_expected" => Ok(PredictionStrategy::SmartExpected),
            "rejection" => Ok(PredictionStrategy::Rejection),
            other => Err(ParseEnumError {
                kind: "prediction strategy",
                value: other.to_string(),
                expected: STRATEGY_NAMES,
            }),
        }
    }
}

/// Why a (model, strategy) unit is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    SingleGenerator,
    NoWeightingTarget,
}

impl fmt::Display for GateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateReason::SingleGenerator => {
                f.write_str("single-generator models only support sampling and rejection")
            }
            GateReason::NoWeightingTarget => {
                f.write_str("smart strategies need a weighting target")
            }
        }
    }
}

/// Admission rules applied once a model's config is known.
pub fn admits(config: &ModelConfig, strategy: PredictionStrategy) -> Result<(), GateReason> {
    if config.num_gens == 1 && !strategy.supports_single_generator() {
        return Err(GateReason::SingleGenerator);
    }
    if config.weighting_target == WeightingTarget::None && strategy.is_smart() {
        return Err(GateReason::NoWeightingTarget);
    }
    Ok(())
}
