//! Scoring functions for candidate trajectory sets.
//!
//! Both entry points take the dataset's scenarios, the candidates produced per
//! scenario and an ordered list of cutoffs `k`, and return one value per
//! (metric, k) pair. Only the first `k` candidates of each scenario count
//! towards the value for `k`.

mod displacement;
mod region;

pub use displacement::evaluate_ade_fde;
pub use region::evaluate_precision_recall;

use data_contracts::{PredictionSet, Scenario, ScenarioId};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Ade,
    Fde,
    Precision,
    Recall,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Ade => "ADE",
            MetricKind::Fde => "FDE",
            MetricKind::Precision => "Precision",
            MetricKind::Recall => "Recall",
        }
    }
}

/// A metric evaluated at a candidate cutoff, rendered as `ADE@5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub kind: MetricKind,
    pub k: usize,
}

impl MetricKey {
    pub fn new(kind: MetricKind, k: usize) -> Self {
        Self { kind, k }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind.as_str(), self.k)
    }
}

/// Metric values in the order they were computed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricMap {
    entries: Vec<(MetricKey, f64)>,
}

impl MetricMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite, keeping the original position of an existing key.
    pub fn insert(&mut self, key: MetricKey, value: f64) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &MetricKey) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn extend(&mut self, other: MetricMap) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetricKey, f64)> {
        self.entries.iter().map(|(k, v)| (k, *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &MetricKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum MetricError {
    #[error("no scenarios to evaluate")]
    EmptyDataset,
    #[error("candidate cutoff must be at least 1")]
    ZeroCutoff,
    #[error("no predictions for scenario {scenario}")]
    MissingPredictions { scenario: ScenarioId },
    #[error("scenario {scenario} has {found} candidates, {k} requested")]
    TooFewCandidates {
        scenario: ScenarioId,
        k: usize,
        found: usize,
    },
    #[error("scenario {scenario}: prediction has {found} steps, ground truth has {expected}")]
    HorizonMismatch {
        scenario: ScenarioId,
        expected: usize,
        found: usize,
    },
}

/// Check shapes once so the metric loops can index freely.
fn checked<'a>(
    scenarios: &'a [Scenario],
    preds: &'a PredictionSet,
    ks: &[usize],
) -> Result<Vec<(&'a Scenario, &'a [Vec<[f32; 2]>])>, MetricError> {
    if scenarios.is_empty() {
        return Err(MetricError::EmptyDataset);
    }
    if ks.contains(&0) {
        return Err(MetricError::ZeroCutoff);
    }
    let max_k = ks.iter().copied().max().unwrap_or(0);
    scenarios
        .iter()
        .map(|scenario| {
            let candidates = preds
                .get(&scenario.id)
                .ok_or(MetricError::MissingPredictions {
                    scenario: scenario.id,
                })?;
            if candidates.len() < max_k {
                return Err(MetricError::TooFewCandidates {
                    scenario: scenario.id,
                    k: max_k,
                    found: candidates.len(),
                });
            }
            let expected = scenario.future.len();
            if expected == 0 {
                return Err(MetricError::HorizonMismatch {
                    scenario: scenario.id,
                    expected,
                    found: 0,
                });
            }
            if let Some(bad) = candidates[..max_k].iter().find(|t| t.len() != expected) {
                return Err(MetricError::HorizonMismatch {
                    scenario: scenario.id,
                    expected,
                    found: bad.len(),
                });
            }
            Ok((scenario, candidates.as_slice()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_with_cutoff() {
        assert_eq!(MetricKey::new(MetricKind::Ade, 1).to_string(), "ADE@1");
        assert_eq!(MetricKey::new(MetricKind::Recall, 19).to_string(), "Recall@19");
    }

    #[test]
    fn map_keeps_insertion_order() {
        let mut m = MetricMap::new();
        m.insert(MetricKey::new(MetricKind::Fde, 2), 1.0);
        m.insert(MetricKey::new(MetricKind::Ade, 1), 2.0);
        m.insert(MetricKey::new(MetricKind::Fde, 2), 3.0);
        let keys: Vec<String> = m.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["FDE@2", "ADE@1"]);
        assert_eq!(m.get(&MetricKey::new(MetricKind::Fde, 2)), Some(3.0));
    }
}
