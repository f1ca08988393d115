use crate::{checked, MetricError, MetricKey, MetricKind, MetricMap};
use data_contracts::{distance, PredictionSet, Scenario};

/// Endpoint precision and recall within `radius` of the ground-truth endpoint.
///
/// Precision@k is the share of all first-`k` candidate endpoints that land
/// inside the radius; Recall@k is the share of scenarios with at least one such
/// candidate.
pub fn evaluate_precision_recall(
    scenarios: &[Scenario],
    preds: &PredictionSet,
    radius: f64,
    ks: &[usize],
) -> Result<MetricMap, MetricError> {
    let rows = checked(scenarios, preds, ks)?;
    let hits: Vec<Vec<bool>> = rows
        .iter()
        .map(|(scenario, candidates)| {
            let goal = scenario.endpoint().unwrap_or([0.0, 0.0]);
            candidates
                .iter()
                .map(|traj| {
                    traj.last()
                        .is_some_and(|end| f64::from(distance(*end, goal)) <= radius)
                })
                .collect()
        })
        .collect();

    let n = rows.len() as f64;
    let mut precision = MetricMap::new();
    let mut recall = MetricMap::new();
    for &k in ks {
        let mut inside = 0usize;
        let mut covered = 0usize;
        for flags in &hits {
            let count = flags[..k].iter().filter(|&&hit| hit).count();
            inside += count;
            covered += usize::from(count > 0);
        }
        precision.insert(
            MetricKey::new(MetricKind::Precision, k),
            inside as f64 / (n * k as f64),
        );
        recall.insert(MetricKey::new(MetricKind::Recall, k), covered as f64 / n);
    }
    precision.extend(recall);
    Ok(precision)
}
