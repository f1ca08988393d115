use crate::{checked, MetricError, MetricKey, MetricKind, MetricMap};
use data_contracts::{distance, PredictionSet, Scenario};

/// Best-of-k average and final displacement error.
///
/// For each `k`, takes the minimum ADE and minimum FDE over the first `k`
/// candidates of every scenario and averages over scenarios. ADE is the mean
/// point-wise distance over the prediction horizon, FDE the distance at its
/// last step.
pub fn evaluate_ade_fde(
    scenarios: &[Scenario],
    preds: &PredictionSet,
    ks: &[usize],
) -> Result<MetricMap, MetricError> {
    let rows = checked(scenarios, preds, ks)?;
    let per_candidate: Vec<Vec<(f64, f64)>> = rows
        .iter()
        .map(|(scenario, candidates)| {
            candidates
                .iter()
                .map(|traj| displacement(&scenario.future, traj))
                .collect()
        })
        .collect();

    let n = rows.len() as f64;
    let mut ade = MetricMap::new();
    let mut fde = MetricMap::new();
    for &k in ks {
        let (mut ade_sum, mut fde_sum) = (0.0, 0.0);
        for errors in &per_candidate {
            let head = &errors[..k];
            ade_sum += head.iter().map(|e| e.0).fold(f64::INFINITY, f64::min);
            fde_sum += head.iter().map(|e| e.1).fold(f64::INFINITY, f64::min);
        }
        ade.insert(MetricKey::new(MetricKind::Ade, k), ade_sum / n);
        fde.insert(MetricKey::new(MetricKind::Fde, k), fde_sum / n);
    }
    ade.extend(fde);
    Ok(ade)
}

fn displacement(truth: &[[f32; 2]], pred: &[[f32; 2]]) -> (f64, f64) {
    let steps: Vec<f64> = truth
        .iter()
        .zip(pred)
        .map(|(a, b)| f64::from(distance(*a, *b)))
        .collect();
    let ade = steps.iter().sum::<f64>() / steps.len() as f64;
    (ade, steps.last().copied().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(id: usize) -> Scenario {
        Scenario {
            id,
            agent_id: 0,
            start_frame: 0,
            observed: vec![[0.0, 0.0]],
            future: vec![[1.0, 0.0], [2.0, 0.0]],
        }
    }

    #[test]
    fn best_of_k_uses_only_the_prefix() {
        let scenarios = vec![straight(0)];
        let mut preds = PredictionSet::new();
        preds.insert(
            0,
            vec![
                vec![[1.0, 2.0], [2.0, 2.0]],
                vec![[1.0, 0.0], [2.0, 1.0]],
            ],
        );
        let m = evaluate_ade_fde(&scenarios, &preds, &[1, 2]).unwrap();
        assert_eq!(m.get(&MetricKey::new(MetricKind::Ade, 1)), Some(2.0));
        assert_eq!(m.get(&MetricKey::new(MetricKind::Fde, 1)), Some(2.0));
        assert_eq!(m.get(&MetricKey::new(MetricKind::Ade, 2)), Some(0.5));
        assert_eq!(m.get(&MetricKey::new(MetricKind::Fde, 2)), Some(1.0));
        let keys: Vec<String> = m.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["ADE@1", "ADE@2", "FDE@1", "FDE@2"]);
    }

    #[test]
    fn averages_over_scenarios() {
        let scenarios = vec![straight(0), straight(1)];
        let mut preds = PredictionSet::new();
        preds.insert(0, vec![vec![[1.0, 0.0], [2.0, 0.0]]]);
        preds.insert(1, vec![vec![[1.0, 4.0], [2.0, 4.0]]]);
        let m = evaluate_ade_fde(&scenarios, &preds, &[1]).unwrap();
        assert_eq!(m.get(&MetricKey::new(MetricKind::Ade, 1)), Some(2.0));
    }
}
