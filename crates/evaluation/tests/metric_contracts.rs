use data_contracts::{PredictionSet, Scenario, Trajectory};
use evaluation::{evaluate_ade_fde, evaluate_precision_recall, MetricError};

fn scenarios(n: usize) -> Vec<Scenario> {
    (0..n)
        .map(|id| Scenario {
            id,
            agent_id: id as u64,
            start_frame: 0,
            observed: vec![[0.0, 0.0]; 8],
            future: (1..=12).map(|t| [t as f32, id as f32]).collect(),
        })
        .collect()
}

fn jittered(scenarios: &[Scenario], k: usize) -> PredictionSet {
    scenarios
        .iter()
        .map(|s| {
            let candidates: Vec<Trajectory> = (0..k)
                .map(|j| s.future.iter().map(|p| [p[0], p[1] + j as f32]).collect())
                .collect();
            (s.id, candidates)
        })
        .collect()
}

#[test]
fn one_entry_per_metric_and_cutoff() {
    let data = scenarios(4);
    let preds = jittered(&data, 3);
    let ks = [1, 2, 3];

    let ade_fde = evaluate_ade_fde(&data, &preds, &ks).unwrap();
    assert_eq!(ade_fde.len(), 6);
    let pr = evaluate_precision_recall(&data, &preds, 3.0, &ks).unwrap();
    assert_eq!(pr.len(), 6);

    let mut names: Vec<String> = ade_fde
        .keys()
        .chain(pr.keys())
        .map(ToString::to_string)
        .collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 12);
    assert!(names.contains(&"Precision@2".to_string()));
}

#[test]
fn exact_prediction_scores_zero_error_and_full_recall() {
    let data = scenarios(2);
    let preds = jittered(&data, 2);
    let m = evaluate_ade_fde(&data, &preds, &[1]).unwrap();
    assert!(m.iter().all(|(_, v)| v == 0.0));
    let pr = evaluate_precision_recall(&data, &preds, 0.5, &[2]).unwrap();
    assert!(pr.iter().any(|(k, v)| k.to_string() == "Precision@2" && v == 0.5));
    assert!(pr.iter().any(|(k, v)| k.to_string() == "Recall@2" && v == 1.0));
}

#[test]
fn reports_shape_errors() {
    let data = scenarios(2);
    let mut preds = jittered(&data, 2);
    assert_eq!(
        evaluate_ade_fde(&data, &preds, &[3]),
        Err(MetricError::TooFewCandidates {
            scenario: 0,
            k: 3,
            found: 2
        })
    );
    assert_eq!(
        evaluate_ade_fde(&[], &preds, &[1]),
        Err(MetricError::EmptyDataset)
    );
    preds.get_mut(&1).unwrap()[0].pop();
    assert_eq!(
        evaluate_precision_recall(&data, &preds, 1.0, &[1]),
        Err(MetricError::HorizonMismatch {
            scenario: 1,
            expected: 12,
            found: 11
        })
    );
    preds.remove(&0);
    assert_eq!(
        evaluate_ade_fde(&data, &preds, &[1]),
        Err(MetricError::MissingPredictions { scenario: 0 })
    );
}
