use data_contracts::{ModelConfig, Scenario};
use inference::prelude::*;
use inference::{init_version_dir, InferenceError};

fn load(num_gens: usize) -> (tempfile::TempDir, ModelInstance) {
    let dir = tempfile::tempdir().unwrap();
    let model_dir = dir.path().join("version_0");
    let config = ModelConfig {
        num_gens,
        noise_dim: 4,
        h_dim: 8,
        decoder_h_dim: 8,
        ..Default::default()
    };
    let device = resolve_device(DeviceChoice::Cpu);
    init_version_dir(&model_dir, &config, &device).unwrap();
    let (model, _) = BurnModelLoader::new(device)
        .load_from_path(&model_dir, &CheckpointId::Best)
        .unwrap();
    (dir, model)
}

fn scenarios(n: usize) -> Vec<Scenario> {
    (0..n)
        .map(|id| Scenario {
            id,
            agent_id: id as u64,
            start_frame: id as i64 * 10,
            observed: (0..8).map(|t| [t as f32 * 0.3, -(id as f32)]).collect(),
            future: (8..20).map(|t| [t as f32 * 0.3, -(id as f32)]).collect(),
        })
        .collect()
}

#[test]
fn every_strategy_returns_k_candidates_over_the_horizon() {
    let (_dir, model) = load(3);
    let input = scenarios(5);
    let settings = InferenceSettings {
        batch_size: 2,
        ..Default::default()
    };
    for strategy in [
        PredictionStrategy::Sampling,
        PredictionStrategy::Expected,
        PredictionStrategy::SmartExpected,
        PredictionStrategy::Rejection,
    ] {
        let preds = model.predict(&input, 7, strategy, &settings).unwrap();
        assert_eq!(preds.len(), 5, "{strategy}");
        for candidates in preds.values() {
            assert_eq!(candidates.len(), 7, "{strategy}");
            assert!(candidates.iter().all(|t| t.len() == 12));
        }
    }
}

#[test]
fn predictions_repeat_for_a_fixed_seed() {
    let (_dir, model) = load(2);
    let input = scenarios(3);
    let settings = InferenceSettings {
        seed: 11,
        ..Default::default()
    };
    let a = model.predict(&input, 4, PredictionStrategy::Sampling, &settings).unwrap();
    let b = model.predict(&input, 4, PredictionStrategy::Sampling, &settings).unwrap();
    assert_eq!(a, b);

    let other = InferenceSettings { seed: 12, ..settings };
    let c = model.predict(&input, 4, PredictionStrategy::Sampling, &other).unwrap();
    assert_ne!(a, c);
}

#[test]
fn batch_size_does_not_change_results() {
    let (_dir, model) = load(3);
    let input = scenarios(6);
    let one = InferenceSettings {
        batch_size: 1,
        ..Default::default()
    };
    let all = InferenceSettings {
        batch_size: 64,
        ..Default::default()
    };
    let a = model.predict(&input, 5, PredictionStrategy::Expected, &one).unwrap();
    let b = model.predict(&input, 5, PredictionStrategy::Expected, &all).unwrap();
    for (id, cands) in &a {
        for (x, y) in cands.iter().zip(&b[id]) {
            for (p, q) in x.iter().zip(y) {
                assert!((p[0] - q[0]).abs() < 1e-5 && (p[1] - q[1]).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn expected_prefixes_are_stable() {
    let (_dir, model) = load(3);
    let input = scenarios(2);
    let settings = InferenceSettings::default();
    let short = model.predict(&input, 3, PredictionStrategy::Expected, &settings).unwrap();
    let long = model.predict(&input, 9, PredictionStrategy::Expected, &settings).unwrap();
    for (id, cands) in &short {
        for (x, y) in cands.iter().zip(&long[id]) {
            for (p, q) in x.iter().zip(y) {
                assert!((p[0] - q[0]).abs() < 1e-5 && (p[1] - q[1]).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn rejects_bad_inputs() {
    let (_dir, model) = load(1);
    let settings = InferenceSettings::default();
    let mut input = scenarios(1);
    assert!(matches!(
        model.predict(&input, 0, PredictionStrategy::Sampling, &settings),
        Err(InferenceError::InvalidCandidateCount(0))
    ));
    input[0].observed.pop();
    assert!(matches!(
        model.predict(&input, 3, PredictionStrategy::Sampling, &settings),
        Err(InferenceError::HistoryLength { expected: 8, found: 7, .. })
    ));
}
