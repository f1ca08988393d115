use clap::Parser;
use data_contracts::ModelConfig;
use eval_harness::{EvalArgs, Evaluator, FsDatasetSource, HarnessConfig, RunOptions};
use inference::{init_version_dir, resolve_device, BurnModelLoader, DeviceChoice};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn write_dataset(root: &Path) {
    let dir = root.join("stanford_synthetic").join("test");
    fs::create_dir_all(&dir).unwrap();
    let mut raw = String::new();
    for frame in 0..22 {
        let t = frame as f32;
        writeln!(raw, "{} 1 {:.2} {:.2}", frame * 10, t * 0.4, 0.1 * t).unwrap();
        writeln!(raw, "{} 2 {:.2} {:.2}", frame * 10, 5.0 - t * 0.3, -0.2 * t).unwrap();
    }
    fs::write(dir.join("scene.txt"), raw).unwrap();
}

fn write_models(root: &Path) {
    let device = resolve_device(DeviceChoice::Cpu);
    for (i, num_gens) in [3, 1].into_iter().enumerate() {
        let config = ModelConfig {
            name: format!("mg{num_gens}"),
            num_gens,
            noise_dim: 4,
            h_dim: 8,
            decoder_h_dim: 8,
            ..Default::default()
        };
        init_version_dir(&root.join(format!("version_{i}")), &config, &device).unwrap();
    }
}

fn run(models: &Path, data: &Path, out: &Path, extra: &[&str]) -> eval_harness::RunReport {
    let mut argv: Vec<String> = vec![
        "evaluate".into(),
        "--model_path".into(),
        models.display().to_string(),
        "--output_folder".into(),
        out.display().to_string(),
        "--data_root".into(),
        data.display().to_string(),
        "--phase".into(),
        "test".into(),
        "--device".into(),
        "cpu".into(),
        "--num_preds".into(),
        "4".into(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    let args = EvalArgs::try_parse_from(argv).unwrap();
    let options = RunOptions::resolve(&args, &HarnessConfig::default()).unwrap();
    let loader = BurnModelLoader::new(resolve_device(options.device));
    let datasets = FsDatasetSource::new(options.data_root.clone());
    Evaluator::new(loader, datasets, options).run().unwrap()
}

#[test]
fn evaluates_real_checkpoints_end_to_end() {
    let models = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_models(models.path());
    write_dataset(data.path());

    let report = run(models.path(), data.path(), out.path(), &[]);
    assert_eq!(report.rows, 4);
    assert_eq!(report.gated, 2);
    assert_eq!(report.fallbacks, 0);

    let text = fs::read_to_string(&report.output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    let header: Vec<&str> = lines[0].split(',').collect();
    let ade = header.iter().position(|c| *c == "ADE@3").unwrap();
    for line in &lines[1..] {
        let cells: Vec<&str> = line.split(',').collect();
        assert_eq!(cells.len(), header.len());
        let value: f64 = cells[ade].parse().unwrap();
        assert!(value.is_finite() && value >= 0.0);
    }
}

#[test]
fn rerun_with_missing_epoch_matches_best() {
    let models = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    write_models(models.path());
    write_dataset(data.path());

    let best_out = tempfile::tempdir().unwrap();
    let best = run(models.path(), data.path(), best_out.path(), &["--pred_strat", "expected"]);
    let epoch_out = tempfile::tempdir().unwrap();
    let epoch = run(
        models.path(),
        data.path(),
        epoch_out.path(),
        &["--pred_strat", "expected", "--checkpoint", "12"],
    );

    // Both directories resolve before gating drops the single-generator one.
    assert_eq!(epoch.fallbacks, 2);
    assert_eq!(best.rows, 1);
    assert_eq!(
        fs::read(&best.output).unwrap(),
        fs::read(&epoch.output).unwrap()
    );
}
