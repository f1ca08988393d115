use data_contracts::{Phase, Split};
use std::fs;
use std::path::Path;
use traj_dataset::{get_dataloader, DatasetError, DatasetRequest};

/// Two agents walking for `frames` frames: agent 1 heads up (+y), agent 2 heads down.
fn write_crossing(root: &Path, dataset: &str, phase: &str, frames: i64) {
    let dir = root.join(dataset).join(phase);
    fs::create_dir_all(&dir).expect("create dataset dir");
    let mut lines = String::new();
    for f in 0..frames {
        let t = f as f32;
        lines.push_str(&format!("{}\t1\t{:.2}\t{:.2}\n", f * 10, t * 0.4, t * 0.3));
        lines.push_str(&format!("{}\t2\t{:.2}\t{:.2}\n", f * 10, 5.0 - t * 0.4, -t * 0.3));
    }
    fs::write(dir.join("crossing.txt"), lines).expect("write trajectories");
    // Non-txt files are ignored.
    fs::write(dir.join("README.md"), "notes").expect("write readme");
}

fn request(split: Split) -> DatasetRequest {
    DatasetRequest {
        batch_size: 3,
        split,
        obs_len: 3,
        pred_len: 2,
        ..DatasetRequest::new("crossing", Phase::Test)
    }
}

#[test]
fn loads_and_batches_all_windows() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_crossing(dir.path(), "crossing", "test", 7);

    let loader = get_dataloader(dir.path(), &request(Split::All)).expect("load dataset");
    // 7 frames, window of 5 -> 3 windows, 2 agents each.
    assert_eq!(loader.dataset().len(), 6);
    assert_eq!(loader.num_batches(), 2);
    let ids: Vec<usize> = loader.dataset().scenarios().iter().map(|s| s.id).collect();
    assert_eq!(ids, (0..6).collect::<Vec<_>>());
    let sizes: Vec<usize> = loader.batches().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![3, 3]);
    let first = &loader.dataset().scenarios()[0];
    assert_eq!(first.observed.len(), 3);
    assert_eq!(first.future.len(), 2);
}

#[test]
fn split_filter_partitions_scenarios() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_crossing(dir.path(), "crossing", "test", 7);

    let upper = get_dataloader(dir.path(), &request(Split::Upper)).expect("upper");
    let lower = get_dataloader(dir.path(), &request(Split::Lower)).expect("lower");
    assert_eq!(upper.dataset().len(), 3);
    assert_eq!(lower.dataset().len(), 3);
    assert!(upper.dataset().scenarios().iter().all(|s| s.agent_id == 1));
    assert!(lower.dataset().scenarios().iter().all(|s| s.agent_id == 2));
    // Ids are re-densified after filtering.
    assert_eq!(lower.dataset().scenarios()[2].id, 2);
}

#[test]
fn missing_phase_directory_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_crossing(dir.path(), "crossing", "train", 7);
    let err = get_dataloader(dir.path(), &request(Split::All)).unwrap_err();
    assert!(matches!(err, DatasetError::MissingDirectory { .. }));
}

#[test]
fn malformed_file_reports_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    let phase_dir = dir.path().join("crossing").join("test");
    fs::create_dir_all(&phase_dir).expect("create dir");
    fs::write(phase_dir.join("bad.txt"), "0 1 0 0\n10 1 oops 0\n").expect("write");
    match get_dataloader(dir.path(), &request(Split::All)) {
        Err(DatasetError::Parse { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected parse error, got {other:?}"),
    }
}
