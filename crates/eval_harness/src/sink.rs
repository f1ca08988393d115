//! CSV result file, rewritten in full after every row.

use crate::aggregator::{ResultRow, ResultSchema};
use crate::args::StrategySelection;
use data_contracts::{Phase, Split};
use inference::CheckpointId;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("row has {found} cells, table has {expected} columns")]
    Width { expected: usize, found: usize },
}

/// `<folder>/<model>_<phase>_<checkpoint>_<split>_<pred_strat>_radius_<radius>.csv`
pub fn output_path(
    output_folder: &Path,
    model_root: &Path,
    phase: Phase,
    checkpoint: &CheckpointId,
    split: Split,
    selection: StrategySelection,
    radius: f64,
) -> PathBuf {
    let model = model_root
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output_folder.join(format!(
        "{model}_{phase}_{checkpoint}_{split}_{}_radius_{radius:?}.csv",
        selection.as_str()
    ))
}

#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    header: Vec<String>,
    rows: Vec<ResultRow>,
}

impl ResultSink {
    /// Nothing is written until the first row arrives.
    pub fn new(path: impl Into<PathBuf>, schema: &ResultSchema) -> Self {
        Self {
            path: path.into(),
            header: schema.columns().to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Add a row and rewrite the whole table.
    pub fn append(&mut self, row: ResultRow) -> Result<(), SinkError> {
        if row.cells().len() != self.header.len() {
            return Err(SinkError::Width {
                expected: self.header.len(),
                found: row.cells().len(),
            });
        }
        self.rows.push(row);
        self.flush()
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        atomic_write(&self.path, self.render().as_bytes()).map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), rows = self.rows.len(), "results written");
        Ok(())
    }

    /// The first column is an unnamed 0-based row index, as pandas writes it.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let header = std::iter::once("").chain(self.header.iter().map(String::as_str));
        push_record(&mut out, header);
        for (index, row) in self.rows.iter().enumerate() {
            let cells: Vec<String> = std::iter::once(index.to_string())
                .chain(row.cells().iter().map(ToString::to_string))
                .collect();
            push_record(&mut out, cells.iter().map(String::as_str));
        }
        out
    }
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

/// Write to a temp file next to `path`, sync, then rename over it.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let temp_name = format!(
        ".tmp_{}_{}",
        std::process::id(),
        path.file_name()
            .map(|s| s.to_string_lossy())
            .unwrap_or_default()
    );
    let temp_path = parent.join(temp_name);

    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::UnitDescription;
    use data_contracts::ModelConfig;
    use evaluation::MetricMap;
    use inference::PredictionStrategy;

    #[test]
    fn output_name_encodes_the_run() {
        let path = output_path(
            Path::new("out"),
            Path::new("runs/ablation"),
            Phase::Test,
            &CheckpointId::Best,
            Split::Upper,
            StrategySelection::All,
            3.0,
        );
        assert_eq!(path, PathBuf::from("out/ablation_test_best_upper_all_radius_3.0.csv"));
        let epoch = output_path(
            Path::new("out"),
            Path::new("runs/ablation"),
            Phase::Val,
            &CheckpointId::Epoch(40),
            Split::All,
            StrategySelection::SmartExpected,
            2.5,
        );
        assert!(epoch.ends_with("ablation_val_40_all_smart_expected_radius_2.5.csv"));
    }

    #[test]
    fn quotes_fields_with_separators() {
        let mut out = String::new();
        push_record(&mut out, ["a", "b,c", "say \"hi\""].into_iter());
        assert_eq!(out, "a,\"b,c\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn rewrites_whole_table_per_row() {
        let dir = tempfile::tempdir().unwrap();
        let schema = ResultSchema::new(&[1], false, false);
        let path = dir.path().join("nested").join("r.csv");
        let mut sink = ResultSink::new(&path, &schema);
        assert!(!path.exists());

        let mut metrics = MetricMap::new();
        for key in schema.metric_keys() {
            metrics.insert(*key, 0.5);
        }
        for strategy in [PredictionStrategy::Sampling, PredictionStrategy::Expected] {
            let unit = UnitDescription::new(&ModelConfig::default(), None, 10, strategy);
            sink.append(schema.build_row(unit, &metrics).unwrap()).unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(",Model,# Generators"));
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].starts_with("1,"));
        assert!(lines[2].contains(",expected,"));
        assert!(lines[1].ends_with(",0.5,0.5"));
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn leading_column_is_an_unnamed_row_index() {
        let schema = ResultSchema::new(&[1, 2], true, true);
        let mut sink = ResultSink::new("unused.csv", &schema);
        let mut metrics = MetricMap::new();
        for key in schema.metric_keys() {
            metrics.insert(*key, 1.0);
        }
        for _ in 0..3 {
            let unit = UnitDescription::new(
                &ModelConfig::default(),
                Some("eth".into()),
                10,
                PredictionStrategy::Sampling,
            );
            sink.rows.push(schema.build_row(unit, &metrics).unwrap());
        }
        let text = sink.render();
        let table: Vec<Vec<&str>> = text.lines().map(|l| l.split(',').collect()).collect();
        assert_eq!(&table[0][..3], ["", "Training dataset", "Model"]);
        let index: Vec<&str> = table[1..].iter().map(|row| row[0]).collect();
        assert_eq!(index, ["0", "1", "2"]);
        assert!(table.iter().all(|row| row.len() == 1 + schema.columns().len()));
    }
}
