use crate::error::{HarnessError, HarnessResult};
use inference::PredictionStrategy;
use std::fs;
use std::path::{Path, PathBuf};

/// Marker a directory name must contain to count as a trained model.
pub const VERSION_MARKER: &str = "version";

/// One (model directory, strategy) pair of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationUnit {
    pub model_dir: PathBuf,
    pub strategy: PredictionStrategy,
}

/// Immediate subdirectories of `root` whose name contains `version`,
/// ordered by trailing version number, then name.
pub fn discover_model_dirs(root: &Path) -> HarnessResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(HarnessError::MissingModelRoot {
            path: root.to_path_buf(),
        });
    }
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .map_err(|source| HarnessError::Io {
            path: root.to_path_buf(),
            source,
        })?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.contains(VERSION_MARKER))
        })
        .collect();
    dirs.sort_by_cached_key(|p| version_key(p));
    Ok(dirs)
}

fn version_key(path: &Path) -> (u64, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digits: String = name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    (digits.parse().unwrap_or(u64::MAX), name)
}

/// Cartesian product of model directories and strategies, strategy-major.
///
/// Admission rules need the model config and are applied per unit after loading.
#[derive(Debug, Clone)]
pub struct EvaluationPlanner {
    strategies: Vec<PredictionStrategy>,
}

impl EvaluationPlanner {
    pub fn new(strategies: Vec<PredictionStrategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[PredictionStrategy] {
        &self.strategies
    }

    pub fn plan(&self, model_root: &Path) -> HarnessResult<Vec<EvaluationUnit>> {
        let dirs = discover_model_dirs(model_root)?;
        if dirs.is_empty() {
            tracing::warn!(root = %model_root.display(), "no version directories found");
        }
        Ok(self.plan_dirs(&dirs))
    }

    pub fn plan_dirs(&self, dirs: &[PathBuf]) -> Vec<EvaluationUnit> {
        self.strategies
            .iter()
            .flat_map(|&strategy| {
                dirs.iter().map(move |dir| EvaluationUnit {
                    model_dir: dir.clone(),
                    strategy,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::StrategySelection;

    #[test]
    fn discovers_version_dirs_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["version_10", "version_2", "notes", "version_0"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("version_9.txt"), "").unwrap();
        let names: Vec<String> = discover_model_dirs(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["version_0", "version_2", "version_10"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            discover_model_dirs(&dir.path().join("absent")),
            Err(HarnessError::MissingModelRoot { .. })
        ));
    }

    #[test]
    fn plan_is_strategy_major() {
        let planner = EvaluationPlanner::new(StrategySelection::All.strategies());
        let dirs = vec![PathBuf::from("version_0"), PathBuf::from("version_1")];
        let units = planner.plan_dirs(&dirs);
        assert_eq!(units.len(), 6);
        assert_eq!(units[0].strategy, PredictionStrategy::SmartExpected);
        assert_eq!(units[1].strategy, PredictionStrategy::SmartExpected);
        assert_eq!(units[1].model_dir, PathBuf::from("version_1"));
        assert_eq!(units[5].strategy, PredictionStrategy::Sampling);
    }
}
