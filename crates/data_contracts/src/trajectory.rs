use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// World-frame position in meters.
pub type Point = [f32; 2];

/// Ordered positions, one per time step.
pub type Trajectory = Vec<Point>;

/// Dense index of a scenario within its dataset.
pub type ScenarioId = usize;

/// Candidate futures per scenario, in the order the strategy produced them.
pub type PredictionSet = BTreeMap<ScenarioId, Vec<Trajectory>>;

/// One agent's observed history and ground-truth future.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub id: ScenarioId,
    pub agent_id: u64,
    /// Frame at which the observation window starts.
    pub start_frame: i64,
    pub observed: Trajectory,
    pub future: Trajectory,
}

impl Scenario {
    pub fn last_observed(&self) -> Option<Point> {
        self.observed.last().copied()
    }

    pub fn endpoint(&self) -> Option<Point> {
        self.future.last().copied()
    }

    /// Per-step displacements of the observed window, flattened as `[dx0, dy0, dx1, dy1, ..]`.
    /// The first displacement is zero.
    pub fn observed_displacements(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.observed.len() * 2);
        let mut prev: Option<Point> = None;
        for p in &self.observed {
            match prev {
                Some(q) => {
                    out.push(p[0] - q[0]);
                    out.push(p[1] - q[1]);
                }
                None => {
                    out.push(0.0);
                    out.push(0.0);
                }
            }
            prev = Some(*p);
        }
        out
    }
}

pub fn distance(a: Point, b: Point) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    (dx * dx + dy * dy).sqrt()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static [&'static str],
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown {} '{}', expected one of {}",
            self.kind,
            self.value,
            self.expected.join(", ")
        )
    }
}

impl std::error::Error for ParseEnumError {}

/// Dataset phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Phase {
    Train,
    Val,
    Test,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Train => "train",
            Phase::Val => "val",
            Phase::Test => "test",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Phase::Train),
            "val" => Ok(Phase::Val),
            "test" => Ok(Phase::Test),
            other => Err(ParseEnumError {
                kind: "phase",
                value: other.to_string(),
                expected: &["train", "val", "test"],
            }),
        }
    }
}

/// Sub-split of an intersection dataset.
///
/// `Upper` keeps scenarios whose ground-truth endpoint lies above the last
/// observed position (larger y), `Lower` keeps the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Split {
    Upper,
    Lower,
    #[default]
    All,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Upper => "upper",
            Split::Lower => "lower",
            Split::All => "all",
        }
    }

    pub fn admits(&self, scenario: &Scenario) -> bool {
        let heading_up = match (scenario.last_observed(), scenario.endpoint()) {
            (Some(last), Some(end)) => end[1] > last[1],
            _ => false,
        };
        match self {
            Split::All => true,
            Split::Upper => heading_up,
            Split::Lower => !heading_up,
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upper" => Ok(Split::Upper),
            "lower" => Ok(Split::Lower),
            "all" => Ok(Split::All),
            other => Err(ParseEnumError {
                kind: "split",
                value: other.to_string(),
                expected: &["upper", "lower", "all"],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(observed: Trajectory, future: Trajectory) -> Scenario {
        Scenario {
            id: 0,
            agent_id: 1,
            start_frame: 0,
            observed,
            future,
        }
    }

    #[test]
    fn displacements_start_at_zero() {
        let s = scenario(vec![[0.0, 0.0], [1.0, 0.5], [3.0, 1.5]], vec![[4.0, 2.0]]);
        assert_eq!(s.observed_displacements(), vec![0.0, 0.0, 1.0, 0.5, 2.0, 1.0]);
    }

    #[test]
    fn split_follows_endpoint_heading() {
        let up = scenario(vec![[0.0, 0.0]], vec![[0.0, 1.0], [0.0, 2.0]]);
        let down = scenario(vec![[0.0, 0.0]], vec![[0.0, -1.0]]);
        assert!(Split::Upper.admits(&up));
        assert!(!Split::Upper.admits(&down));
        assert!(Split::Lower.admits(&down));
        assert!(Split::All.admits(&up) && Split::All.admits(&down));
    }

    #[test]
    fn phase_parse_rejects_unknown() {
        assert_eq!("val".parse::<Phase>().unwrap(), Phase::Val);
        let err = "dev".parse::<Phase>().unwrap_err();
        assert!(err.to_string().contains("train, val, test"));
    }
}
