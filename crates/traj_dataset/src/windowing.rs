use data_contracts::{Point, Scenario};
use std::collections::BTreeMap;

/// One `frame agent x y` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Record {
    pub frame: i64,
    pub agent: u64,
    pub x: f32,
    pub y: f32,
}

/// Parse whitespace- or comma-separated records. Blank lines and `#` comments
/// are skipped. Errors carry the 1-based line number.
pub fn parse_records(raw: &str) -> Result<Vec<Record>, (usize, String)> {
    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() < 4 {
            return Err((idx + 1, format!("expected 4 fields, found {}", fields.len())));
        }
        let mut nums = [0f64; 4];
        for (slot, field) in nums.iter_mut().zip(&fields) {
            *slot = field
                .parse::<f64>()
                .map_err(|e| (idx + 1, format!("invalid number '{field}': {e}")))?;
        }
        if nums.iter().any(|v| !v.is_finite()) {
            return Err((idx + 1, "non-finite value".to_string()));
        }
        if nums[1] < 0.0 {
            return Err((idx + 1, format!("negative agent id {}", nums[1])));
        }
        out.push(Record {
            frame: nums[0].round() as i64,
            agent: nums[1].round() as u64,
            x: nums[2] as f32,
            y: nums[3] as f32,
        });
    }
    Ok(out)
}

/// Slide a `seq_len` window over the distinct frames (stride one frame) and
/// emit a scenario for every agent present in all frames of the window.
///
/// Scenarios are ordered by window start, then agent id; ids are assigned in
/// that order starting at zero.
pub fn window_scenarios(records: &[Record], obs_len: usize, seq_len: usize) -> Vec<Scenario> {
    let mut by_frame: BTreeMap<i64, Vec<&Record>> = BTreeMap::new();
    for r in records {
        by_frame.entry(r.frame).or_default().push(r);
    }
    let frames: Vec<i64> = by_frame.keys().copied().collect();
    if seq_len == 0 || obs_len >= seq_len || frames.len() < seq_len {
        return Vec::new();
    }

    let mut scenarios = Vec::new();
    for start in 0..=frames.len() - seq_len {
        let window = &frames[start..start + seq_len];
        let mut tracks: BTreeMap<u64, Vec<Point>> = BTreeMap::new();
        for (offset, frame) in window.iter().enumerate() {
            for r in by_frame.get(frame).map(Vec::as_slice).unwrap_or_default() {
                let track = tracks.entry(r.agent).or_default();
                // Only extend tracks that were seen in every earlier frame of the window.
                if track.len() == offset {
                    track.push([r.x, r.y]);
                }
            }
        }
        for (agent, track) in tracks {
            if track.len() != seq_len {
                continue;
            }
            let (observed, future) = track.split_at(obs_len);
            scenarios.push(Scenario {
                id: scenarios.len(),
                agent_id: agent,
                start_frame: window[0],
                observed: observed.to_vec(),
                future: future.to_vec(),
            });
        }
    }
    scenarios
}
