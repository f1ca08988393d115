//! Generator allocation and candidate selection helpers.
//!
//! Kept free of tensors so the strategies can be checked in isolation.

use data_contracts::{distance, Point};

/// Prefix-consistent allocation of `k` candidates to generators.
///
/// Candidate `i` goes to the generator with the largest shortfall
/// `weights[g] * (i + 1) - count[g]` (ties go to the lower index), so every
/// prefix of the result approximates the expected per-generator counts.
pub fn expected_allocation(weights: &[f32], k: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }
    let mut counts = vec![0f32; weights.len()];
    let mut out = Vec::with_capacity(k);
    for i in 0..k {
        let target = (i + 1) as f32;
        let mut best = 0;
        let mut best_gap = f32::NEG_INFINITY;
        for (g, (&w, &c)) in weights.iter().zip(&counts).enumerate() {
            let gap = w * target - c;
            if gap > best_gap {
                best = g;
                best_gap = gap;
            }
        }
        counts[best] += 1.0;
        out.push(best);
    }
    out
}

/// Drop generators whose prior mass is below `min_prior` and renormalise.
///
/// Falls back to a one-hot on the most likely generator when nothing passes.
pub fn confident_weights(weights: &[f32], min_prior: f32) -> Vec<f32> {
    let kept: Vec<f32> = weights
        .iter()
        .map(|&w| if w.is_finite() && w >= min_prior { w } else { 0.0 })
        .collect();
    let total: f32 = kept.iter().sum();
    if total > 0.0 {
        return kept.into_iter().map(|w| w / total).collect();
    }
    let mut one_hot = vec![0.0; weights.len()];
    if let Some(best) = argmax(weights) {
        one_hot[best] = 1.0;
    }
    one_hot
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Pick `k` endpoint-diverse candidates from a pool.
///
/// Candidates are scanned in generation order and accepted while their
/// endpoint keeps at least `tau` from every accepted endpoint, with `tau` half
/// the mean endpoint distance to the pool centroid. Rejected candidates top up
/// the result in generation order when fewer than `k` pass.
pub fn diverse_subset(endpoints: &[Point], k: usize) -> Vec<usize> {
    let k = k.min(endpoints.len());
    if k == 0 {
        return Vec::new();
    }
    let n = endpoints.len() as f32;
    let centroid = endpoints
        .iter()
        .fold([0f32; 2], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n]);
    let spread = endpoints.iter().map(|p| distance(*p, centroid)).sum::<f32>() / n;
    let tau = 0.5 * spread;

    let mut accepted: Vec<usize> = Vec::with_capacity(k);
    let mut rejected: Vec<usize> = Vec::new();
    for (i, p) in endpoints.iter().enumerate() {
        if accepted.len() == k {
            break;
        }
        let far_enough = accepted
            .iter()
            .all(|&j| distance(*p, endpoints[j]) >= tau);
        if far_enough {
            accepted.push(i);
        } else {
            rejected.push(i);
        }
    }
    let scanned = accepted.len() + rejected.len();
    let remaining = rejected.into_iter().chain(scanned..endpoints.len());
    accepted.extend(remaining.take(k - accepted.len()));
    accepted
}

/// Seed for an independent random stream keyed by run seed, scenario and slot (splitmix64).
pub fn stream_seed(seed: u64, scenario: usize, slot: usize) -> u64 {
    let mut z = seed
        ^ (scenario as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (slot as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Accumulate per-step displacements `[dx0, dy0, ..]` from `origin`.
pub fn integrate(origin: Point, displacements: &[f32]) -> Vec<Point> {
    let mut pos = origin;
    displacements
        .chunks_exact(2)
        .map(|d| {
            pos = [pos[0] + d[0], pos[1] + d[1]];
            pos
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_tracks_expected_counts() {
        let alloc = expected_allocation(&[0.5, 0.3, 0.2], 10);
        assert_eq!(&alloc[..4], &[0, 1, 2, 0]);
        let count = |g| alloc.iter().filter(|&&a| a == g).count();
        assert_eq!((count(0), count(1), count(2)), (5, 3, 2));
    }

    #[test]
    fn allocation_breaks_ties_toward_lower_index() {
        assert_eq!(expected_allocation(&[0.25; 4], 4), vec![0, 1, 2, 3]);
        assert!(expected_allocation(&[], 3).is_empty());
    }

    #[test]
    fn confident_weights_drop_unlikely_generators() {
        let w = confident_weights(&[0.6, 0.02, 0.38], 0.05);
        assert_eq!(w[1], 0.0);
        assert!((w.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(confident_weights(&[0.01, 0.03], 0.5), vec![0.0, 1.0]);
    }

    #[test]
    fn diverse_subset_skips_near_duplicates() {
        let endpoints = [[0.0, 0.0], [0.01, 0.0], [4.0, 0.0], [0.0, 4.0], [4.0, 4.0]];
        let picked = diverse_subset(&endpoints, 4);
        assert_eq!(picked, vec![0, 2, 3, 4]);
    }

    #[test]
    fn diverse_subset_tops_up_in_generation_order() {
        let endpoints = [[1.0, 1.0]; 5];
        assert_eq!(diverse_subset(&endpoints, 3), vec![0, 1, 2]);
        assert_eq!(diverse_subset(&endpoints, 9).len(), 5);
    }

    #[test]
    fn stream_seeds_differ_per_slot() {
        assert_ne!(stream_seed(0, 0, 0), stream_seed(0, 0, 1));
        assert_ne!(stream_seed(0, 1, 0), stream_seed(0, 0, 1));
        assert_eq!(stream_seed(7, 3, 2), stream_seed(7, 3, 2));
    }

    #[test]
    fn integrate_accumulates_from_origin() {
        let traj = integrate([1.0, 1.0], &[0.5, 0.0, 0.5, 1.0]);
        assert_eq!(traj, vec![[1.5, 1.0], [2.0, 2.0]]);
    }
}
