//! Distribution statistics over the final scores of a batch.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionStats {
    pub count: usize,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub q1: f32,
    pub median: f32,
    pub q3: f32,
}

impl DistributionStats {
    /// `None` for an empty batch. Quartiles use linear interpolation between
    /// closest ranks.
    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let mut sorted = scores.to_vec();
        sorted.sort_by(f32::total_cmp);

        let sum: f64 = sorted.iter().map(|s| *s as f64).sum();
        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: (sum / sorted.len() as f64) as f32,
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
        })
    }
}

fn quantile(sorted: &[f32], q: f32) -> f32 {
    let pos = q * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f32)
}
