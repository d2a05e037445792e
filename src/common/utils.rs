//! This file provides some common numeric functions.
use rayon::prelude::*;

use crate::constants::MINIMAL_WEIGHT_SUM;


/// The logistic sigmoid.
#[inline(always)]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}


/// Scale `values` so that they sum to one.
/// Leaves `values` untouched when the sum is (almost) zero.
#[inline(always)]
pub fn normalize_sum(values: &mut [f64]) {
    let sum = values.iter().sum::<f64>();
    if sum.abs() > MINIMAL_WEIGHT_SUM {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}


/// Parallel version of [`normalize_sum`] for long weight vectors.
#[inline(always)]
pub fn normalize(weights: &mut [f64]) {
    let sum = weights.par_iter().sum::<f64>();
    if sum.abs() > MINIMAL_WEIGHT_SUM {
        weights.par_iter_mut().for_each(|w| *w /= sum);
    }
}


/// Index of the largest finite value.
pub fn argmax(values: &[f64]) -> Option<usize> {
    values.iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}


/// Root mean squared error over the pairs that are not missing.
pub fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    let (sum, count) = predictions.iter()
        .zip(targets)
        .filter(|(p, t)| !p.is_nan() && !t.is_nan())
        .fold((0.0, 0usize), |(sum, count), (p, t)| {
            (sum + (p - t).powi(2), count + 1)
        });
    if count == 0 { 0.0 } else { (sum / count as f64).sqrt() }
}


/// Fraction of misordered pairs between `scores` and `relevance`
/// within each group of consecutive rows.
pub fn misordered_pairs(scores: &[f64], relevance: &[f64], groups: &[usize])
    -> f64
{
    let mut offset = 0;
    let (mut wrong, mut total) = (0usize, 0usize);
    for &size in groups {
        let s = &scores[offset..offset + size];
        let r = &relevance[offset..offset + size];
        for i in 0..size {
            for j in 0..size {
                if r[i] > r[j] {
                    total += 1;
                    if !(s[i] > s[j]) {
                        wrong += 1;
                    }
                }
            }
        }
        offset += size;
    }
    if total == 0 { 0.0 } else { wrong as f64 / total as f64 }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_weights() {
        let mut w = vec![1.0, 1.0, 2.0];
        normalize(&mut w);
        assert_eq!(w, vec![0.25, 0.25, 0.5]);
    }


    #[test]
    fn misordered() {
        let scores = vec![3.0, 2.0, 1.0, 0.0, 1.0];
        let relevance = vec![2.0, 1.0, 0.0, 1.0, 0.0];
        // first group is perfectly ordered, second is reversed.
        assert!((misordered_pairs(&scores, &relevance, &[3, 2]) - 0.25).abs() < 1e-12);
    }
}
