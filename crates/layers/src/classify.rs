//! Class breaks for choropleth colouring.
//!
//! The manager only depends on the [`Classifier`] seam; [`NaturalBreaks`] is the
//! default implementation (Jenks optimal partition).

use foundation::math::precision::stable_total_cmp_f64;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("cannot classify an empty value set")]
    Empty,
    #[error("value at index {0} is not finite")]
    NonFinite(usize),
    #[error("class count must be at least 1")]
    ZeroClasses,
}

/// Upper class bounds (ascending) and the number of values in each class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub breaks: Vec<f64>,
    pub counts: Vec<usize>,
}

pub trait Classifier {
    fn classify(&self, values: &[f64], classes: usize) -> Result<ClassificationResult, ClassifyError>;
}

/// Jenks natural breaks: minimises the summed within-class squared deviation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct NaturalBreaks;

impl Classifier for NaturalBreaks {
    fn classify(&self, values: &[f64], classes: usize) -> Result<ClassificationResult, ClassifyError> {
        if classes == 0 {
            return Err(ClassifyError::ZeroClasses);
        }
        if values.is_empty() {
            return Err(ClassifyError::Empty);
        }
        if let Some(i) = values.iter().position(|v| !v.is_finite()) {
            return Err(ClassifyError::NonFinite(i));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| stable_total_cmp_f64(*a, *b));

        let breaks = if sorted.len() <= classes {
            // One class per value; the tail repeats the maximum.
            let max = sorted[sorted.len() - 1];
            let mut b = sorted.clone();
            b.resize(classes, max);
            b
        } else {
            jenks_breaks(&sorted, classes)
        };
        let counts = count_per_class(&sorted, &breaks);
        Ok(ClassificationResult { breaks, counts })
    }
}

/// `sorted` must be ascending with more values than `k`.
fn jenks_breaks(sorted: &[f64], k: usize) -> Vec<f64> {
    let n = sorted.len();
    // lower[i][j]: 1-based index of the first value of class j when the first
    // i values are split into j classes; cost[i][j]: the matching variance sum.
    let mut lower = vec![vec![0usize; k + 1]; n + 1];
    let mut cost = vec![vec![0.0f64; k + 1]; n + 1];
    for j in 1..=k {
        lower[1][j] = 1;
        for row in cost.iter_mut().skip(2) {
            row[j] = f64::INFINITY;
        }
    }

    for i in 2..=n {
        let (mut sum, mut sum_sq, mut w) = (0.0, 0.0, 0.0);
        let mut variance = 0.0;
        for m in 1..=i {
            let first = i - m + 1;
            let v = sorted[first - 1];
            sum += v;
            sum_sq += v * v;
            w += 1.0;
            variance = sum_sq - sum * sum / w;
            let prev = first - 1;
            if prev != 0 {
                for j in 2..=k {
                    let candidate = variance + cost[prev][j - 1];
                    if cost[i][j] >= candidate {
                        lower[i][j] = first;
                        cost[i][j] = candidate;
                    }
                }
            }
        }
        lower[i][1] = 1;
        cost[i][1] = variance;
    }

    let mut breaks = vec![0.0; k];
    breaks[k - 1] = sorted[n - 1];
    let mut end = n;
    for j in (2..=k).rev() {
        let first = lower[end][j];
        breaks[j - 2] = sorted[first.saturating_sub(2)];
        end = first.saturating_sub(1).max(1);
    }
    breaks
}

/// Index of the class `value` falls into: the first break not below it.
/// Values above the last break land in the last class.
pub fn bucket_of(value: f64, breaks: &[f64]) -> usize {
    breaks
        .iter()
        .position(|b| value <= *b)
        .unwrap_or(breaks.len().saturating_sub(1))
}

fn count_per_class(values: &[f64], breaks: &[f64]) -> Vec<usize> {
    let mut counts = vec![0; breaks.len()];
    for v in values {
        if let Some(c) = counts.get_mut(bucket_of(*v, breaks)) {
            *c += 1;
        }
    }
    counts
}

/// Usable classes derived from a possibly degenerate classification.
///
/// Breaks that do not strictly ascend are collapsed into the preceding class;
/// each surviving class remembers its original ramp slot so colours stay
/// stable. Counts are recomputed against the surviving breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct Classes {
    pub uppers: Vec<f64>,
    pub slots: Vec<usize>,
    pub counts: Vec<usize>,
}

impl Classes {
    pub fn from_result(result: &ClassificationResult, values: &[f64]) -> Self {
        let mut uppers: Vec<f64> = Vec::with_capacity(result.breaks.len());
        let mut slots = Vec::with_capacity(result.breaks.len());
        for (slot, b) in result.breaks.iter().copied().enumerate() {
            if !b.is_finite() {
                continue;
            }
            if uppers.last().is_some_and(|last| b <= *last) {
                continue;
            }
            uppers.push(b);
            slots.push(slot);
        }
        let counts = count_per_class(values, &uppers);
        Self {
            uppers,
            slots,
            counts,
        }
    }

    pub fn len(&self) -> usize {
        self.uppers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uppers.is_empty()
    }

    /// Ramp slot for a value, or `None` when there are no classes.
    pub fn slot_of(&self, value: f64) -> Option<usize> {
        if self.uppers.is_empty() {
            return None;
        }
        self.slots.get(bucket_of(value, &self.uppers)).copied()
    }
}
