//! Series reduction to {min, max, mean, p95}
//!
//! Both ingestion paths (pbench CSV tables and Prometheus range queries) feed
//! their samples through [`summarize`], so a given set of samples produces
//! the same numbers no matter where it came from.

use crate::error::{AnalyzerError, Result};
use crate::host::{Series, SeriesSummary};

/// Percentile reported as `pct95`
pub const PCT95: u32 = 95;

/// Summary statistics for one numeric series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub pct95: f64,
}

impl Summary {
    /// True when every component is finite
    ///
    /// A `NaN` or infinite sample propagates into `avg`, so corrupt input is
    /// always visible here rather than hidden behind a plausible number.
    pub fn is_finite(&self) -> bool {
        [self.min, self.max, self.avg, self.pct95]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Reduce `values` to min, max, arithmetic mean and nearest-rank p95
///
/// # Errors
/// [`AnalyzerError::EmptySeries`] when `values` is empty; nothing is
/// defined for zero samples and zeros would read as a real measurement.
///
/// # Example
/// ```
/// use perf_analyzer::stats::summarize;
///
/// let values: Vec<f64> = (1..=100).map(f64::from).collect();
/// let s = summarize(&values).unwrap();
/// assert_eq!(s.pct95, 95.0);
/// assert_eq!(s.avg, 50.5);
/// ```
pub fn summarize(values: &[f64]) -> Result<Summary> {
    if values.is_empty() {
        return Err(AnalyzerError::EmptySeries);
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    let pct95 = nearest_rank_percentile(values, PCT95)?;

    Ok(Summary {
        min,
        max,
        avg,
        pct95,
    })
}

/// Nearest-rank percentile: the element at 1-indexed rank `ceil(p/100 * n)`
/// of the ascending sort, clamped to `[1, n]`
///
/// The rank is computed in integer arithmetic so `p95` of 20, 40 or 100
/// samples lands exactly on rank 19, 38 or 95. `percentile` above 100 is
/// clamped to the maximum.
pub fn nearest_rank_percentile(values: &[f64], percentile: u32) -> Result<f64> {
    if values.is_empty() {
        return Err(AnalyzerError::EmptySeries);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len();
    let rank = (percentile as usize * n).div_ceil(100).clamp(1, n);
    Ok(sorted[rank - 1])
}

/// Summarize a tagged series, carrying its kind and resource through
pub fn summarize_series(series: &Series) -> Result<SeriesSummary> {
    let summary = summarize(&series.values)?;
    Ok(SeriesSummary::from_summary(
        series.kind.clone(),
        series.resource.clone(),
        summary,
    ))
}
