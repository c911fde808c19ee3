//! The statistics engine.

use crate::types::{Observation, StatsConfig, StatsError, Summary, WEEK_LEN};

/// Compute the [`Summary`] for a chronologically ordered window.
///
/// # Errors
/// [`StatsError::EmptyWindow`] for an empty slice and
/// [`StatsError::NonFiniteValue`] if any temperature is NaN or infinite.
/// Short or flat windows are not errors; the affected fields are `None`.
pub fn analyze(observations: &[Observation], config: &StatsConfig) -> Result<Summary, StatsError> {
    let (first, last) = match (observations.first(), observations.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(StatsError::EmptyWindow),
    };

    if let Some((index, obs)) = observations
        .iter()
        .enumerate()
        .find(|(_, o)| !o.temperature_c.is_finite())
    {
        return Err(StatsError::NonFiniteValue {
            index,
            date: obs.date,
        });
    }

    let temps: Vec<f64> = observations.iter().map(|o| o.temperature_c).collect();
    let current = last.temperature_c;

    let (min, max) = temps
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &t| {
            (lo.min(t), hi.max(t))
        });

    // Summation error can push the mean of a flat window just past its extrema.
    let mean = mean(&temps).unwrap_or(current).clamp(min, max);

    let stddev = population_stddev(&temps, mean);
    let z_score = stddev
        .filter(|&sd| sd > 0.0)
        .map(|sd| (current - mean) / sd);

    let anomaly = (current - mean).abs() > config.anomaly_threshold;

    let trend_day = trend(&temps, 1);
    let trend_week = trend(&temps, WEEK_LEN - 1);
    let significant_spike = trend_day.is_some_and(|d| d.abs() > config.spike_threshold);

    Ok(Summary {
        current,
        mean,
        min,
        max,
        stddev,
        z_score,
        anomaly,
        trend_day,
        trend_week,
        significant_spike,
        total_days: temps.len(),
        first_date: first.date,
        last_date: last.date,
    })
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N) around `mean`.
///
/// `None` below two values. A flat series yields `Some(0.0)`.
pub fn population_stddev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some((sum_sq / values.len() as f64).sqrt())
}

/// Last value minus the value `offset` positions before it.
///
/// `None` when the series is too short or `offset` is zero.
pub fn trend(values: &[f64], offset: usize) -> Option<f64> {
    if offset == 0 {
        return None;
    }
    let last = *values.last()?;
    let idx = values.len().checked_sub(offset + 1)?;
    Some(last - values[idx])
}
