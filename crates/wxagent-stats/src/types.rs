use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default magnitude, in degrees Celsius, beyond which the current reading is
/// flagged as anomalous.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 5.0;

/// Default day-over-day change, in degrees Celsius, flagged as a spike.
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 5.0;

/// Readings per week for the week-over-week trend.
pub const WEEK_LEN: usize = 7;

/// One daily reading from the reference station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Daily mean temperature in degrees Celsius
    pub temperature_c: f64,
    #[serde(default)]
    pub precip_mm: Option<f64>,
    #[serde(default)]
    pub wind_speed_kmh: Option<f64>,
}

impl Observation {
    pub fn new(date: NaiveDate, temperature_c: f64) -> Self {
        Self {
            date,
            temperature_c,
            precip_mm: None,
            wind_speed_kmh: None,
        }
    }
}

/// Tunables for [`crate::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// `|current - mean|` strictly greater than this sets `anomaly`.
    pub anomaly_threshold: f64,
    /// `|trend_day|` strictly greater than this sets `significant_spike`.
    pub spike_threshold: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            spike_threshold: DEFAULT_SPIKE_THRESHOLD,
        }
    }
}

/// Statistics for one analysis window.
///
/// Values that cannot be computed for the window are `None` and serialize as
/// JSON `null`; they are never replaced with 0 or another sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Temperature of the most recent reading
    pub current: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation. `None` below two readings.
    pub stddev: Option<f64>,
    /// `None` when `stddev` is unavailable or zero.
    pub z_score: Option<f64>,
    pub anomaly: bool,
    /// Most recent reading minus the one before it.
    pub trend_day: Option<f64>,
    /// Most recent reading minus the first reading of the trailing week.
    pub trend_week: Option<f64>,
    pub significant_spike: bool,
    pub total_days: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StatsError {
    #[error("At least one observation is required")]
    EmptyWindow,

    #[error("Observation {index} ({date}) has a non-finite temperature")]
    NonFiniteValue { index: usize, date: NaiveDate },
}
