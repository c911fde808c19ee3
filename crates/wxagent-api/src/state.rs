use std::sync::Arc;

use wxagent_core::Config;
use wxagent_services::{NarrativeGenerator, WeatherSource};
use wxagent_stats::StatsConfig;

/// Immutable state shared by every request.
pub struct AppState<S, N> {
    pub config: Arc<Config>,
    pub source: Arc<S>,
    pub narrator: Arc<N>,
    pub stats: StatsConfig,
}

impl<S, N> AppState<S, N>
where
    S: WeatherSource,
    N: NarrativeGenerator,
{
    pub fn new(config: Config, source: S, narrator: N) -> Self {
        let stats = StatsConfig {
            anomaly_threshold: config.analysis.anomaly_threshold,
            spike_threshold: config.analysis.spike_threshold,
        };
        Self {
            config: Arc::new(config),
            source: Arc::new(source),
            narrator: Arc::new(narrator),
            stats,
        }
    }
}

// Derived Clone would require S: Clone and N: Clone.
impl<S, N> Clone for AppState<S, N> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            source: Arc::clone(&self.source),
            narrator: Arc::clone(&self.narrator),
            stats: self.stats,
        }
    }
}
