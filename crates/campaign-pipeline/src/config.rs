use std::time::Duration;

use campaign_core::SynthesisConfig;

use crate::retry::RetryPolicy;

pub const DEFAULT_BATCH_CAP: usize = 10;
pub const DEFAULT_PACING: Duration = Duration::from_millis(150);

/// Configuration for the synthesis pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Records processed per run; the rest of the dataset is never submitted.
    pub batch_cap: usize,
    pub retry: RetryPolicy,
    /// Pause between consecutive records.
    pub pacing: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_cap: DEFAULT_BATCH_CAP,
            retry: RetryPolicy::default(),
            pacing: DEFAULT_PACING,
        }
    }
}

impl PipelineConfig {
    pub fn from_synthesis_config(config: &SynthesisConfig) -> Self {
        Self {
            batch_cap: config.batch_cap.max(1),
            retry: RetryPolicy::new(
                config.max_attempts,
                Duration::from_millis(config.base_delay_ms),
            ),
            pacing: Duration::from_millis(config.pacing_ms),
        }
    }
}
