//! campaign-pipeline - sequential batch synthesis
//!
//! Feeds a capped batch of customer records through a [`MessageGenerator`]
//! one at a time, retrying throttled calls, skipping records that keep
//! failing and aborting only when the service cannot work at all.
//!
//! [`MessageGenerator`]: campaign_llm::MessageGenerator

pub mod config;
pub mod result_log;
pub mod retry;
pub mod runner;
pub mod state;

pub use config::{PipelineConfig, DEFAULT_BATCH_CAP, DEFAULT_PACING};
pub use result_log::{LogError, ResultLog};
pub use retry::RetryPolicy;
pub use runner::{PipelineError, RunFailure, RunOutcome, RunSnapshot, SynthesisPipeline};
pub use state::{AbortReason, RunState, RunStateMachine, TransitionError};
