//! campaign-core - shared types for batch campaign synthesis
//!
//! Customer records and briefs go in, message drafts and a reviewable
//! campaign report come out. Progress events and runtime configuration
//! are shared by the ingestion, generation and pipeline crates.

pub mod config;
pub mod events;
pub mod model;
pub mod report;

pub use config::{ConfigError, SynthesisConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
pub use events::SynthesisEvent;
pub use model::{
    CampaignBrief, CustomerRecord, EntryOutcome, FieldValue, MessageDraft, ResultEntry, Tone,
    ToneParseError,
};
pub use report::{CampaignReport, ReportError, ReportStats, PASS_THRESHOLD};
