//! Run lifecycle: `Idle -> Running -> {Completed | Aborted}`.

use std::fmt;

use campaign_core::ReportStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a run ended without a usable report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The generation service cannot work at all (credentials, permissions).
    RunFatal { message: String },
    /// Every attempted record was skipped.
    NoResults { attempted: usize },
    Cancelled { processed: usize },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::RunFatal { message } => {
                write!(f, "Generation service unavailable: {}", message)
            }
            AbortReason::NoResults { attempted } => write!(
                f,
                "No messages could be generated for the {} records attempted",
                attempted
            ),
            AbortReason::Cancelled { processed } => {
                write!(f, "Run cancelled after {} records", processed)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running {
        run_id: String,
        /// Records resolved so far.
        cursor: usize,
        total: usize,
        started_at: DateTime<Utc>,
    },
    Completed {
        run_id: String,
        stats: ReportStats,
    },
    Aborted {
        run_id: String,
        reason: AbortReason,
    },
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed { .. } | RunState::Aborted { .. })
    }

    pub fn run_id(&self) -> Option<&str> {
        match self {
            RunState::Idle => None,
            RunState::Running { run_id, .. }
            | RunState::Completed { run_id, .. }
            | RunState::Aborted { run_id, .. } => Some(run_id),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running { .. } => "running",
            RunState::Completed { .. } => "completed",
            RunState::Aborted { .. } => "aborted",
        }
    }
}

/// Error type for invalid run state transitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: &'static str, action: &'static str },

    #[error("Cursor {cursor} already at batch size {total}")]
    CursorOverflow { cursor: usize, total: usize },
}

/// Owns the current [`RunState`] and only moves it along legal edges.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    current_state: RunState,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.current_state
    }

    /// Enter `Running`. Allowed from any state except `Running`.
    pub fn start(&mut self, run_id: impl Into<String>, total: usize) -> Result<(), TransitionError> {
        if self.current_state.is_running() {
            return Err(self.invalid("start"));
        }
        self.current_state = RunState::Running {
            run_id: run_id.into(),
            cursor: 0,
            total,
            started_at: Utc::now(),
        };
        Ok(())
    }

    /// Move the cursor past one resolved record.
    pub fn advance(&mut self) -> Result<usize, TransitionError> {
        if let RunState::Running { cursor, total, .. } = &mut self.current_state {
            if *cursor >= *total {
                return Err(TransitionError::CursorOverflow {
                    cursor: *cursor,
                    total: *total,
                });
            }
            *cursor += 1;
            return Ok(*cursor);
        }
        Err(self.invalid("advance"))
    }

    pub fn complete(&mut self, stats: ReportStats) -> Result<(), TransitionError> {
        let run_id = self.running_id("complete")?;
        self.current_state = RunState::Completed { run_id, stats };
        Ok(())
    }

    pub fn abort(&mut self, reason: AbortReason) -> Result<(), TransitionError> {
        let run_id = self.running_id("abort")?;
        self.current_state = RunState::Aborted { run_id, reason };
        Ok(())
    }

    /// Return to `Idle` after a run has finished.
    pub fn reset(&mut self) -> Result<(), TransitionError> {
        if self.current_state.is_running() {
            return Err(self.invalid("reset"));
        }
        self.current_state = RunState::Idle;
        Ok(())
    }

    fn running_id(&self, action: &'static str) -> Result<String, TransitionError> {
        match &self.current_state {
            RunState::Running { run_id, .. } => Ok(run_id.clone()),
            _ => Err(self.invalid(action)),
        }
    }

    fn invalid(&self, action: &'static str) -> TransitionError {
        TransitionError::InvalidTransition {
            from: self.current_state.name(),
            action,
        }
    }
}
