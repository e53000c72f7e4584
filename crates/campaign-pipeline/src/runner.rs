use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use campaign_core::{
    CampaignBrief, CampaignReport, CustomerRecord, MessageDraft, ReportStats, ResultEntry,
    SynthesisEvent,
};
use campaign_llm::{MessageGenerator, ServiceError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::result_log::ResultLog;
use crate::state::{AbortReason, RunState, RunStateMachine, TransitionError};

/// A run request that can never succeed; rejected before any state changes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("No customer records to process")]
    NoRecords,

    #[error("Campaign objective is empty")]
    EmptyObjective,

    #[error(transparent)]
    State(#[from] TransitionError),
}

/// How a `run` call ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(CampaignReport),
    Aborted {
        run_id: String,
        reason: AbortReason,
        entries: Vec<ResultEntry>,
    },
    /// Another run was active; nothing was started or changed.
    AlreadyRunning,
}

/// The single message shown to the user when a run produced no report.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct RunFailure {
    pub reason: Option<AbortReason>,
    pub message: String,
}

impl RunOutcome {
    pub fn into_report(self) -> Result<CampaignReport, RunFailure> {
        match self {
            RunOutcome::Completed(report) => Ok(report),
            RunOutcome::Aborted { reason, .. } => Err(RunFailure {
                message: reason.to_string(),
                reason: Some(reason),
            }),
            RunOutcome::AlreadyRunning => Err(RunFailure {
                reason: None,
                message: "A synthesis run is already in progress".to_string(),
            }),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Point-in-time copy of the run state and the entries resolved so far.
#[derive(Debug, Clone)]
pub struct RunSnapshot {
    pub state: RunState,
    pub entries: Vec<ResultEntry>,
}

#[derive(Debug, Default)]
struct RunContext {
    machine: RunStateMachine,
    log: ResultLog,
}

enum RecordResult {
    Succeeded { draft: MessageDraft, attempts: u32 },
    Skipped { attempts: u32, reason: String },
    Fatal { attempts: u32, error: ServiceError },
    Interrupted { attempts: u32, reason: String },
}

/// Runs one campaign brief over a batch of records, strictly one record at a
/// time, with at most one run active per instance.
pub struct SynthesisPipeline {
    generator: Arc<dyn MessageGenerator>,
    config: PipelineConfig,
    context: Mutex<RunContext>,
}

/// Held by an in-progress `run`. If the run future is dropped before it
/// reaches a terminal state, the run is marked cancelled so the pipeline
/// can start again.
struct ActiveRun<'a> {
    context: &'a Mutex<RunContext>,
    run_id: String,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut context = lock(self.context);
        let processed = match context.machine.state() {
            RunState::Running { run_id, cursor, .. } if *run_id == self.run_id => *cursor,
            _ => return,
        };
        log::warn!(
            "[{}] Run dropped after {} records, marking it cancelled",
            self.run_id,
            processed
        );
        if let Err(error) = context.machine.abort(AbortReason::Cancelled { processed }) {
            log::error!("[{}] {}", self.run_id, error);
        }
        context.log = ResultLog::default();
    }
}

fn lock(context: &Mutex<RunContext>) -> MutexGuard<'_, RunContext> {
    context.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SynthesisPipeline {
    pub fn new(generator: Arc<dyn MessageGenerator>, config: PipelineConfig) -> Self {
        Self {
            generator,
            config,
            context: Mutex::new(RunContext::default()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn state(&self) -> RunState {
        lock(&self.context).machine.state().clone()
    }

    pub async fn snapshot(&self) -> RunSnapshot {
        let context = lock(&self.context);
        RunSnapshot {
            state: context.machine.state().clone(),
            entries: context.log.entries().to_vec(),
        }
    }

    /// Discard the last run's state. Fails while a run is active.
    pub async fn reset(&self) -> Result<(), TransitionError> {
        let mut context = lock(&self.context);
        context.machine.reset()?;
        context.log = ResultLog::default();
        Ok(())
    }

    pub async fn run(
        &self,
        records: &[CustomerRecord],
        brief: &CampaignBrief,
        event_tx: mpsc::Sender<SynthesisEvent>,
        cancel_token: CancellationToken,
    ) -> Result<RunOutcome, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::NoRecords);
        }
        if !brief.is_ready() {
            return Err(PipelineError::EmptyObjective);
        }

        let batch = &records[..records.len().min(self.config.batch_cap)];
        let run_id = Uuid::new_v4().to_string();
        let started_at: DateTime<Utc>;

        let _active = {
            let mut context = lock(&self.context);
            if let Err(error) = context.machine.start(run_id.clone(), batch.len()) {
                log::warn!("[{}] Ignoring run request: {}", run_id, error);
                return Ok(RunOutcome::AlreadyRunning);
            }
            context.log = ResultLog::with_capacity(batch.len());
            started_at = match context.machine.state() {
                RunState::Running { started_at, .. } => *started_at,
                _ => Utc::now(),
            };
            ActiveRun {
                context: &self.context,
                run_id: run_id.clone(),
            }
        };

        log::info!(
            "[{}] Starting synthesis of {} of {} records (tone: {})",
            run_id,
            batch.len(),
            records.len(),
            brief.tone
        );
        emit(
            &event_tx,
            &run_id,
            SynthesisEvent::RunStarted {
                run_id: run_id.clone(),
                total: records.len(),
                batch_size: batch.len(),
            },
        );

        let mut abort: Option<AbortReason> = None;

        for (index, record) in batch.iter().enumerate() {
            if cancel_token.is_cancelled()
                || (index > 0 && !pause(self.config.pacing, &cancel_token).await)
            {
                log::info!("[{}] Cancelled before record {}", run_id, index);
                abort = Some(AbortReason::Cancelled { processed: index });
                break;
            }

            let position =
                lock(&self.context)
                    .log
                    .push_pending(ResultEntry::pending(record, brief.tone));
            let position = match position {
                Ok(position) => position,
                Err(error) => {
                    log::error!("[{}] {}", run_id, error);
                    abort = Some(AbortReason::RunFatal {
                        message: error.to_string(),
                    });
                    break;
                }
            };

            log::debug!(
                "[{}] Record {} (row {}, id {})",
                run_id,
                position,
                record.row_number(),
                record.id()
            );
            emit(
                &event_tx,
                &run_id,
                SynthesisEvent::RecordStarted {
                    index: position,
                    row_number: record.row_number(),
                    customer_id: record.id().to_string(),
                },
            );

            let result = self
                .synthesize_record(&run_id, position, record, brief, &event_tx, &cancel_token)
                .await;
            let processed = position + 1;
            let total = batch.len();

            let (event, stop) = match result {
                RecordResult::Succeeded { draft, attempts } => {
                    let compliance_score = draft.compliance_score;
                    self.resolve(&run_id, position, |entry| entry.succeeded(draft, attempts));
                    (
                        SynthesisEvent::RecordSucceeded {
                            index: position,
                            processed,
                            total,
                            compliance_score,
                        },
                        None,
                    )
                }
                RecordResult::Skipped { attempts, reason } => {
                    log::warn!(
                        "[{}] Skipping record {} after {} attempt(s): {}",
                        run_id,
                        position,
                        attempts,
                        reason
                    );
                    self.skip(&run_id, position, attempts, &reason);
                    (
                        skipped_event(position, processed, total, attempts, reason),
                        None,
                    )
                }
                RecordResult::Fatal { attempts, error } => {
                    log::error!("[{}] Aborting run: {}", run_id, error);
                    let reason = error.to_string();
                    self.skip(&run_id, position, attempts, &reason);
                    (
                        skipped_event(position, processed, total, attempts, reason),
                        Some(AbortReason::RunFatal {
                            message: error.to_string(),
                        }),
                    )
                }
                RecordResult::Interrupted { attempts, reason } => {
                    log::info!("[{}] Cancelled while retrying record {}", run_id, position);
                    self.skip(&run_id, position, attempts, &reason);
                    (
                        skipped_event(position, processed, total, attempts, reason),
                        Some(AbortReason::Cancelled { processed }),
                    )
                }
            };
            emit(&event_tx, &run_id, event);

            if stop.is_some() {
                abort = stop;
                break;
            }
        }

        self.finish(run_id, brief, started_at, abort, &event_tx)
    }

    async fn synthesize_record(
        &self,
        run_id: &str,
        index: usize,
        record: &CustomerRecord,
        brief: &CampaignBrief,
        event_tx: &mpsc::Sender<SynthesisEvent>,
        cancel_token: &CancellationToken,
    ) -> RecordResult {
        let policy = &self.config.retry;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let error = match self
                .generator
                .synthesize(record, &brief.objective, brief.tone)
                .await
            {
                Ok(draft) => return RecordResult::Succeeded { draft, attempts },
                Err(error) => error,
            };

            if error.is_run_fatal() {
                return RecordResult::Fatal { attempts, error };
            }
            if !policy.is_retryable(&error) || !policy.allows_another(attempts) {
                return RecordResult::Skipped {
                    attempts,
                    reason: error.to_string(),
                };
            }

            let delay = policy.delay_for(attempts - 1);
            log::warn!(
                "[{}] Record {} attempt {} failed ({}), retrying in {:?}",
                run_id,
                index,
                attempts,
                error,
                delay
            );
            emit(
                event_tx,
                run_id,
                SynthesisEvent::RetryScheduled {
                    index,
                    attempt: attempts,
                    delay_ms: delay.as_millis() as u64,
                    error: error.to_string(),
                },
            );

            if !pause(delay, cancel_token).await {
                return RecordResult::Interrupted {
                    attempts,
                    reason: format!("Cancelled while waiting to retry: {}", error),
                };
            }
        }
    }

    fn resolve<F>(&self, run_id: &str, index: usize, update: F)
    where
        F: FnOnce(ResultEntry) -> ResultEntry,
    {
        let mut context = lock(&self.context);
        if let Err(error) = context.log.resolve(index, update) {
            log::error!("[{}] {}", run_id, error);
        }
        if let Err(error) = context.machine.advance() {
            log::error!("[{}] {}", run_id, error);
        }
    }

    fn skip(&self, run_id: &str, index: usize, attempts: u32, reason: &str) {
        self.resolve(run_id, index, |entry| entry.skipped(attempts, reason));
    }

    fn finish(
        &self,
        run_id: String,
        brief: &CampaignBrief,
        started_at: DateTime<Utc>,
        abort: Option<AbortReason>,
        event_tx: &mpsc::Sender<SynthesisEvent>,
    ) -> Result<RunOutcome, PipelineError> {
        let mut context = lock(&self.context);
        let entries = std::mem::take(&mut context.log).into_entries();
        let stats = ReportStats::from_entries(&entries);

        let abort = abort.or_else(|| {
            (stats.succeeded == 0).then_some(AbortReason::NoResults {
                attempted: entries.len(),
            })
        });

        match abort {
            None => {
                context.machine.complete(stats.clone())?;
                log::info!(
                    "[{}] Run completed: {} succeeded, {} skipped, mean compliance {:?}",
                    run_id,
                    stats.succeeded,
                    stats.skipped,
                    stats.mean_compliance
                );
                emit(event_tx, &run_id, SynthesisEvent::RunCompleted { stats });
                Ok(RunOutcome::Completed(CampaignReport::new(
                    run_id,
                    brief.clone(),
                    started_at,
                    entries,
                )))
            }
            Some(reason) => {
                context.machine.abort(reason.clone())?;
                log::warn!("[{}] Run aborted: {}", run_id, reason);
                emit(
                    event_tx,
                    &run_id,
                    SynthesisEvent::RunAborted {
                        reason: reason.to_string(),
                    },
                );
                Ok(RunOutcome::Aborted {
                    run_id,
                    reason,
                    entries,
                })
            }
        }
    }
}

fn skipped_event(
    index: usize,
    processed: usize,
    total: usize,
    attempts: u32,
    reason: String,
) -> SynthesisEvent {
    SynthesisEvent::RecordSkipped {
        index,
        processed,
        total,
        attempts,
        reason,
    }
}

/// Sleep unless cancelled first. Returns false on cancellation.
async fn pause(duration: Duration, cancel_token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel_token.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn emit(event_tx: &mpsc::Sender<SynthesisEvent>, run_id: &str, event: SynthesisEvent) {
    if let Err(error) = event_tx.try_send(event) {
        log::debug!("[{}] Dropped progress event: {}", run_id, error);
    }
}
