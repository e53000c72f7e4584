use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use campaign_core::{CustomerRecord, MessageDraft, Tone};

use crate::error::{Result, ServiceError};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces one personalised draft per call. No batching, no caching.
#[async_trait]
pub trait MessageGenerator: Send + Sync {
    async fn synthesize(
        &self,
        record: &CustomerRecord,
        objective: &str,
        tone: Tone,
    ) -> Result<MessageDraft>;
}

#[async_trait]
impl<G: MessageGenerator + ?Sized> MessageGenerator for Arc<G> {
    async fn synthesize(
        &self,
        record: &CustomerRecord,
        objective: &str,
        tone: Tone,
    ) -> Result<MessageDraft> {
        (**self).synthesize(record, objective, tone).await
    }
}

/// Decorates a [`MessageGenerator`] with a per-call deadline. An elapsed
/// deadline surfaces as a retryable timeout error.
pub struct TimeoutGenerator<G: MessageGenerator> {
    inner: G,
    timeout: Duration,
}

impl<G: MessageGenerator> TimeoutGenerator<G> {
    pub fn new(inner: G, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl<G: MessageGenerator> MessageGenerator for TimeoutGenerator<G> {
    async fn synthesize(
        &self,
        record: &CustomerRecord,
        objective: &str,
        tone: Tone,
    ) -> Result<MessageDraft> {
        match tokio::time::timeout(self.timeout, self.inner.synthesize(record, objective, tone))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Generation for {} exceeded {:?}",
                    record.id(),
                    self.timeout
                );
                Err(ServiceError::timeout(format!(
                    "no response within {}s",
                    self.timeout.as_secs_f32()
                )))
            }
        }
    }
}
