use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_trace, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::cache::ConversionCache;
use crate::clean::clean_response;
use crate::completion::{CompletionClient, CompletionRequest, DEFAULT_MODEL};
use crate::prompt::{build_prompt, FALLBACK_PROMPT};
use crate::timer::{BackoffPolicy, Timer, TokioTimer};
use crate::{
    ConversionError, ConversionOutcome, ConversionProgress, EngineEvent, FailureKind, RequestId,
    Stage,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub backoff: BackoffPolicy,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            max_output_tokens: 1024,
            temperature: 0.1,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

struct InFlight {
    call: u64,
    token: CancellationToken,
}

/// Ticket for the live call, obtained from [`Converter::admit`].
#[derive(Debug)]
pub struct CallSlot {
    call: u64,
    token: CancellationToken,
    input: String,
    api_key: String,
}

/// How [`Converter::admit`] disposed of a call.
#[derive(Debug)]
pub enum Admission {
    /// Answered without touching the network or the live call.
    Settled(ConversionOutcome),
    /// Installed as the live call; finish it with [`Converter::convert_claimed`].
    Claimed(CallSlot),
}

/// Turns a pasted reference into BibTeX through the completion endpoint.
///
/// Only the most recent call that needs the network is live: claiming a call
/// cancels the one before it, which then resolves to
/// [`ConversionOutcome::Superseded`] without touching the cache. Blank input,
/// a missing credential and cache hits are answered up front and leave the
/// live call alone.
pub struct Converter {
    settings: ConverterSettings,
    template: String,
    client: Arc<dyn CompletionClient>,
    timer: Arc<dyn Timer>,
    cache: ConversionCache,
    in_flight: Mutex<Option<InFlight>>,
    next_call: AtomicU64,
}

impl Converter {
    pub fn new(settings: ConverterSettings, client: Arc<dyn CompletionClient>) -> Self {
        Self {
            settings,
            template: FALLBACK_PROMPT.to_string(),
            client,
            timer: Arc::new(TokioTimer),
            cache: ConversionCache::new(),
            in_flight: Mutex::new(None),
            next_call: AtomicU64::new(1),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ConversionCache {
        &self.cache
    }

    pub async fn convert(&self, text: &str) -> ConversionOutcome {
        self.convert_with_progress(0, text, &NullProgressSink).await
    }

    pub async fn convert_with_progress(
        &self,
        request_id: RequestId,
        text: &str,
        sink: &dyn ProgressSink,
    ) -> ConversionOutcome {
        match self.admit(request_id, text, sink) {
            Admission::Settled(outcome) => outcome,
            Admission::Claimed(slot) => self.convert_claimed(slot, request_id, sink).await,
        }
    }

    /// Settles blank, unconfigured and cached calls; otherwise makes this
    /// call the live one, cancelling its predecessor.
    ///
    /// Admission is synchronous so a caller can fix the supersession order
    /// before the conversion itself is scheduled.
    pub fn admit(&self, request_id: RequestId, text: &str, sink: &dyn ProgressSink) -> Admission {
        let input = text.trim();
        if input.is_empty() {
            engine_trace!("request {} has empty input; nothing to convert", request_id);
            return Admission::Settled(ConversionOutcome::NothingToConvert);
        }

        let Some(api_key) = self
            .settings
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
        else {
            engine_warn!("request {} rejected: no api key configured", request_id);
            return Admission::Settled(ConversionOutcome::Failed(ConversionError::new(
                FailureKind::NotConfigured,
                "no api key configured",
            )));
        };

        if let Some(bibtex) = self.cache.get(input) {
            engine_debug!("request {} served from cache", request_id);
            emit(sink, request_id, Stage::CacheHit);
            return Admission::Settled(ConversionOutcome::Converted {
                bibtex,
                from_cache: true,
            });
        }

        let call = self.next_call.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.in_flight().replace(InFlight {
            call,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            engine_debug!("call {} supersedes call {}", call, previous.call);
            previous.token.cancel();
        }
        Admission::Claimed(CallSlot {
            call,
            token,
            input: input.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn convert_claimed(
        &self,
        slot: CallSlot,
        request_id: RequestId,
        sink: &dyn ProgressSink,
    ) -> ConversionOutcome {
        let outcome = self.run(request_id, &slot, sink).await;
        self.finish_call(slot.call);
        outcome
    }

    /// Cancels the live call, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.in_flight().take() {
            engine_debug!("cancelling call {}", previous.call);
            previous.token.cancel();
        }
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn run(
        &self,
        request_id: RequestId,
        slot: &CallSlot,
        sink: &dyn ProgressSink,
    ) -> ConversionOutcome {
        let CallSlot {
            token,
            input,
            api_key,
            ..
        } = slot;
        if token.is_cancelled() {
            return self.superseded(request_id);
        }

        let request = CompletionRequest {
            model: self.settings.model.clone(),
            prompt: build_prompt(&self.template, input),
            max_output_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
        };

        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            if token.is_cancelled() {
                return self.superseded(request_id);
            }

            engine_info!(
                "request {} attempt {}/{} model={} input_len={}",
                request_id,
                attempt,
                max_attempts,
                request.model,
                input.len()
            );
            emit(sink, request_id, Stage::Requesting { attempt });

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => return self.superseded(request_id),
                result = self.attempt(api_key, &request) => result,
            };

            let err = match result {
                Ok(bibtex) => {
                    if token.is_cancelled() {
                        return self.superseded(request_id);
                    }
                    self.cache.insert(input, bibtex.clone());
                    emit(sink, request_id, Stage::Done);
                    return ConversionOutcome::Converted {
                        bibtex,
                        from_cache: false,
                    };
                }
                Err(err) => err,
            };

            engine_warn!(
                "request {} attempt {} failed: {}",
                request_id,
                attempt,
                err
            );
            let retry = err.kind.is_retryable() && attempt < max_attempts;
            last_error = Some(err);
            if !retry {
                break;
            }

            let delay = self.settings.backoff.delay(attempt);
            emit(
                sink,
                request_id,
                Stage::BackingOff {
                    attempt,
                    delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                },
            );
            tokio::select! {
                biased;
                _ = token.cancelled() => return self.superseded(request_id),
                _ = self.timer.sleep(delay) => {}
            }
        }

        let err = last_error.unwrap_or_else(|| {
            ConversionError::new(FailureKind::Network, "no attempt was made")
        });
        engine_warn!("request {} gave up: {}", request_id, err);
        ConversionOutcome::Failed(err)
    }

    /// One network attempt raced against the attempt timeout, then cleaned.
    async fn attempt(
        &self,
        api_key: &str,
        request: &CompletionRequest,
    ) -> Result<String, ConversionError> {
        let timeout = self.settings.attempt_timeout;
        let raw = tokio::select! {
            result = self.client.complete(api_key, request) => result?,
            _ = self.timer.sleep(timeout) => {
                return Err(ConversionError::new(
                    FailureKind::Timeout,
                    format!("no response within {timeout:?}"),
                ));
            }
        };

        let cleaned = clean_response(&raw);
        if cleaned.is_empty() {
            return Err(ConversionError::new(
                FailureKind::EmptyResponse,
                "response was empty after cleaning",
            ));
        }
        Ok(cleaned)
    }

    fn finish_call(&self, call: u64) {
        let mut guard = self.in_flight();
        if guard.as_ref().is_some_and(|current| current.call == call) {
            *guard = None;
        }
    }

    fn superseded(&self, request_id: RequestId) -> ConversionOutcome {
        engine_debug!("request {} superseded; discarding", request_id);
        ConversionOutcome::Superseded
    }
}

fn emit(sink: &dyn ProgressSink, request_id: RequestId, stage: Stage) {
    sink.emit(EngineEvent::Progress(ConversionProgress { request_id, stage }));
}
