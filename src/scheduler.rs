//! Batch scheduler: walks the resource list window by window and records
//! every outcome in the store and the log.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use crate::config::{MAX_BATCH_SIZE, MAX_SPEED, MIN_BATCH_SIZE, MIN_SPEED};
use crate::error::{Result, TranslateError};
use crate::invoker::RateLimitInvoker;
use crate::progress::LogSink;
use crate::resource::ResourceStore;
use crate::translate::TranslationBackend;

/// Pause after a window that stayed throttled, whatever the speed
pub const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(5);

/// Pause between windows for a speed setting (1 = slowest)
pub fn speed_delay(speed: u8) -> Duration {
    let millis = match speed.clamp(MIN_SPEED, MAX_SPEED) {
        1 => 3000,
        2 => 2000,
        3 => 1000,
        4 => 500,
        _ => 200,
    };
    Duration::from_millis(millis)
}

/// Split `start..len` into consecutive windows of `batch_size`; the last may be shorter
pub fn window_ranges(start: usize, len: usize, batch_size: usize) -> Vec<Range<usize>> {
    let batch_size = batch_size.max(1);
    (start..len)
        .step_by(batch_size)
        .map(|window_start| window_start..(window_start + batch_size).min(len))
        .collect()
}

/// Cooperative stop request, polled before and after each window
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every window was processed
    Completed,
    /// The cancellation flag was seen; unfinished items are left for a later continue
    Stopped,
    /// Continue found no incomplete item
    NothingToDo,
}

/// Drives one translation run at a time over a shared `ResourceStore`.
///
/// The scheduler is the only writer to the store while a run is active.
/// Callers must not start a second run before the first returns.
pub struct BatchScheduler {
    backend: Arc<dyn TranslationBackend>,
    store: ResourceStore,
    log: LogSink,
    cancel: CancellationFlag,
    invoker: RateLimitInvoker,
}

impl BatchScheduler {
    pub fn new(backend: Arc<dyn TranslationBackend>, store: ResourceStore, log: LogSink) -> Self {
        Self {
            backend,
            store,
            log,
            cancel: CancellationFlag::new(),
            invoker: RateLimitInvoker::default(),
        }
    }

    pub fn with_invoker(mut self, invoker: RateLimitInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    /// Ask the active run to stop after its current window
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Translate everything from the first item
    pub async fn translate_all(
        &self,
        target_language: &str,
        speed: u8,
        batch_size: usize,
    ) -> Result<RunOutcome> {
        if self.store.is_empty() {
            self.log.error("No strings to translate");
            return Err(TranslateError::NothingToTranslate);
        }
        self.run_from(target_language, 0, speed, batch_size).await
    }

    /// Pick up at the first blank, non-errored item. Also used to resume after a stop.
    pub async fn continue_translation(
        &self,
        target_language: &str,
        speed: u8,
        batch_size: usize,
    ) -> Result<RunOutcome> {
        match self.store.first_incomplete_index() {
            Some(start_index) => {
                self.run_from(target_language, start_index, speed, batch_size)
                    .await
            }
            None => {
                self.log.info("All strings are already translated");
                Ok(RunOutcome::NothingToDo)
            }
        }
    }

    /// Run the window loop from `start_index`.
    ///
    /// Classified backend failures only mark their window errored. Any other
    /// error ends the run and is returned; finished items keep their values.
    pub async fn run_from(
        &self,
        target_language: &str,
        start_index: usize,
        speed: u8,
        batch_size: usize,
    ) -> Result<RunOutcome> {
        self.store.set_translating(true);
        self.cancel.reset();

        let result = self
            .run_windows(target_language, start_index, speed, batch_size)
            .await;

        self.clear_in_flight();
        self.store.set_translating(false);

        if let Err(e) = &result {
            self.log.error(format!("Translation run aborted: {}", e));
        }
        result
    }

    async fn run_windows(
        &self,
        target_language: &str,
        start_index: usize,
        speed: u8,
        batch_size: usize,
    ) -> Result<RunOutcome> {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        let batch_size = batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
        let total = self.store.len();

        self.log.info(format!(
            "Starting translation with model {} to {} (speed {}, batch size {}) from index {}",
            self.backend.model(),
            target_language,
            speed,
            batch_size,
            start_index
        ));

        for window in window_ranges(start_index, total, batch_size) {
            if self.cancel.is_cancelled() {
                self.log.info("Translation stopped on request.");
                return Ok(RunOutcome::Stopped);
            }

            let is_last = window.end >= total;
            let snapshot = self.store.snapshot();
            let pending: Vec<usize> = window
                .clone()
                .filter(|&index| snapshot[index].needs_translation())
                .collect();

            let mut throttled = false;
            if !pending.is_empty() {
                debug!("Window {:?}: {} strings to translate", window, pending.len());
                let texts: Vec<String> = pending
                    .iter()
                    .map(|&index| snapshot[index].source_value.clone())
                    .collect();
                self.mark_in_flight(&pending);

                match self
                    .invoker
                    .invoke(self.backend.as_ref(), &texts, target_language)
                    .await
                {
                    Ok(translations) => self.apply_translations(&pending, translations),
                    Err(e) if e.is_rate_limited() => {
                        self.mark_errored(&pending);
                        self.log.warning(format!(
                            "Rate limit reached, {} strings marked as failed: {}",
                            pending.len(),
                            e
                        ));
                        throttled = true;
                    }
                    Err(e) if e.is_classified() => {
                        let names = self.mark_errored(&pending);
                        for name in names {
                            self.log
                                .error(format!("Translation failed for key '{}': {}", name, e));
                        }
                    }
                    Err(e) => return Err(e),
                }
            }

            if self.cancel.is_cancelled() {
                self.log.info("Translation stopped on request.");
                return Ok(RunOutcome::Stopped);
            }

            // no pause after the last window, and no speed delay after a window that made no call
            if is_last {
                break;
            }
            if throttled {
                self.log.info(format!(
                    "Waiting {} seconds before the next batch...",
                    RATE_LIMIT_COOLDOWN.as_secs()
                ));
                sleep(RATE_LIMIT_COOLDOWN).await;
            } else if !pending.is_empty() {
                sleep(speed_delay(speed)).await;
            }
        }

        let progress = self.store.progress();
        self.log.info(format!(
            "Translation finished: {}/{} strings processed",
            progress.done, progress.total
        ));
        Ok(RunOutcome::Completed)
    }

    fn mark_in_flight(&self, indices: &[usize]) {
        self.store.update(|resources| {
            for &index in indices {
                if let Some(resource) = resources.get_mut(index) {
                    resource.is_translating = true;
                    resource.has_error = false;
                }
            }
        });
    }

    /// Flag `indices` as failed and return their names
    fn mark_errored(&self, indices: &[usize]) -> Vec<String> {
        let mut names = Vec::with_capacity(indices.len());
        self.store.update(|resources| {
            for &index in indices {
                if let Some(resource) = resources.get_mut(index) {
                    resource.is_translating = false;
                    resource.has_error = true;
                    names.push(resource.name.clone());
                }
            }
        });
        names
    }

    /// Write results back in order. Items without a usable result are marked errored.
    fn apply_translations(&self, indices: &[usize], translations: Vec<String>) {
        let received = translations.len();
        let mut translations = translations.into_iter();
        let mut succeeded = Vec::new();
        let mut unmatched = Vec::new();

        self.store.update(|resources| {
            for &index in indices {
                let Some(resource) = resources.get_mut(index) else {
                    continue;
                };
                resource.is_translating = false;
                match translations.next() {
                    Some(translated) if !translated.trim().is_empty() => {
                        resource.translated_value = translated;
                        resource.has_error = false;
                        succeeded.push(resource.name.clone());
                    }
                    _ => {
                        resource.has_error = true;
                        unmatched.push(resource.name.clone());
                    }
                }
            }
        });

        for name in &succeeded {
            self.log.success(format!("Successfully translated key '{}'", name));
        }
        if !unmatched.is_empty() {
            self.log.warning(format!(
                "Expected {} translations but received {}; marked as failed: {}",
                indices.len(),
                received,
                unmatched.join(", ")
            ));
        }
    }

    fn clear_in_flight(&self) {
        let any_in_flight = self.store.snapshot().iter().any(|r| r.is_translating);
        if any_in_flight {
            self.store.update(|resources| {
                for resource in resources.iter_mut() {
                    resource.is_translating = false;
                }
            });
        }
    }
}
