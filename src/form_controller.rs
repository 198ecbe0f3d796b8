//! Prediction form controller.
//!
//! Owns the form state and runs at most one prediction request at a time.
//! Every submission gets a generation number; a response that comes back
//! after a reset, a cancel, or a newer submission is discarded.
use crate::cancellation::CancellationSource;
use crate::config::Config;
use crate::models::{CustomerProfile, Field, FieldErrors, PredictionOutcome, ValidatedPayload};
use crate::prediction_client::{PredictOptions, PredictionClient};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Receives the outcome of every completed submission and shows it.
///
/// Successes and failures both arrive here, so the results view always has
/// something to render.
pub trait ResultsNavigator: Send + Sync {
    fn show_results(&self, outcome: &PredictionOutcome);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Deadline for a whole submission, warm-up included.
    pub timeout: Duration,
    /// Probe the service before predicting.
    pub warm_up: bool,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.timeout,
            warm_up: config.warm_up,
        }
    }
}

/// What a call to [`FormController::submit`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStatus {
    /// Validation failed; nothing was sent.
    Invalid(FieldErrors),
    /// Another submission is still in flight; this call did nothing.
    Busy,
    /// The request finished and its outcome was stored and shown.
    Completed(PredictionOutcome),
    /// The request finished after a reset, cancel or newer submission and was dropped.
    Superseded,
}

/// Read-only copy of the form state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSnapshot {
    pub profile: CustomerProfile,
    pub errors: FieldErrors,
    pub in_flight: bool,
    pub outcome: Option<PredictionOutcome>,
    /// Message of the last failed submission, until dismissed or edited.
    pub banner: Option<String>,
}

fn lock_state(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    // Never held across an await; every critical section leaves the state whole.
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct FormState {
    form: FormSnapshot,
    generation: u64,
    cancel: Option<CancellationSource>,
}

impl FormState {
    /// Aborts the in-flight request, if any, and invalidates its result.
    fn abandon_request(&mut self) -> bool {
        self.generation += 1;
        self.form.in_flight = false;
        match self.cancel.take() {
            Some(source) => {
                source.cancel();
                true
            }
            None => false,
        }
    }
}

/// Releases a submission whose future was dropped before it finished.
struct InFlightGuard {
    state: Arc<Mutex<FormState>>,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = lock_state(&self.state);
        if state.generation == self.generation && state.form.in_flight {
            tracing::info!("Submission #{} dropped before completion", self.generation);
            state.abandon_request();
        }
    }
}

#[derive(Clone)]
pub struct FormController {
    client: PredictionClient,
    navigator: Arc<dyn ResultsNavigator>,
    settings: ControllerSettings,
    state: Arc<Mutex<FormState>>,
}

impl FormController {
    pub fn new(
        client: PredictionClient,
        navigator: Arc<dyn ResultsNavigator>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            client,
            navigator,
            settings,
            state: Arc::new(Mutex::new(FormState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        lock_state(&self.state)
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.lock().form.clone()
    }

    pub fn is_in_flight(&self) -> bool {
        self.lock().form.in_flight
    }

    /// Records an edit. Clears that field's error and the banner; does not validate.
    pub fn on_field_change(&self, field: Field, value: impl Into<String>) {
        let mut state = self.lock();
        state.form.profile.set(field, value);
        state.form.errors.remove(&field);
        state.form.banner = None;
    }

    pub fn dismiss_banner(&self) {
        self.lock().form.banner = None;
    }

    /// Validates the current profile and, if it passes, requests a prediction.
    ///
    /// Dropping the returned future abandons the request and frees the form
    /// for the next submission.
    pub async fn submit(&self) -> SubmitStatus {
        let (payload, generation, token) = {
            let mut state = self.lock();
            if state.form.in_flight {
                tracing::debug!("Submission ignored: a prediction is already in flight");
                return SubmitStatus::Busy;
            }

            state.form.banner = None;
            state.form.outcome = None;
            let payload = match ValidatedPayload::try_from(&state.form.profile) {
                Ok(payload) => payload,
                Err(errors) => {
                    tracing::info!(
                        "Submission blocked by {} invalid field(s): {:?}",
                        errors.len(),
                        errors.keys().collect::<Vec<_>>()
                    );
                    state.form.errors = errors.clone();
                    return SubmitStatus::Invalid(errors);
                }
            };

            let source = CancellationSource::new();
            let token = source.token();
            state.form.errors.clear();
            state.form.in_flight = true;
            state.generation += 1;
            state.cancel = Some(source);
            (payload, state.generation, token)
        };

        let _guard = InFlightGuard {
            state: Arc::clone(&self.state),
            generation,
        };
        let started = Instant::now();
        tracing::info!("Submitting prediction request #{}", generation);

        if self.settings.warm_up {
            let mut aborted = token.clone();
            let deadline = started + self.settings.timeout;
            tokio::select! {
                _ = tokio::time::timeout_at(deadline, self.client.warm_up()) => {}
                _ = aborted.cancelled() => {}
            }
        }

        let options = PredictOptions {
            timeout: Some(self.settings.timeout),
            cancel: Some(token),
            started_at: Some(started),
        };
        let outcome = PredictionOutcome::from(self.client.predict(&payload, options).await);

        {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::info!(
                    "Discarding result of request #{} (current is #{})",
                    generation,
                    state.generation
                );
                return SubmitStatus::Superseded;
            }

            state.form.in_flight = false;
            state.cancel = None;
            state.form.banner = outcome.failure().map(|failure| failure.message.clone());
            state.form.outcome = Some(outcome.clone());
        }

        self.navigator.show_results(&outcome);
        SubmitStatus::Completed(outcome)
    }

    /// Aborts the in-flight request, e.g. on teardown.
    ///
    /// Returns `false` when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        if !state.form.in_flight {
            return false;
        }
        tracing::info!("Cancelling prediction request #{}", state.generation);
        state.abandon_request()
    }

    /// Restores the empty form and drops any result or pending request.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.abandon_request() {
            tracing::debug!("Reset cancelled an in-flight prediction");
        }
        state.form = FormSnapshot::default();
    }
}
