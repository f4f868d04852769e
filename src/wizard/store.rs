//! Progress store for the event-creation wizard
//!
//! [`WizardStore`] is the single record of how far the organizer has gotten.
//! It is more conservative than the remote activity: a step only counts once
//! the page that owns it has saved remotely and called
//! [`WizardStore::mark_step_complete`].

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{StorageError, WizardError};
use super::guard::{GuardPolicy, StepGuard};
use super::progress::WizardProgress;
use super::step::{Completion, Phase, StepKey};
use super::storage::ProgressStorage;
use crate::api::{ActivityApi, ActivitySnapshot, ApiError, CreateActivityRequest, Organization};

/// Wizard state owned by the wizard's root view and handed to each page
pub struct WizardStore<A, S> {
    api: A,
    storage: S,
    policy: GuardPolicy,
    progress: WizardProgress,

    // Transient, never persisted
    loading: bool,
    error: Option<String>,
    snapshot: Option<ActivitySnapshot>,
}

/// Holds `loading` for the duration of a request, including a dropped one
struct InFlight<'a>(&'a mut bool);

impl<'a> InFlight<'a> {
    fn begin(loading: &'a mut bool) -> Self {
        *loading = true;
        Self(loading)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0 = false;
    }
}

/// Race a request against cancellation
async fn race<T>(
    cancel: &CancellationToken,
    request: impl Future<Output = Result<T, ApiError>>,
) -> Result<T, WizardError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(WizardError::Cancelled),
        result = request => result.map_err(WizardError::from),
    }
}

impl<A: ActivityApi, S: ProgressStorage> WizardStore<A, S> {
    /// Open the store, resuming any persisted progress
    pub fn open(api: A, storage: S) -> Result<Self, WizardError> {
        let progress = storage.load()?.unwrap_or_default();
        if let Some(event_id) = progress.event_id {
            debug!(
                event_id,
                percent = progress.completion.percent(),
                "resumed wizard progress"
            );
        }

        Ok(Self {
            api,
            storage,
            policy: GuardPolicy::default(),
            progress,
            loading: false,
            error: None,
            snapshot: None,
        })
    }

    pub fn with_policy(mut self, policy: GuardPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn event_id(&self) -> Option<i64> {
        self.progress.event_id
    }

    pub fn organization(&self) -> Option<&Organization> {
        self.progress.organization.as_ref()
    }

    pub fn completion(&self) -> &Completion {
        &self.progress.completion
    }

    pub fn progress(&self) -> &WizardProgress {
        &self.progress
    }

    /// Last fetched remote activity, if it is for the current event
    pub fn snapshot(&self) -> Option<&ActivitySnapshot> {
        self.snapshot
            .as_ref()
            .filter(|s| Some(s.id) == self.progress.event_id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed remote call
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Navigation guard over the current completion map
    pub fn guard(&self) -> StepGuard {
        StepGuard::new(self.progress.completion, self.policy)
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    pub fn is_step_complete(&self, step: StepKey) -> bool {
        self.progress.completion.get(step)
    }

    pub fn overall_progress_percent(&self) -> u8 {
        self.progress.completion.percent()
    }

    /// Metadata phase (place type through intro) is complete
    pub fn is_step_one_done(&self) -> bool {
        self.progress.completion.phase_done(Phase::Metadata)
    }

    /// Ticket phase is complete
    pub fn is_step_two_done(&self) -> bool {
        self.progress.completion.phase_done(Phase::Tickets)
    }

    // ─── Local mutations ────────────────────────────────────────────────────

    pub fn set_event_id(&mut self, event_id: i64) -> Result<(), WizardError> {
        self.progress.event_id = Some(event_id);
        self.persist()
    }

    pub fn set_organization(&mut self, organization: Organization) -> Result<(), WizardError> {
        self.progress.organization = Some(organization);
        self.persist()
    }

    /// Record whether `step` is complete.
    ///
    /// The caller must already have saved the step remotely. A step cannot be
    /// marked complete while an earlier one is still open; marking a step
    /// incomplete only touches that step.
    pub fn mark_step_complete(&mut self, step: StepKey, done: bool) -> Result<(), WizardError> {
        if done {
            if let Some(blocking) = self.progress.completion.first_incomplete_before(step) {
                return Err(WizardError::StepOutOfOrder { step, blocking });
            }
        }

        if self.progress.completion.get(step) == done {
            return Ok(());
        }

        self.progress.completion.set(step, done);
        info!(%step, done, percent = self.overall_progress_percent(), "wizard step updated");
        self.persist()
    }

    /// Clear everything, but only if `event_id` is the event in progress
    pub fn reset(&mut self, event_id: i64) -> Result<bool, WizardError> {
        if self.progress.event_id != Some(event_id) {
            debug!(
                event_id,
                current = ?self.progress.event_id,
                "ignoring reset for another event"
            );
            return Ok(false);
        }
        self.complete_and_clear()?;
        Ok(true)
    }

    /// Unconditional full reset.
    ///
    /// The record is removed first; if that fails nothing in memory changes.
    pub fn complete_and_clear(&mut self) -> Result<(), WizardError> {
        self.storage.clear()?;
        self.forget();
        Ok(())
    }

    // ─── Remote operations ──────────────────────────────────────────────────

    /// Create the activity under the selected organization.
    ///
    /// Creation satisfies the place-type step, so progress restarts at
    /// category. Any progress for a previous event is discarded.
    pub async fn create_event(
        &mut self,
        is_online: bool,
        livestream_url: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<i64, WizardError> {
        let organization = self
            .progress
            .organization
            .as_ref()
            .ok_or(WizardError::MissingOrganization)?;

        let request = CreateActivityRequest {
            organization_id: organization.id,
            is_online,
            livestream_url: livestream_url.filter(|u| !u.trim().is_empty()),
        };

        self.error = None;
        let result = {
            let _in_flight = InFlight::begin(&mut self.loading);
            race(cancel, self.api.create_activity(&request)).await
        };

        let created = result.inspect_err(|e| self.record_failure(e))?;

        if let Some(previous) = self.progress.event_id.filter(|id| *id != created.id) {
            info!(previous, "discarding progress for previous event");
        }
        self.progress.event_id = Some(created.id);
        self.progress.completion = Completion::after_creation();
        self.snapshot = None;
        info!(event_id = created.id, "event created");

        self.persist()?;
        Ok(created.id)
    }

    /// Fetch the remote activity for the current event.
    ///
    /// A failed fetch means the remembered event is gone or inaccessible;
    /// all local progress is cleared and [`WizardError::StaleEvent`] returned.
    pub async fn load_remote_snapshot(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&ActivitySnapshot, WizardError> {
        let event_id = self.progress.event_id.ok_or(WizardError::NoActiveEvent)?;

        self.error = None;
        let result = {
            let _in_flight = InFlight::begin(&mut self.loading);
            race(cancel, self.api.get_activity(event_id)).await
        };

        match result {
            Ok(snapshot) => Ok(&*self.snapshot.insert(snapshot)),
            Err(WizardError::Api(source)) => {
                warn!(event_id, error = %source, "activity unavailable, clearing wizard progress");
                // The stale event is dropped from memory even if the record
                // outlives it; the next fetch retries the removal
                if let Err(e) = self.discard() {
                    warn!(event_id, error = %e, "failed to remove stale wizard progress");
                }
                let err = WizardError::StaleEvent { event_id, source };
                self.record_failure(&err);
                Err(err)
            }
            Err(other) => Err(other),
        }
    }

    /// Fetch the remote activity unless it is already cached for this event
    pub async fn ensure_snapshot(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<&ActivitySnapshot, WizardError> {
        if self.snapshot().is_none() {
            self.load_remote_snapshot(cancel).await?;
        }
        self.snapshot().ok_or(WizardError::NoActiveEvent)
    }

    /// Publish the event and clear the wizard.
    ///
    /// Returns the published event id.
    pub async fn publish_event(&mut self, cancel: &CancellationToken) -> Result<i64, WizardError> {
        let event_id = self.progress.event_id.ok_or(WizardError::NoActiveEvent)?;
        if !self.guard().can_publish() {
            return Err(WizardError::NotReadyToPublish);
        }

        self.error = None;
        let result = {
            let _in_flight = InFlight::begin(&mut self.loading);
            race(cancel, self.api.publish_activity(event_id)).await
        };

        result.inspect_err(|e| self.record_failure(e))?;

        info!(event_id, "event published");
        if let Err(source) = self.discard() {
            let err = WizardError::PublishedNotCleared { event_id, source };
            self.record_failure(&err);
            return Err(err);
        }
        Ok(event_id)
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn forget(&mut self) {
        self.progress = WizardProgress::default();
        self.snapshot = None;
        self.error = None;
        self.loading = false;
    }

    /// Drop in-memory state, then remove the record
    fn discard(&mut self) -> Result<(), StorageError> {
        self.forget();
        self.storage.clear()
    }

    fn record_failure(&mut self, err: &WizardError) {
        if !matches!(err, WizardError::Cancelled) {
            self.error = Some(err.to_string());
        }
    }

    /// Write the durable subset; an empty state removes the record
    fn persist(&self) -> Result<(), WizardError> {
        if self.progress.is_empty() {
            self.storage.clear()?;
        } else {
            self.storage.save(&self.progress)?;
        }
        Ok(())
    }
}
