//! Navigation guard for wizard pages
//!
//! Pure decisions over a [`Completion`] map: which step pages may be opened,
//! where to send the user otherwise, and whether the event can be published.

use super::step::{Completion, StepKey};

/// How identifiers that are not wizard steps are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardPolicy {
    /// Unknown pages are accessible
    #[default]
    Lenient,
    /// Unknown pages are refused
    Strict,
}

/// Where the wizard currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentStep {
    Step(StepKey),
    Completed,
}

impl CurrentStep {
    pub fn as_str(self) -> &'static str {
        match self {
            CurrentStep::Step(step) => step.as_str(),
            CurrentStep::Completed => "completed",
        }
    }
}

/// Outcome of a navigation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(String),
}

/// Route of a wizard step page
pub fn step_path(event_id: i64, step: StepKey) -> String {
    format!("/create-event/{}/{}", event_id, step.slug())
}

/// Route of the event's management page once creation is finished
pub fn management_path(event_id: i64) -> String {
    format!("/organizer/events/{event_id}")
}

#[derive(Debug, Clone, Copy)]
pub struct StepGuard {
    completion: Completion,
    policy: GuardPolicy,
}

impl StepGuard {
    pub fn new(completion: Completion, policy: GuardPolicy) -> Self {
        Self { completion, policy }
    }

    /// A step is reachable when it is complete or is the first incomplete one
    pub fn can_access_step(&self, target: StepKey) -> bool {
        self.completion.get(target) || self.completion.first_incomplete() == Some(target)
    }

    /// Same as [`Self::can_access_step`] for a raw page identifier
    pub fn can_access(&self, target: &str) -> bool {
        match StepKey::parse(target) {
            Some(step) => self.can_access_step(step),
            None => self.policy == GuardPolicy::Lenient,
        }
    }

    /// Route of the first incomplete step, or the management page when done
    pub fn next_incomplete_step_path(&self, event_id: i64) -> String {
        match self.current_step_key() {
            CurrentStep::Step(step) => step_path(event_id, step),
            CurrentStep::Completed => management_path(event_id),
        }
    }

    pub fn current_step_key(&self) -> CurrentStep {
        self.completion
            .first_incomplete()
            .map_or(CurrentStep::Completed, CurrentStep::Step)
    }

    pub fn can_publish(&self) -> bool {
        self.completion.is_all_done()
    }

    /// Decide whether a page for `target` may be shown for `event_id`
    pub fn check(&self, target: &str, event_id: i64) -> Navigation {
        if self.can_access(target) {
            Navigation::Allow
        } else {
            Navigation::Redirect(self.next_incomplete_step_path(event_id))
        }
    }
}
