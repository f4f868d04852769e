//! event-wizard - progress tracking for the event-creation wizard
//!
//! The wizard walks an organizer through place type, category, basic info,
//! intro and ticket setting. This crate keeps track of which of those steps
//! are done, decides which step pages may be opened, persists progress
//! across restarts, and talks to the activity API that owns the event data.

pub mod api;
pub mod config;
pub mod logging;
pub mod wizard;

pub use api::{ActivityApi, ApiError, HttpActivityApi, Organization};
pub use config::Config;
pub use wizard::{
    FileStorage, GuardPolicy, StepGuard, StepKey, WizardError, WizardProgress, WizardStore,
};
