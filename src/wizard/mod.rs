//! Event-creation wizard: progress store, step guard and persistence

pub mod error;
pub mod guard;
pub mod progress;
pub mod step;
pub mod storage;
pub mod store;


pub use error::{StorageError, WizardError};
pub use guard::{management_path, step_path, CurrentStep, GuardPolicy, Navigation, StepGuard};
pub use progress::WizardProgress;
pub use step::{Completion, Phase, StepKey};
pub use storage::{FileStorage, MemoryStorage, ProgressStorage};
pub use store::WizardStore;
