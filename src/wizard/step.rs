//! Wizard steps and the per-step completion map

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One page of the event-creation wizard, in the order they must be completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKey {
    PlaceType,
    Category,
    BasicInfo,
    Intro,
    TicketSetting,
}

/// Logical grouping of steps shown as the two halves of the progress bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Place type through intro
    Metadata,
    /// Ticket configuration
    Tickets,
}

impl StepKey {
    /// All steps in wizard order
    pub const ALL: [StepKey; 5] = [
        StepKey::PlaceType,
        StepKey::Category,
        StepKey::BasicInfo,
        StepKey::Intro,
        StepKey::TicketSetting,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Position in wizard order (0-based)
    pub fn index(self) -> usize {
        self as usize
    }

    /// camelCase key used in persisted records
    pub fn as_str(self) -> &'static str {
        match self {
            StepKey::PlaceType => "placeType",
            StepKey::Category => "category",
            StepKey::BasicInfo => "basicInfo",
            StepKey::Intro => "intro",
            StepKey::TicketSetting => "ticketSetting",
        }
    }

    /// Path segment of the step's page
    pub fn slug(self) -> &'static str {
        match self {
            StepKey::PlaceType => "place-type",
            StepKey::Category => "category",
            StepKey::BasicInfo => "basic-info",
            StepKey::Intro => "intro",
            StepKey::TicketSetting => "ticket-setting",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StepKey::PlaceType => "Place type",
            StepKey::Category => "Category",
            StepKey::BasicInfo => "Basic info",
            StepKey::Intro => "Introduction",
            StepKey::TicketSetting => "Ticket setting",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            StepKey::TicketSetting => Phase::Tickets,
            _ => Phase::Metadata,
        }
    }

    /// Steps that must be complete before this one
    pub fn predecessors(self) -> &'static [StepKey] {
        &Self::ALL[..self.index()]
    }

    /// Parse a step identifier.
    ///
    /// Accepts the camelCase key, the route slug, or snake_case.
    pub fn parse(s: &str) -> Option<StepKey> {
        let normalized = s.trim().replace(['-', '_'], "").to_ascii_lowercase();
        StepKey::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == normalized)
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKey::parse(s).ok_or_else(|| {
            let known: Vec<&str> = StepKey::ALL.iter().map(|k| k.as_str()).collect();
            format!("unknown step '{}' (expected one of: {})", s, known.join(", "))
        })
    }
}

/// Completion flag for every wizard step.
///
/// Always holds exactly one flag per [`StepKey`]. On the wire it is a map
/// of camelCase step key to bool; unknown keys are dropped and missing ones
/// read as incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<StepKey, bool>",
    from = "BTreeMap<String, bool>"
)]
pub struct Completion {
    done: [bool; StepKey::COUNT],
}

impl Completion {
    /// Nothing complete
    pub fn new() -> Self {
        Self::default()
    }

    /// State right after an event is created: the place type is chosen
    /// as part of creation.
    pub fn after_creation() -> Self {
        let mut completion = Self::new();
        completion.set(StepKey::PlaceType, true);
        completion
    }

    /// Every step complete
    pub fn all_done() -> Self {
        Self {
            done: [true; StepKey::COUNT],
        }
    }

    pub fn get(&self, step: StepKey) -> bool {
        self.done[step.index()]
    }

    pub fn set(&mut self, step: StepKey, done: bool) {
        self.done[step.index()] = done;
    }

    /// Steps paired with their flags, in wizard order
    pub fn iter(&self) -> impl Iterator<Item = (StepKey, bool)> + '_ {
        StepKey::ALL.into_iter().map(move |k| (k, self.get(k)))
    }

    pub fn completed_count(&self) -> usize {
        self.done.iter().filter(|d| **d).count()
    }

    /// First step (in order) not yet complete
    pub fn first_incomplete(&self) -> Option<StepKey> {
        StepKey::ALL.into_iter().find(|k| !self.get(*k))
    }

    /// First predecessor of `step` that is still incomplete
    pub fn first_incomplete_before(&self, step: StepKey) -> Option<StepKey> {
        step.predecessors().iter().copied().find(|k| !self.get(*k))
    }

    pub fn is_all_done(&self) -> bool {
        self.done.iter().all(|d| *d)
    }

    /// Percentage of steps complete, rounded to the nearest integer
    pub fn percent(&self) -> u8 {
        let pct = (self.completed_count() * 100 + StepKey::COUNT / 2) / StepKey::COUNT;
        pct as u8
    }

    /// Whether every step of `phase` is complete
    pub fn phase_done(&self, phase: Phase) -> bool {
        self.iter()
            .filter(|(k, _)| k.phase() == phase)
            .all(|(_, done)| done)
    }
}

impl From<Completion> for BTreeMap<StepKey, bool> {
    fn from(completion: Completion) -> Self {
        completion.iter().collect()
    }
}

impl From<BTreeMap<String, bool>> for Completion {
    fn from(map: BTreeMap<String, bool>) -> Self {
        let mut completion = Completion::new();
        for (key, done) in map {
            // Exact camelCase match only; older builds wrote these keys verbatim
            if let Some(step) = StepKey::ALL.into_iter().find(|k| k.as_str() == key) {
                completion.set(step, done);
            }
        }
        completion
    }
}
