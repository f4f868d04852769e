//! Request and response bodies for the activity API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Organizer context an event is created under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
}

/// Body of `POST /activities`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivityRequest {
    pub organization_id: i64,
    pub is_online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub livestream_url: Option<String>,
}

/// `data` payload of a successful create call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedActivity {
    pub id: i64,
}

/// A ticket type attached to an activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: i64,
    pub name: String,
    /// Price in minor currency units
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub description: Option<String>,
}

/// The backend's record for an activity being created.
///
/// Every field except `id` may still be empty while the wizard is in
/// progress, so they all default.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySnapshot {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub livestream_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub notice: Option<String>,
    #[serde(default)]
    pub ticket_types: Vec<TicketType>,
}

impl ActivitySnapshot {
    /// Title for display, falling back to the id
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Untitled activity #{}", self.id))
    }
}
