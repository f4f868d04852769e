//! Client for the remote activity API
//!
//! The wizard never owns activity data; it creates, reads and publishes
//! activities through the [`ActivityApi`] trait. [`HttpActivityApi`] is the
//! `reqwest` implementation used outside of tests.

pub mod client;
pub mod error;
pub mod types;

pub use client::HttpActivityApi;
pub use error::ApiError;
pub use types::{
    ActivitySnapshot, CreateActivityRequest, CreatedActivity, Organization, TicketType,
};

use std::sync::Arc;

use async_trait::async_trait;

/// Operations the wizard needs from the activity backend
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// Create a draft activity and return its id
    async fn create_activity(
        &self,
        request: &CreateActivityRequest,
    ) -> Result<CreatedActivity, ApiError>;

    /// Fetch the current state of an activity
    async fn get_activity(&self, activity_id: i64) -> Result<ActivitySnapshot, ApiError>;

    /// Publish a fully configured activity
    async fn publish_activity(&self, activity_id: i64) -> Result<(), ApiError>;
}

#[async_trait]
impl<T: ActivityApi + ?Sized> ActivityApi for Arc<T> {
    async fn create_activity(
        &self,
        request: &CreateActivityRequest,
    ) -> Result<CreatedActivity, ApiError> {
        (**self).create_activity(request).await
    }

    async fn get_activity(&self, activity_id: i64) -> Result<ActivitySnapshot, ApiError> {
        (**self).get_activity(activity_id).await
    }

    async fn publish_activity(&self, activity_id: i64) -> Result<(), ApiError> {
        (**self).publish_activity(activity_id).await
    }
}
