//! Webhook store trait definition.
//!
//! Covers two entity families: webhook registrations (CRUD plus delivery
//! counter mutation) and the bounded append-only log of fired events.

use gridflow_types::error::StoreError;
use gridflow_types::webhook::{WebhookEvent, WebhookRegistration};
use uuid::Uuid;

/// Store trait for webhook registrations and the fired-event history.
pub trait WebhookStore: Send + Sync {
    /// Insert a new registration. Fails with `Conflict` if the ID exists.
    fn insert(
        &self,
        registration: &WebhookRegistration,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Get a registration by ID.
    fn get(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<WebhookRegistration>, StoreError>> + Send;

    /// List all registrations.
    fn list(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<WebhookRegistration>, StoreError>> + Send;

    /// Replace a stored registration. Fails with `NotFound` if unknown.
    fn update(
        &self,
        registration: &WebhookRegistration,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Delete a registration by ID. Returns `true` if it existed.
    fn delete(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Record one delivery outcome: bump the success or failure counter and,
    /// on success, set `last_triggered`. Test deliveries never call this.
    fn record_delivery(
        &self,
        id: &Uuid,
        success: bool,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Append a fired event to the bounded history (oldest evicted first).
    fn append_event(
        &self,
        event: &WebhookEvent,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Most recent fired events, newest first, capped at `limit`.
    fn recent_events(
        &self,
        limit: usize,
    ) -> impl std::future::Future<Output = Result<Vec<WebhookEvent>, StoreError>> + Send;
}
