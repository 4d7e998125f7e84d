//! In-memory store implementations backed by `DashMap`.
//!
//! The reference backing for the engine: all entities live in process
//! memory with no durability guarantee. `DashMap` gives per-shard locking,
//! which is what makes `transition_status` a true compare-and-set -- the
//! check and the write happen under one shard guard.

use std::collections::VecDeque;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use gridflow_types::error::StoreError;
use gridflow_types::webhook::{WebhookEvent, WebhookRegistration};
use gridflow_types::workflow::{Workflow, WorkflowStatus};

use super::webhook::WebhookStore;
use super::workflow::WorkflowStore;

// ---------------------------------------------------------------------------
// MemoryWorkflowStore
// ---------------------------------------------------------------------------

/// In-memory workflow store.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    workflows: DashMap<Uuid, Workflow>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStore for MemoryWorkflowStore {
    async fn insert(&self, workflow: &Workflow) -> Result<(), StoreError> {
        if self.workflows.contains_key(&workflow.id) {
            return Err(StoreError::Conflict(format!(
                "workflow {} already exists",
                workflow.id
            )));
        }
        self.workflows.insert(workflow.id, workflow.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Workflow>, StoreError> {
        Ok(self.workflows.get(id).map(|e| e.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Workflow>, StoreError> {
        let mut all: Vec<Workflow> = self.workflows.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|w| w.created_at);
        Ok(all)
    }

    async fn update(&self, workflow: &Workflow) -> Result<(), StoreError> {
        match self.workflows.get_mut(&workflow.id) {
            Some(mut entry) => {
                *entry = workflow.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.workflows.remove(id).is_some())
    }

    async fn transition_status(
        &self,
        id: &Uuid,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<bool, StoreError> {
        // get_mut holds the shard lock, so check-then-set is atomic.
        match self.workflows.get_mut(id) {
            Some(mut entry) if entry.status == from => {
                entry.status = to;
                entry.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_run_started(
        &self,
        id: &Uuid,
        at: chrono::DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.workflows.get_mut(id) {
            Some(mut entry) => {
                entry.run_count += 1;
                entry.last_run = Some(at);
                entry.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn record_run_failed(&self, id: &Uuid) -> Result<(), StoreError> {
        match self.workflows.get_mut(id) {
            Some(mut entry) => {
                entry.error_count += 1;
                entry.status = WorkflowStatus::Error;
                entry.updated_at = Utc::now();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryWebhookStore
// ---------------------------------------------------------------------------

/// In-memory webhook store with a bounded fired-event history.
pub struct MemoryWebhookStore {
    registrations: DashMap<Uuid, WebhookRegistration>,
    events: RwLock<VecDeque<WebhookEvent>>,
    history_limit: usize,
}

impl MemoryWebhookStore {
    /// Create a store retaining at most `history_limit` fired events.
    pub fn new(history_limit: usize) -> Self {
        Self {
            registrations: DashMap::new(),
            events: RwLock::new(VecDeque::new()),
            history_limit,
        }
    }
}

impl WebhookStore for MemoryWebhookStore {
    async fn insert(&self, registration: &WebhookRegistration) -> Result<(), StoreError> {
        if self.registrations.contains_key(&registration.id) {
            return Err(StoreError::Conflict(format!(
                "webhook {} already exists",
                registration.id
            )));
        }
        self.registrations
            .insert(registration.id, registration.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<WebhookRegistration>, StoreError> {
        Ok(self.registrations.get(id).map(|e| e.value().clone()))
    }

    async fn list(&self) -> Result<Vec<WebhookRegistration>, StoreError> {
        let mut all: Vec<WebhookRegistration> = self
            .registrations
            .iter()
            .map(|e| e.value().clone())
            .collect();
        all.sort_by_key(|r| r.created_at);
        Ok(all)
    }

    async fn update(&self, registration: &WebhookRegistration) -> Result<(), StoreError> {
        match self.registrations.get_mut(&registration.id) {
            Some(mut entry) => {
                *entry = registration.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, StoreError> {
        Ok(self.registrations.remove(id).is_some())
    }

    async fn record_delivery(&self, id: &Uuid, success: bool) -> Result<(), StoreError> {
        match self.registrations.get_mut(id) {
            Some(mut entry) => {
                if success {
                    entry.success_count += 1;
                    entry.last_triggered = Some(Utc::now());
                } else {
                    entry.failure_count += 1;
                }
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn append_event(&self, event: &WebhookEvent) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        events.push_back(event.clone());
        while events.len() > self.history_limit {
            events.pop_front();
        }
        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> Result<Vec<WebhookEvent>, StoreError> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
