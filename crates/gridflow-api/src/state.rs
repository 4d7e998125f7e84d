//! Application state wiring the engine, scheduler, and dispatcher together.
//!
//! Services are generic over store traits; AppState pins them to the
//! in-memory implementations.

use std::sync::Arc;
use std::time::Duration;

use gridflow_core::engine::{CronScheduler, StepRunner, WorkflowService};
use gridflow_core::event::EventBus;
use gridflow_core::store::{MemoryWebhookStore, MemoryWorkflowStore};
use gridflow_infra::webhook::WebhookDispatcher;
use gridflow_types::config::GridConfig;

/// Concrete type aliases pinning the service generics to the in-memory stores.
pub type ConcreteWorkflowService = WorkflowService<MemoryWorkflowStore>;
pub type ConcreteDispatcher = WebhookDispatcher<MemoryWebhookStore>;

/// Shared application state used by all REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub workflows: Arc<ConcreteWorkflowService>,
    pub webhooks: Arc<ConcreteDispatcher>,
    pub bus: EventBus,
    pub config: GridConfig,
}

impl AppState {
    /// Wire up the engine: start the scheduler, build the services, and
    /// attach the webhook fan-out listener to the event bus.
    pub async fn init(config: GridConfig) -> anyhow::Result<Self> {
        let bus = EventBus::new(config.engine.event_bus_capacity);

        let scheduler = Arc::new(CronScheduler::new());
        scheduler.start().await?;

        let workflows = Arc::new(WorkflowService::new(
            Arc::new(MemoryWorkflowStore::new()),
            scheduler,
            Arc::new(StepRunner::new()),
            bus.clone(),
        ));

        let webhooks = Arc::new(WebhookDispatcher::new(
            Arc::new(MemoryWebhookStore::new(config.webhooks.event_history_limit)),
            bus.clone(),
            Duration::from_secs(config.webhooks.delivery_timeout_secs),
        )?);
        webhooks.spawn_bus_listener(&bus);

        Ok(Self {
            workflows,
            webhooks,
            bus,
            config,
        })
    }
}
