// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Turns a fired job (or an ad-hoc request) into an operation fanned
//! out across agent queues
//!
//! Dispatch resolves targets through the directory, persists the
//! operation record, then enqueues one entry per agent. A single
//! agent's enqueue failure does not abort the rest: the agent is folded
//! into the operation as failed and the receipt reports the shortfall.

use std::sync::Arc;
use tracing::{info, warn};
use warden_core::clock::Clock;
use warden_core::event::Event;
use warden_core::ids::IdSource;
use warden_core::job::{Job, JobId};
use warden_core::operation::{AgentResult, Operation, OperationId, OperationSpec};
use warden_core::storage::JsonStore;

use crate::aggregator::StatusAggregator;
use crate::directory::Directory;
use crate::error::EngineError;
use crate::queue::AgentQueueManager;
use crate::registry;

/// What a dispatch actually achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub operation_id: OperationId,
    pub resolved: u64,
    pub enqueued: u64,
}

impl DispatchReceipt {
    /// Some resolved agents never got a queue entry
    pub fn is_partial(&self) -> bool {
        self.enqueued < self.resolved
    }
}

/// Fans operations out to agent queues
#[derive(Clone)]
pub struct Dispatcher<C: Clock, I: IdSource, D: Directory> {
    store: JsonStore,
    clock: C,
    ids: I,
    directory: Arc<D>,
    queue: AgentQueueManager<C, I>,
    aggregator: StatusAggregator<C>,
}

impl<C: Clock, I: IdSource, D: Directory> Dispatcher<C, I, D> {
    pub fn new(
        store: JsonStore,
        clock: C,
        ids: I,
        directory: Arc<D>,
        queue: AgentQueueManager<C, I>,
        aggregator: StatusAggregator<C>,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            directory,
            queue,
            aggregator,
        }
    }

    /// Dispatch a fired job's operation
    pub async fn fire(&self, job: &Job) -> Result<DispatchReceipt, EngineError> {
        let Some(spec) = &job.operation else {
            return Err(EngineError::NothingToDispatch(job.id.0.clone()));
        };
        self.dispatch(&job.view, spec, "scheduler", Some(job.id.clone()))
            .await
    }

    /// Resolve targets and fan the operation out on behalf of a
    /// requester (an operator's user id, or the scheduler)
    pub async fn dispatch(
        &self,
        view: &str,
        spec: &OperationSpec,
        created_by: &str,
        job_id: Option<JobId>,
    ) -> Result<DispatchReceipt, EngineError> {
        let mut agents = self.resolve(view, spec).await?;
        agents.sort();
        agents.dedup();

        let now = self.clock.now();
        let id = OperationId(self.ids.generate());
        let operation = Operation::new(
            id.clone(),
            view,
            spec.action,
            created_by,
            job_id,
            agents.clone(),
            now,
        );
        let resolved = operation.counters.total;
        self.store.save_operation(&operation)?;
        let event = Event::OperationCreated {
            operation_id: id.clone(),
            action: spec.action,
            total: resolved,
        };
        info!(
            event = event.name(),
            operation_id = %id,
            action = %spec.action,
            total = resolved,
            "operation created"
        );
        if resolved == 0 {
            // nobody to reach; the operation is already complete
            let event = Event::OperationCompleted {
                operation_id: id.clone(),
            };
            info!(event = event.name(), operation_id = %id, "no targets resolved");
        }

        let mut enqueued = 0u64;
        for agent_id in &agents {
            let args = registry::fan_out(&id, spec, agent_id);
            match self.queue.enqueue(view, args).await {
                Ok(_) => enqueued += 1,
                Err(e) => {
                    warn!(
                        operation_id = %id,
                        agent_id = %agent_id,
                        error = %e,
                        "enqueue failed, agent marked failed"
                    );
                    self.aggregator
                        .on_result(&id, agent_id, AgentResult::Failed, false)
                        .await?;
                }
            }
        }

        let receipt = DispatchReceipt {
            operation_id: id.clone(),
            resolved,
            enqueued,
        };
        if receipt.is_partial() {
            warn!(
                operation_id = %id,
                resolved,
                enqueued,
                "partial fan-out"
            );
        }
        Ok(receipt)
    }

    async fn resolve(&self, view: &str, spec: &OperationSpec) -> Result<Vec<String>, EngineError> {
        use warden_core::operation::TargetSelection;
        let agents = match &spec.targets {
            TargetSelection::Agents { agent_ids } => {
                self.directory.confirm_agents(view, agent_ids).await?
            }
            TargetSelection::Tag { tag_id } => {
                self.directory.agents_with_tag(view, tag_id).await?
            }
            TargetSelection::View => self.directory.agents_in_view(view).await?,
        };
        Ok(agents)
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
