// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Folds agent reports into operation counters
//!
//! Counter moves are read-modify-write over the stored record, so each
//! operation has its own lock. Reports for different operations never
//! contend.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use warden_core::clock::Clock;
use warden_core::event::Event;
use warden_core::operation::{AgentResult, Operation, OperationId};
use warden_core::storage::{JsonStore, StorageError};

use crate::error::EngineError;

/// Applies pickup and result reports to stored operations
#[derive(Clone)]
pub struct StatusAggregator<C: Clock> {
    store: JsonStore,
    clock: C,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<C: Clock> StatusAggregator<C> {
    pub fn new(store: JsonStore, clock: C) -> Self {
        Self {
            store,
            clock,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, id: &OperationId) -> Result<Operation, EngineError> {
        match self.store.load_operation(&id.0) {
            Ok(op) => Ok(op),
            Err(StorageError::NotFound { .. }) => Err(EngineError::OperationNotFound(id.0.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Operations in a view, newest first
    pub fn list(&self, view: &str) -> Result<Vec<Operation>, EngineError> {
        let mut ops: Vec<Operation> = self
            .store
            .list_operations()?
            .into_iter()
            .filter(|op| op.view == view)
            .collect();
        ops.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ops)
    }

    /// An agent took delivery of its entry for this operation
    pub async fn on_pickup(&self, id: &OperationId) -> Result<Operation, EngineError> {
        let lock = self.operation_lock(id).await;
        let _held = lock.lock().await;

        let op = self.get(id)?.record_pickup();
        self.store.save_operation(&op)?;
        debug!(event = "operation:pickup", operation_id = %op.id, "pickup recorded");
        Ok(op)
    }

    /// An agent reached a terminal outcome. `picked_up` says whether
    /// the agent had taken delivery first.
    pub async fn on_result(
        &self,
        id: &OperationId,
        agent_id: &str,
        result: AgentResult,
        picked_up: bool,
    ) -> Result<Operation, EngineError> {
        let lock = self.operation_lock(id).await;
        let _held = lock.lock().await;

        let op = self.get(id)?.record_result(result, picked_up, self.clock.now());
        self.store.save_operation(&op)?;
        let event = Event::ResultRecorded {
            operation_id: op.id.clone(),
            agent_id: agent_id.to_string(),
            result,
        };
        debug!(
            event = event.name(),
            operation_id = %op.id,
            agent_id,
            result = ?result,
            "result recorded"
        );
        if op.is_complete() {
            let event = Event::OperationCompleted {
                operation_id: op.id.clone(),
            };
            info!(
                event = event.name(),
                operation_id = %op.id,
                completed = op.counters.completed,
                failed = op.counters.failed,
                expired = op.counters.expired,
                "operation completed"
            );
        }
        Ok(op)
    }

    async fn operation_lock(&self, id: &OperationId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.0.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;
