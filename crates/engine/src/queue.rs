// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Per-agent delivery queues
//!
//! Entries for one agent are ordered by a persisted counter that only
//! moves forward, so an agent always sees work in dispatch order and an
//! order id is never reused, even across restarts or entry deletion.
//! The counter increment and the entry insert happen under a per-agent
//! lock; different agents never contend.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};
use warden_core::clock::Clock;
use warden_core::event::Event;
use warden_core::ids::IdSource;
use warden_core::operation::{AgentOpArgs, AgentResult, Operation};
use warden_core::queue::{DeliveryStatus, EntryId, QueueEntry, QueuePayload, TtlPolicy};
use warden_core::storage::{JsonStore, StorageError};

use crate::aggregator::StatusAggregator;
use crate::error::EngineError;

/// Manages queue entries across all agents
#[derive(Clone)]
pub struct AgentQueueManager<C: Clock, I: IdSource> {
    store: JsonStore,
    clock: C,
    ids: I,
    ttl: TtlPolicy,
    aggregator: StatusAggregator<C>,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl<C: Clock, I: IdSource> AgentQueueManager<C, I> {
    pub fn new(
        store: JsonStore,
        clock: C,
        ids: I,
        ttl: TtlPolicy,
        aggregator: StatusAggregator<C>,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            ttl,
            aggregator,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Place one operation's arguments on an agent's queue
    pub async fn enqueue(
        &self,
        view: &str,
        args: AgentOpArgs,
    ) -> Result<QueueEntry, EngineError> {
        let agent_id = args.agent_id.clone();
        let lock = self.agent_lock(&agent_id).await;
        let _held = lock.lock().await;

        let order_id = self.store.load_order_counter(&agent_id)? + 1;
        self.store.save_order_counter(&agent_id, order_id)?;

        let entry = QueueEntry::new(
            EntryId(self.ids.generate()),
            view,
            order_id,
            args,
            &self.ttl,
            self.clock.now(),
        );
        self.store.save_entry(&entry)?;
        let event = Event::EntryEnqueued {
            entry_id: entry.id.clone(),
            agent_id: agent_id.clone(),
            order_id,
        };
        info!(
            event = event.name(),
            entry_id = %entry.id,
            agent_id = %agent_id,
            order_id,
            "entry enqueued"
        );
        Ok(entry)
    }

    /// Read an agent's deliverable queue without claiming it, in
    /// dispatch order. Entries past their server window are invisible.
    pub fn fetch(&self, agent_id: &str) -> Result<Vec<QueuePayload>, EngineError> {
        let now = self.clock.now();
        let mut entries: Vec<QueueEntry> = self
            .store
            .list_entries()?
            .into_iter()
            .filter(|e| {
                e.agent_id == agent_id
                    && e.status == DeliveryStatus::Pending
                    && !e.server_expired(now)
            })
            .collect();
        entries.sort_by_key(|e| e.order_id);
        Ok(entries.iter().map(QueueEntry::payload).collect())
    }

    /// The head of an agent's queue, if any
    pub fn next(&self, agent_id: &str) -> Result<Option<QueuePayload>, EngineError> {
        Ok(self.fetch(agent_id)?.into_iter().next())
    }

    /// The order id the agent's next entry would get. Assignment itself
    /// happens inside `enqueue`, under the agent lock.
    pub fn next_order_id(&self, agent_id: &str) -> Result<u64, EngineError> {
        Ok(self.store.load_order_counter(agent_id)? + 1)
    }

    /// Claim everything deliverable on an agent's queue. Claimed
    /// entries stay persisted awaiting acknowledgement, on the longer
    /// agent deadline; each claim moves the parent operation's
    /// pending_pickup count toward pending_results.
    pub async fn pickup(&self, agent_id: &str) -> Result<Vec<QueueEntry>, EngineError> {
        let lock = self.agent_lock(agent_id).await;
        let _held = lock.lock().await;

        let now = self.clock.now();
        let mut claimed: Vec<QueueEntry> = Vec::new();
        let mut entries: Vec<QueueEntry> = self
            .store
            .list_entries()?
            .into_iter()
            .filter(|e| {
                e.agent_id == agent_id
                    && e.status == DeliveryStatus::Pending
                    && !e.server_expired(now)
            })
            .collect();
        entries.sort_by_key(|e| e.order_id);
        for entry in entries {
            let entry = entry.mark_picked_up(now);
            self.store.save_entry(&entry)?;
            self.aggregator.on_pickup(&entry.args.operation_id).await?;
            let event = Event::EntryPickedUp {
                entry_id: entry.id.clone(),
                agent_id: agent_id.to_string(),
            };
            debug!(event = event.name(), entry_id = %entry.id, agent_id, "entry picked up");
            claimed.push(entry);
        }
        Ok(claimed)
    }

    /// Fold an agent-reported terminal outcome into the parent
    /// operation, then remove the entry. Returns the updated operation.
    /// Deletion is the claim: the fold happens only for the caller that
    /// actually removed the entry, so an ack racing the sweeper can
    /// never count the same agent twice.
    pub async fn ack(
        &self,
        entry_id: &EntryId,
        result: AgentResult,
    ) -> Result<Operation, EngineError> {
        let entry = match self.store.load_entry(&entry_id.0) {
            Ok(entry) => entry,
            Err(StorageError::NotFound { .. }) => {
                return Err(EngineError::EntryNotFound(entry_id.0.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        if !self.store.delete_entry(&entry_id.0)? {
            // the sweeper (or another ack) claimed it first
            return Err(EngineError::EntryNotFound(entry_id.0.clone()));
        }
        let picked_up = entry.status == DeliveryStatus::PickedUp;
        self.aggregator
            .on_result(&entry.args.operation_id, &entry.agent_id, result, picked_up)
            .await
    }

    /// Bulk removal, with no fold. Missing ids are skipped.
    pub fn delete_many(&self, entry_ids: &[EntryId]) -> Result<usize, EngineError> {
        let mut removed = 0;
        for entry_id in entry_ids {
            if self.store.delete_entry(&entry_id.0)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Drop every entry for an agent, for decommissioning. The order
    /// counter survives so a re-enrolled agent never sees an order id
    /// twice.
    pub async fn purge_agent(&self, agent_id: &str) -> Result<usize, EngineError> {
        let lock = self.agent_lock(agent_id).await;
        let _held = lock.lock().await;

        let ids: Vec<EntryId> = self
            .entries_for(agent_id)?
            .into_iter()
            .map(|e| e.id)
            .collect();
        self.delete_many(&ids)
    }

    /// Every persisted entry for an agent, regardless of state
    pub fn entries_for(&self, agent_id: &str) -> Result<Vec<QueueEntry>, EngineError> {
        let mut entries: Vec<QueueEntry> = self
            .store
            .list_entries()?
            .into_iter()
            .filter(|e| e.agent_id == agent_id)
            .collect();
        entries.sort_by_key(|e| e.order_id);
        Ok(entries)
    }

    async fn agent_lock(&self, agent_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
