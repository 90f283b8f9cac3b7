// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Reaps queue entries that overran their deadlines
//!
//! An entry still pending past its server window, or claimed but
//! unacknowledged past its agent window, is deleted and its agent
//! folded into the operation as expired. Orphaned entries whose
//! operation record is gone are deleted without a fold.

use tracing::{info, warn};
use warden_core::clock::Clock;
use warden_core::event::Event;
use warden_core::operation::AgentResult;
use warden_core::queue::DeliveryStatus;
use warden_core::storage::JsonStore;

use crate::aggregator::StatusAggregator;
use crate::error::EngineError;

/// What one sweep pass reaped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries that sat unclaimed past the server window
    pub server_expired: u64,
    /// Entries claimed but never acknowledged in time
    pub agent_expired: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.server_expired + self.agent_expired
    }
}

/// Periodically expires overdue queue entries
#[derive(Clone)]
pub struct ExpirationSweeper<C: Clock> {
    store: JsonStore,
    clock: C,
    aggregator: StatusAggregator<C>,
}

impl<C: Clock> ExpirationSweeper<C> {
    pub fn new(store: JsonStore, clock: C, aggregator: StatusAggregator<C>) -> Self {
        Self {
            store,
            clock,
            aggregator,
        }
    }

    /// One pass over every entry
    pub async fn sweep(&self) -> Result<SweepReport, EngineError> {
        let now = self.clock.now();
        let mut report = SweepReport::default();

        for entry in self.store.list_entries()? {
            let picked_up = match entry.status {
                DeliveryStatus::Pending if entry.server_expired(now) => false,
                DeliveryStatus::PickedUp if entry.agent_expired(now) => true,
                _ => continue,
            };

            if !self.store.delete_entry(&entry.id.0)? {
                // an ack claimed this entry after our scan
                continue;
            }
            match self
                .aggregator
                .on_result(&entry.args.operation_id, &entry.agent_id, AgentResult::Expired, picked_up)
                .await
            {
                Ok(_) => {}
                Err(EngineError::OperationNotFound(op)) => {
                    warn!(entry_id = %entry.id, operation_id = %op, "expired entry had no operation");
                }
                Err(e) => return Err(e),
            }
            let event = Event::EntryExpired {
                entry_id: entry.id.clone(),
                agent_id: entry.agent_id.clone(),
                picked_up,
            };
            info!(
                event = event.name(),
                entry_id = %entry.id,
                agent_id = %entry.agent_id,
                picked_up,
                "entry expired"
            );
            if picked_up {
                report.agent_expired += 1;
            } else {
                report.server_expired += 1;
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
