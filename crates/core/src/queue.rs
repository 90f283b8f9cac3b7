// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Per-agent delivery queue entries
//!
//! Each entry carries one operation's arguments for one agent, stamped
//! with a per-agent `order_id` so the agent applies work in dispatch
//! order, and two expiry deadlines: one while the entry waits on the
//! server, a later one once the agent holds it. The agent deadline is
//! measured from the server deadline, so an agent that picks up at the
//! last moment still gets its full window.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::operation::{Action, AgentOpArgs, InstallArgs, OperationId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

/// Where an entry is in its delivery lifecycle. Terminal outcomes are
/// the operation ledger's business; a finished entry is simply deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    PickedUp,
}

/// Expiry windows for queued work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    /// How long an entry may sit on the server awaiting pickup
    #[serde(with = "humantime_serde")]
    pub server_ttl: Duration,
    /// How long the agent has after the server window to finish
    #[serde(with = "humantime_serde")]
    pub agent_ttl: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            server_ttl: Duration::from_secs(10 * 60),
            agent_ttl: Duration::from_secs(10 * 60),
        }
    }
}

impl TtlPolicy {
    pub fn server_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + ChronoDuration::seconds(self.server_ttl.as_secs() as i64)
    }

    /// Agent deadline stacks on top of the server deadline
    pub fn agent_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.server_expiry(now) + ChronoDuration::seconds(self.agent_ttl.as_secs() as i64)
    }
}

/// What the agent receives on fetch, with deadlines as epoch seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuePayload {
    pub entry_id: EntryId,
    pub order_id: u64,
    pub operation_id: OperationId,
    pub agent_id: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallArgs>,
    pub server_queue_ttl: i64,
    pub agent_queue_ttl: i64,
}

/// A persisted queue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub view: String,
    pub agent_id: String,
    pub order_id: u64,
    pub args: AgentOpArgs,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
    pub server_expires_at: DateTime<Utc>,
    pub agent_expires_at: DateTime<Utc>,
    pub picked_up_at: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn new(
        id: EntryId,
        view: impl Into<String>,
        order_id: u64,
        args: AgentOpArgs,
        ttl: &TtlPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            view: view.into(),
            agent_id: args.agent_id.clone(),
            order_id,
            args,
            status: DeliveryStatus::Pending,
            created_at: now,
            server_expires_at: ttl.server_expiry(now),
            agent_expires_at: ttl.agent_expiry(now),
            picked_up_at: None,
        }
    }

    /// Sat unclaimed past the server window
    pub fn server_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == DeliveryStatus::Pending && now > self.server_expires_at
    }

    /// Claimed but never acknowledged inside the agent window
    pub fn agent_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == DeliveryStatus::PickedUp && now > self.agent_expires_at
    }

    pub fn mark_picked_up(mut self, now: DateTime<Utc>) -> Self {
        self.status = DeliveryStatus::PickedUp;
        self.picked_up_at = Some(now);
        self
    }

    pub fn payload(&self) -> QueuePayload {
        QueuePayload {
            entry_id: self.id.clone(),
            order_id: self.order_id,
            operation_id: self.args.operation_id.clone(),
            agent_id: self.agent_id.clone(),
            action: self.args.action,
            install: self.args.install.clone(),
            server_queue_ttl: self.server_expires_at.timestamp(),
            agent_queue_ttl: self.agent_expires_at.timestamp(),
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
