// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Fleet operations and their completion ledger
//!
//! An operation is one dispatch of an action to a resolved set of
//! agents. Its counters partition the agents at all times:
//! `pending_pickup + pending_results + terminals == total`. Counter
//! moves are pure so the aggregator can apply them under a lock and
//! persist the result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::job::JobId;
use crate::trigger::FieldError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub String);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        OperationId(s)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        OperationId(s.to_string())
    }
}

/// What an operation asks agents to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Reboot,
    Shutdown,
    RefreshApps,
    InstallOsApps,
    InstallCustomApps,
    InstallSupportedApps,
    InstallAgentUpdate,
    Uninstall,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Reboot => "reboot",
            Action::Shutdown => "shutdown",
            Action::RefreshApps => "refresh_apps",
            Action::InstallOsApps => "install_os_apps",
            Action::InstallCustomApps => "install_custom_apps",
            Action::InstallSupportedApps => "install_supported_apps",
            Action::InstallAgentUpdate => "install_agent_update",
            Action::Uninstall => "uninstall",
        }
    }

    /// Install and uninstall actions carry an app list
    pub fn takes_apps(&self) -> bool {
        matches!(
            self,
            Action::InstallOsApps
                | Action::InstallCustomApps
                | Action::InstallSupportedApps
                | Action::InstallAgentUpdate
                | Action::Uninstall
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether agents may restart after applying an install
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    #[default]
    None,
    Needed,
    Forced,
}

/// Arguments for install-family actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallArgs {
    pub app_ids: Vec<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
}

/// How an operation chooses its agents, resolved at dispatch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum TargetSelection {
    /// An explicit agent list
    Agents { agent_ids: Vec<String> },
    /// Every agent carrying a tag
    Tag { tag_id: String },
    /// Every agent in the view
    View,
}

/// The stored description of what to dispatch when a job fires.
/// Deliberately data, not code: the dispatcher interprets it, so a
/// persisted job never references anything that can't be reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub action: Action,
    pub targets: TargetSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallArgs>,
}

impl OperationSpec {
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        match &self.targets {
            TargetSelection::Agents { agent_ids } if agent_ids.is_empty() => {
                errors.push(FieldError::new("targets", "agent list is empty"));
            }
            TargetSelection::Tag { tag_id } if tag_id.trim().is_empty() => {
                errors.push(FieldError::new("targets", "tag id is empty"));
            }
            _ => {}
        }
        match (&self.install, self.action.takes_apps()) {
            (Some(install), true) if install.app_ids.is_empty() => {
                errors.push(FieldError::new("install", "app list is empty"));
            }
            (None, true) => {
                errors.push(FieldError::new(
                    "install",
                    format!("{} requires an app list", self.action),
                ));
            }
            (Some(_), false) => {
                errors.push(FieldError::new(
                    "install",
                    format!("{} does not take apps", self.action),
                ));
            }
            _ => {}
        }
        errors
    }
}

/// Per-agent arguments materialized at dispatch, one per queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOpArgs {
    pub operation_id: OperationId,
    pub agent_id: String,
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallArgs>,
}

/// A terminal per-agent outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentResult {
    Completed,
    CompletedWithErrors,
    Failed,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationCounters {
    pub total: u64,
    pub pending_pickup: u64,
    pub pending_results: u64,
    pub completed: u64,
    pub completed_with_errors: u64,
    pub failed: u64,
    pub expired: u64,
}

impl OperationCounters {
    fn terminal(&self) -> u64 {
        self.completed + self.completed_with_errors + self.failed + self.expired
    }
}

/// A persisted operation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub view: String,
    pub action: Action,
    /// Who asked for this: an operator's user id, or the scheduler
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub agent_ids: Vec<String>,
    pub counters: OperationCounters,
    pub created_at: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
}

impl Operation {
    /// A fresh operation over a resolved agent set. An empty set is a
    /// valid no-op operation, complete from birth.
    pub fn new(
        id: OperationId,
        view: impl Into<String>,
        action: Action,
        created_by: impl Into<String>,
        job_id: Option<JobId>,
        agent_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let total = agent_ids.len() as u64;
        Self {
            id,
            view: view.into(),
            action,
            created_by: created_by.into(),
            job_id,
            agent_ids,
            counters: OperationCounters {
                total,
                pending_pickup: total,
                ..OperationCounters::default()
            },
            created_at: now,
            completed_time: (total == 0).then_some(now),
        }
    }

    /// One agent picked its entry up: pending_pickup -> pending_results
    pub fn record_pickup(mut self) -> Self {
        if self.counters.pending_pickup > 0 {
            self.counters.pending_pickup -= 1;
            self.counters.pending_results += 1;
        }
        self
    }

    /// One agent reached a terminal outcome. `picked_up` says which
    /// pending bucket the agent was in.
    pub fn record_result(mut self, result: AgentResult, picked_up: bool, now: DateTime<Utc>) -> Self {
        let pending = if picked_up {
            &mut self.counters.pending_results
        } else {
            &mut self.counters.pending_pickup
        };
        if *pending == 0 {
            // duplicate or late report, the ledger already moved on
            return self;
        }
        *pending -= 1;
        match result {
            AgentResult::Completed => self.counters.completed += 1,
            AgentResult::CompletedWithErrors => self.counters.completed_with_errors += 1,
            AgentResult::Failed => self.counters.failed += 1,
            AgentResult::Expired => self.counters.expired += 1,
        }
        if self.counters.terminal() == self.counters.total {
            self.completed_time = Some(now);
        }
        self
    }

    pub fn is_complete(&self) -> bool {
        self.completed_time.is_some()
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
