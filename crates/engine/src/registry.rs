// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! The closed sets of dispatchable actions and maintenance routines
//!
//! A persisted job stores data, never code: an `OperationSpec` names
//! one of the actions below and the dispatcher interprets it here, and
//! an administrative job may instead name one of the engine's own
//! maintenance routines. Anything a job file references can therefore
//! always be reloaded after a restart.

use warden_core::operation::{Action, AgentOpArgs, OperationId, OperationSpec};

/// Name of the administrative job that drives expiration sweeps
pub const SWEEP_JOB_NAME: &str = "expiration-sweep";

/// A routine the scheduler runs itself instead of dispatching to agents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceTask {
    SweepExpiredEntries,
}

/// Resolve an administrative job's name to the routine it stands for
pub fn maintenance_task(name: &str) -> Option<MaintenanceTask> {
    match name {
        SWEEP_JOB_NAME => Some(MaintenanceTask::SweepExpiredEntries),
        _ => None,
    }
}

/// Every action the dispatcher knows how to fan out
pub const ACTIONS: [Action; 8] = [
    Action::Reboot,
    Action::Shutdown,
    Action::RefreshApps,
    Action::InstallOsApps,
    Action::InstallCustomApps,
    Action::InstallSupportedApps,
    Action::InstallAgentUpdate,
    Action::Uninstall,
];

/// Look an action up by its wire name
pub fn action_from_name(name: &str) -> Option<Action> {
    ACTIONS.into_iter().find(|a| a.name() == name)
}

/// Materialize the per-agent arguments for one resolved agent
pub fn fan_out(operation_id: &OperationId, spec: &OperationSpec, agent_id: &str) -> AgentOpArgs {
    AgentOpArgs {
        operation_id: operation_id.clone(),
        agent_id: agent_id.to_string(),
        action: spec.action,
        install: spec.install.clone(),
    }
}
